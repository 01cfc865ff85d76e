use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::TranscriptError;

lazy_static! {
    static ref VIDEO_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap();
}

/// An 11-character YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Accept a bare identifier only
    pub fn parse(id: &str) -> Option<Self> {
        if VIDEO_ID_RE.is_match(id) {
            Some(Self(id.to_string()))
        } else {
            None
        }
    }

    /// Accept a bare identifier or any supported YouTube URL shape
    pub fn from_input(input: &str) -> Option<Self> {
        let input = input.trim();

        if let Some(id) = Self::parse(input) {
            return Some(id);
        }

        let parsed = if input.starts_with("http://") || input.starts_with("https://") {
            Url::parse(input).ok()?
        } else {
            Url::parse(&format!("https://{}", input)).ok()?
        };

        let host = parsed.host_str()?.to_lowercase();
        let host = host
            .trim_start_matches("www.")
            .trim_start_matches("m.")
            .trim_start_matches("music.");

        let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());

        let candidate = match host {
            "youtu.be" => segments.next().map(str::to_string),
            "youtube.com" | "youtube-nocookie.com" => match segments.next()? {
                "watch" => parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                "embed" | "v" | "e" | "shorts" | "live" => segments.next().map(str::to_string),
                _ => None,
            },
            _ => None,
        }?;

        Self::parse(&candidate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch page for this video
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VideoId {
    type Err = TranscriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_input(s).ok_or_else(|| TranscriptError::InvalidVideo(s.to_string()))
    }
}
