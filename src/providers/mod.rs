use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tempfile::TempDir;

pub mod api;
pub mod whisper;
pub mod ytdlp;

pub use api::ApiProvider;
pub use whisper::{probe_whisper_backend, WhisperBackend, WhisperProvider};
pub use ytdlp::{AudioFormat, YtDlpProvider};

use crate::extractors::VideoId;
use crate::Result;

/// Where a transcript came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptSource {
    Api,
    Ytdlp,
    Whisper,
}

impl TranscriptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptSource::Api => "api",
            TranscriptSource::Ytdlp => "ytdlp",
            TranscriptSource::Whisper => "whisper",
        }
    }
}

impl fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fetched transcript. The text is never empty and has already been
/// cleaned and deduplicated by the provider that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptResult {
    text: String,
    title: Option<String>,
    language: Option<String>,
    source: TranscriptSource,
}

impl TranscriptResult {
    /// Returns `None` when the text is blank
    pub fn new(text: impl Into<String>, source: TranscriptSource) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return None;
        }

        Some(Self {
            text,
            title: None,
            language: None,
            source,
        })
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language.filter(|l| !l.trim().is_empty());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn source(&self) -> TranscriptSource {
        self.source
    }
}

/// A transcript source that can be tried for a video.
///
/// `fetch_transcript` returns `Ok(None)` when the source ran fine but has
/// nothing for the video (no captions, silent audio); errors are reserved for
/// failures of the source itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// Stable identifier used in logs and error reports
    fn name(&self) -> &'static str;

    /// Cheap capability check; never fetches content
    async fn check_availability(&self) -> bool;

    async fn fetch_transcript(&self, video_id: &VideoId) -> Result<Option<TranscriptResult>>;
}

/// The fixed set of transcript sources
#[derive(Debug)]
pub enum Provider {
    Api(ApiProvider),
    Ytdlp(YtDlpProvider),
    Whisper(WhisperProvider),
}

impl Provider {
    pub fn source(&self) -> TranscriptSource {
        match self {
            Provider::Api(_) => TranscriptSource::Api,
            Provider::Ytdlp(_) => TranscriptSource::Ytdlp,
            Provider::Whisper(_) => TranscriptSource::Whisper,
        }
    }

    /// One-line description for the `providers` command
    pub fn describe(&self) -> String {
        match self {
            Provider::Api(api) => format!("transcript API at {}", api.url()),
            Provider::Ytdlp(ytdlp) => format!("yt-dlp captions ({})", ytdlp.executable().display()),
            Provider::Whisper(whisper) => format!("speech-to-text via {}", whisper.backend().describe()),
        }
    }
}

#[async_trait]
impl TranscriptProvider for Provider {
    fn name(&self) -> &'static str {
        self.source().as_str()
    }

    async fn check_availability(&self) -> bool {
        match self {
            Provider::Api(api) => api.check_availability().await,
            Provider::Ytdlp(ytdlp) => ytdlp.check_availability().await,
            Provider::Whisper(whisper) => whisper.check_availability().await,
        }
    }

    async fn fetch_transcript(&self, video_id: &VideoId) -> Result<Option<TranscriptResult>> {
        match self {
            Provider::Api(api) => api.fetch_transcript(video_id).await,
            Provider::Ytdlp(ytdlp) => ytdlp.fetch_transcript(video_id).await,
            Provider::Whisper(whisper) => whisper.fetch_transcript(video_id).await,
        }
    }
}

/// Per-attempt scratch space, deleted when the returned guard drops
pub(crate) fn scratch_dir(root: Option<&Path>) -> Result<TempDir> {
    use anyhow::Context;

    let mut builder = tempfile::Builder::new();
    builder.prefix("yt-article-");

    let dir = match root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
    .context("Failed to create temporary directory")?;

    tracing::debug!("Using scratch directory {}", dir.path().display());
    Ok(dir)
}
