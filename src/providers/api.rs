use anyhow::Context;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde_json::{json, Value};
use std::fmt;

use super::{TranscriptResult, TranscriptSource};
use crate::extractors::{extract, VideoId};
use crate::subtitles;
use crate::utils::truncate;
use crate::Result;

/// Transcripts from the hosted transcript API
pub struct ApiProvider {
    client: Client,
    url: String,
    token: String,
}

impl ApiProvider {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            token: token.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Usable whenever a token is configured; no network round trip
    pub async fn check_availability(&self) -> bool {
        !self.token.trim().is_empty()
    }

    pub async fn fetch_transcript(&self, video_id: &VideoId) -> Result<Option<TranscriptResult>> {
        tracing::info!("Requesting transcript for {} from {}", video_id, self.url);

        let response = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, format!("Basic {}", self.token))
            .json(&json!({ "ids": [video_id.as_str()] }))
            .send()
            .await
            .context("Transcript API request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read transcript API response")?;

        if !status.is_success() {
            anyhow::bail!("Transcript API returned HTTP {}: {}", status, truncate(&body, 300));
        }

        let transcript = transcript_from_body(video_id, &body);
        if transcript.is_none() {
            tracing::debug!("Transcript API response for {} contained no text", video_id);
        }

        Ok(transcript)
    }
}

impl fmt::Debug for ApiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiProvider")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Pick this video's transcript out of a JSON or plain-text response body
fn transcript_from_body(video_id: &VideoId, body: &str) -> Option<TranscriptResult> {
    let payload = serde_json::from_str::<Value>(body)
        .unwrap_or_else(|_| Value::String(body.to_string()));

    let records = extract(&payload);
    let record = records
        .iter()
        .find(|record| record.id.as_deref() == Some(video_id.as_str()))
        .or_else(|| records.iter().find(|record| record.id.is_none()))?;

    TranscriptResult::new(subtitles::clean_text(&record.text), TranscriptSource::Api)
        .map(|result| result.with_title(record.title.clone()))
}
