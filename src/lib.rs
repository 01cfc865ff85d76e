//! yt-transcript-article - fetch YouTube transcripts and render them as articles
//!
//! Transcripts come from a fixed chain of sources: a hosted transcript API,
//! captions downloaded with yt-dlp, and speech-to-text through one of several
//! whisper backends. The chain is resolved once per run and tried in order for
//! every video until one source produces text.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod output;
pub mod providers;
pub mod subtitles;
pub mod tools;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat, ProviderMode};
pub use config::Config;
pub use extractors::VideoId;
pub use providers::{Provider, TranscriptProvider, TranscriptResult, TranscriptSource};
pub use transcribe::{FetchAttempt, FetchReport, TranscriptPipeline};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types surfaced to the user by resolution and fallback
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("Not a YouTube URL or video ID: {0}")]
    InvalidVideo(String),

    #[error("Configuration error: {message}\n  hint: {hint}")]
    Configuration { message: String, hint: String },

    #[error("No transcript provider is available:\n{}", format_hints(.hints))]
    NoProviderAvailable { hints: Vec<String> },

    #[error("Provider '{provider}' has no transcript for {video_id} and fallback is disabled")]
    NoTranscriptFromProvider {
        provider: &'static str,
        video_id: VideoId,
    },

    #[error("Provider '{provider}' failed: {source:#}")]
    ProviderExecution {
        provider: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("No provider produced a transcript for {video_id}:\n{}", format_attempts(.attempts))]
    AllProvidersFailed {
        video_id: VideoId,
        attempts: Vec<FetchAttempt>,
    },
}

fn format_hints(hints: &[String]) -> String {
    hints
        .iter()
        .map(|hint| format!("  • {}", hint))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_attempts(attempts: &[FetchAttempt]) -> String {
    if attempts.is_empty() {
        return "  (the provider chain is empty)".to_string();
    }

    attempts
        .iter()
        .map(|attempt| format!("  • {}", attempt))
        .collect::<Vec<_>>()
        .join("\n")
}
