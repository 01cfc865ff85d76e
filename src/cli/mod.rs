use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::WhisperBackendKind;

#[derive(Parser)]
#[command(
    name = "yt-article",
    about = "Turn YouTube transcripts into readable articles",
    version,
    long_about = "Fetches the transcript of one or more YouTube videos from a hosted transcript API, captions downloaded with yt-dlp, or local/cloud whisper speech-to-text, trying each source in turn, and renders it as a readable article."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Default, Clone)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Config file (defaults to ./config.yaml or the user config directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Access token for the transcript API
    #[arg(long, global = true, env = "TRANSCRIPT_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Transcript API endpoint
    #[arg(long, global = true, env = "TRANSCRIPT_API_URL")]
    pub api_url: Option<String>,

    /// ggml model file for whisper.cpp
    #[arg(long, global = true, env = "WHISPER_MODEL_PATH", value_name = "FILE")]
    pub whisper_model_path: Option<PathBuf>,

    /// Use this speech-to-text backend instead of auto-detecting one
    #[arg(long, global = true, value_enum, env = "WHISPER_BACKEND")]
    pub whisper_backend: Option<WhisperBackendKind>,

    /// API key for cloud speech-to-text
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch transcripts and render them as articles
    Fetch {
        /// YouTube URLs or 11-character video IDs
        #[arg(value_name = "URL_OR_ID", required = true)]
        inputs: Vec<String>,

        /// Transcript source to use (auto tries every available source in order)
        #[arg(short, long, value_enum, default_value = "auto", env = "TRANSCRIPT_PROVIDER")]
        provider: ProviderMode,

        /// Stop at the first source that fails or has no transcript
        #[arg(long)]
        no_fallback: bool,

        /// Preferred transcript language (e.g. en, de, auto)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Write one file per video into this directory (prints to console if not specified)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,
    },

    /// Show which transcript sources are usable on this machine
    Providers {
        /// Resolve as if this source were forced
        #[arg(short, long, value_enum, default_value = "auto")]
        provider: ProviderMode,
    },

    /// Show or initialize the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write a default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
}

/// How the provider chain is chosen
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderMode {
    /// Every available source, in priority order
    Auto,
    /// Hosted transcript API only
    Api,
    /// yt-dlp captions only
    Ytdlp,
    /// Speech-to-text only
    Whisper,
}

impl ProviderMode {
    pub fn is_forced(&self) -> bool {
        !matches!(self, ProviderMode::Auto)
    }
}

impl std::fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderMode::Auto => write!(f, "auto"),
            ProviderMode::Api => write!(f, "api"),
            ProviderMode::Ytdlp => write!(f, "ytdlp"),
            ProviderMode::Whisper => write!(f, "whisper"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Markdown article with title and source line
    Markdown,
    /// Wrapped paragraphs only
    Text,
    /// JSON with metadata
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
