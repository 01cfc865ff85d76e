use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;
use crate::extractors::validate_url;

pub const DEFAULT_API_URL: &str = "https://www.youtube-transcript.io/api/transcripts";
pub const DEFAULT_CLOUD_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hosted transcript API
    pub api: ApiConfig,

    /// Speech-to-text settings
    pub whisper: WhisperConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Access token; the API provider is only used when this is set
    pub token: Option<String>,

    /// Endpoint receiving `{"ids": [...]}`
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhisperConfig {
    /// Pin a backend instead of probing for the best one
    pub backend: Option<WhisperBackendKind>,

    /// ggml model file for whisper.cpp
    pub model_path: Option<PathBuf>,

    /// Model name for the Python whisper CLI
    pub model: String,

    /// Model repository for mlx-whisper
    pub mlx_model: String,

    /// API key for the cloud transcription endpoint
    pub cloud_api_key: Option<String>,

    /// OpenAI-compatible transcription endpoint
    pub cloud_url: String,

    /// Model name sent to the cloud endpoint
    pub cloud_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Preferred caption/transcription language ("auto" lets whisper detect it)
    pub language: String,

    /// Parent directory for per-fetch scratch directories
    pub temp_dir: Option<PathBuf>,

    /// Line width of rendered articles
    pub wrap_width: usize,

    /// Sentences grouped into one article paragraph
    pub sentences_per_paragraph: usize,
}

/// Speech-to-text backend flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WhisperBackendKind {
    /// whisper.cpp compiled binary
    Cpp,
    /// openai-whisper Python CLI
    Python,
    /// mlx-whisper for Apple silicon
    Mlx,
    /// OpenAI-compatible cloud API
    Cloud,
}

impl WhisperBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WhisperBackendKind::Cpp => "cpp",
            WhisperBackendKind::Python => "python",
            WhisperBackendKind::Mlx => "mlx",
            WhisperBackendKind::Cloud => "cloud",
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            token: None,
            url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            backend: None,
            model_path: None,
            model: "base".to_string(),
            mlx_model: "mlx-community/whisper-base-mlx".to_string(),
            cloud_api_key: None,
            cloud_url: DEFAULT_CLOUD_URL.to_string(),
            cloud_model: "whisper-1".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            temp_dir: None,
            wrap_width: 80,
            sentences_per_paragraph: 4,
        }
    }
}

impl Config {
    /// Load configuration from file (or defaults) and apply command-line/env overrides
    pub fn load(args: &GlobalArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Self::config_path()?;
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    tracing::debug!("No config file at {}, using defaults", path.display());
                    Self::default()
                }
            }
        };

        config.apply_overrides(args);
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content)
            .context("Failed to parse config file")?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Command-line flags and their environment variables win over the file
    pub fn apply_overrides(&mut self, args: &GlobalArgs) {
        if let Some(token) = &args.api_token {
            self.api.token = Some(token.clone());
        }
        if let Some(url) = &args.api_url {
            self.api.url = url.clone();
        }
        if let Some(path) = &args.whisper_model_path {
            self.whisper.model_path = Some(path.clone());
        }
        if let Some(backend) = args.whisper_backend {
            self.whisper.backend = Some(backend);
        }
        if let Some(key) = &args.openai_api_key {
            self.whisper.cloud_api_key = Some(key.clone());
        }

        // Blank secrets behave like unset ones
        self.api.token = self.api.token.take().filter(|t| !t.trim().is_empty());
        self.whisper.cloud_api_key = self
            .whisper
            .cloud_api_key
            .take()
            .filter(|k| !k.trim().is_empty());
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("yt-transcript-article").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        validate_url(&self.api.url).context("Invalid transcript API URL")?;
        validate_url(&self.whisper.cloud_url).context("Invalid cloud transcription URL")?;

        if self.app.language.trim().is_empty() {
            anyhow::bail!("Language must not be empty");
        }
        if self.app.wrap_width < 20 {
            anyhow::bail!("wrap_width must be at least 20 (got {})", self.app.wrap_width);
        }
        if self.app.sentences_per_paragraph == 0 {
            anyhow::bail!("sentences_per_paragraph must be at least 1");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Transcript API URL: {}", self.api.url);
        println!("  Transcript API token: {}", redacted(self.api.token.as_deref()));
        println!(
            "  Whisper backend: {}",
            self.whisper.backend.map(|b| b.as_str()).unwrap_or("auto-detect")
        );
        if let Some(model_path) = &self.whisper.model_path {
            println!("  Whisper model file: {}", model_path.display());
        }
        println!("  Whisper model: {}", self.whisper.model);
        println!("  MLX model: {}", self.whisper.mlx_model);
        println!("  Cloud URL: {}", self.whisper.cloud_url);
        println!("  Cloud API key: {}", redacted(self.whisper.cloud_api_key.as_deref()));
        println!("  Language: {}", self.app.language);
        if let Some(temp_dir) = &self.app.temp_dir {
            println!("  Temp dir: {}", temp_dir.display());
        }
        println!("  Wrap width: {}", self.app.wrap_width);
        println!("  Sentences per paragraph: {}", self.app.sentences_per_paragraph);
    }
}

fn redacted(secret: Option<&str>) -> &'static str {
    match secret {
        Some(_) => "set",
        None => "not set",
    }
}
