use anyhow::Context;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::ytdlp::{AudioFormat, YtDlpProvider};
use super::{scratch_dir, TranscriptResult, TranscriptSource};
use crate::config::{WhisperBackendKind, WhisperConfig};
use crate::extractors::VideoId;
use crate::subtitles;
use crate::tools::ToolLocator;
use crate::utils::truncate;
use crate::Result;

/// whisper.cpp binary names, newest first
const CPP_BINARIES: &[&str] = &["whisper-cli", "whisper-cpp"];
/// Installed by openai-whisper, and by some MLX ports under the same name
const GENERIC_BINARY: &str = "whisper";
const MLX_BINARY: &str = "mlx_whisper";

/// A speech-to-text backend ready to invoke
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhisperBackend {
    Cpp { executable: PathBuf, model: PathBuf },
    Python { executable: PathBuf },
    Mlx { executable: PathBuf },
    Cloud,
}

impl WhisperBackend {
    pub fn describe(&self) -> String {
        match self {
            WhisperBackend::Cpp { executable, model } => format!(
                "whisper.cpp ({}, model {})",
                executable.display(),
                model.display()
            ),
            WhisperBackend::Python { executable } => format!("whisper ({})", executable.display()),
            WhisperBackend::Mlx { executable } => format!("mlx-whisper ({})", executable.display()),
            WhisperBackend::Cloud => "cloud transcription API".to_string(),
        }
    }

    /// whisper.cpp wants 16 kHz WAV; everything else takes compact MP3
    pub fn audio_format(&self) -> AudioFormat {
        match self {
            WhisperBackend::Cpp { .. } => AudioFormat::Wav,
            _ => AudioFormat::Mp3,
        }
    }

    /// Files the backend needs are still in place
    fn is_ready(&self, config: &WhisperConfig) -> bool {
        match self {
            WhisperBackend::Cpp { executable, model } => executable.is_file() && model.is_file(),
            WhisperBackend::Python { executable } | WhisperBackend::Mlx { executable } => {
                executable.is_file()
            }
            WhisperBackend::Cloud => config.cloud_api_key.is_some(),
        }
    }
}

/// What the generic `whisper` binary turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericWhisper {
    Python,
    Mlx,
}

/// Classify the generic `whisper` binary from its usage text.
///
/// Best effort: MLX ports mention "mlx" in their help. When the help probe
/// fails the binary is assumed to be openai-whisper.
pub fn classify_generic_whisper(help: Option<&str>) -> GenericWhisper {
    match help {
        Some(text) if text.to_lowercase().contains("mlx") => GenericWhisper::Mlx,
        _ => GenericWhisper::Python,
    }
}

/// Find a usable speech-to-text backend.
///
/// A backend pinned in the config is the only one considered. Otherwise the
/// priority is whisper.cpp, Python whisper, MLX whisper, then the cloud API.
pub async fn probe_whisper_backend(
    tools: &dyn ToolLocator,
    config: &WhisperConfig,
) -> Option<WhisperBackend> {
    let mut generic = GenericProbe::new(tools);

    if let Some(kind) = config.backend {
        let backend = locate_backend(tools, config, kind, &mut generic).await;
        if backend.is_none() {
            tracing::debug!("Configured whisper backend '{}' was not found", kind.as_str());
        }
        return backend;
    }

    for kind in [
        WhisperBackendKind::Cpp,
        WhisperBackendKind::Python,
        WhisperBackendKind::Mlx,
        WhisperBackendKind::Cloud,
    ] {
        if let Some(backend) = locate_backend(tools, config, kind, &mut generic).await {
            tracing::debug!("Detected whisper backend: {}", backend.describe());
            return Some(backend);
        }
    }

    None
}

async fn locate_backend(
    tools: &dyn ToolLocator,
    config: &WhisperConfig,
    kind: WhisperBackendKind,
    generic: &mut GenericProbe<'_>,
) -> Option<WhisperBackend> {
    match kind {
        WhisperBackendKind::Cpp => {
            let Some(model) = config.model_path.clone().filter(|path| path.is_file()) else {
                tracing::debug!("Skipping whisper.cpp: no model file configured");
                return None;
            };
            for name in CPP_BINARIES {
                if let Some(executable) = tools.find_executable(name).await {
                    return Some(WhisperBackend::Cpp { executable, model });
                }
            }
            None
        }
        WhisperBackendKind::Python => match generic.classify().await {
            Some((GenericWhisper::Python, executable)) => Some(WhisperBackend::Python { executable }),
            _ => None,
        },
        WhisperBackendKind::Mlx => {
            if let Some((GenericWhisper::Mlx, executable)) = generic.classify().await {
                return Some(WhisperBackend::Mlx { executable });
            }
            tools
                .find_executable(MLX_BINARY)
                .await
                .map(|executable| WhisperBackend::Mlx { executable })
        }
        WhisperBackendKind::Cloud => config
            .cloud_api_key
            .as_ref()
            .filter(|key| !key.trim().is_empty())
            .map(|_| WhisperBackend::Cloud),
    }
}

/// The generic `whisper` binary, looked up and classified at most once per probe
struct GenericProbe<'a> {
    tools: &'a dyn ToolLocator,
    found: Option<Option<(GenericWhisper, PathBuf)>>,
}

impl<'a> GenericProbe<'a> {
    fn new(tools: &'a dyn ToolLocator) -> Self {
        Self { tools, found: None }
    }

    async fn classify(&mut self) -> Option<(GenericWhisper, PathBuf)> {
        if self.found.is_none() {
            self.found = Some(self.lookup().await);
        }
        self.found.clone().flatten()
    }

    async fn lookup(&self) -> Option<(GenericWhisper, PathBuf)> {
        let executable = self.tools.find_executable(GENERIC_BINARY).await?;
        let help = self.tools.help_text(&executable).await;
        Some((classify_generic_whisper(help.as_deref()), executable))
    }
}

/// Speech-to-text over audio downloaded with yt-dlp
#[derive(Debug)]
pub struct WhisperProvider {
    downloader: YtDlpProvider,
    backend: WhisperBackend,
    config: WhisperConfig,
    language: String,
    client: Client,
}

impl WhisperProvider {
    pub fn new(
        downloader: YtDlpProvider,
        backend: WhisperBackend,
        config: WhisperConfig,
        language: impl Into<String>,
    ) -> Self {
        Self {
            downloader,
            backend,
            config,
            language: language.into(),
            client: Client::new(),
        }
    }

    pub fn backend(&self) -> &WhisperBackend {
        &self.backend
    }

    pub async fn check_availability(&self) -> bool {
        self.downloader.check_availability().await && self.backend.is_ready(&self.config)
    }

    pub async fn fetch_transcript(&self, video_id: &VideoId) -> Result<Option<TranscriptResult>> {
        // Audio and backend output live here until this function returns
        let scratch = scratch_dir(self.downloader.temp_root())?;
        let format = self.backend.audio_format();

        let (audio, title) = self
            .downloader
            .download_audio(video_id, scratch.path(), format)
            .await?;

        tracing::info!("Transcribing {} with {}", video_id, self.backend.describe());

        let raw = match &self.backend {
            WhisperBackend::Cpp { executable, model } => {
                self.transcribe_cpp(executable, model, &audio, scratch.path()).await?
            }
            WhisperBackend::Python { executable } => {
                self.transcribe_python(executable, &audio, scratch.path()).await?
            }
            WhisperBackend::Mlx { executable } => {
                self.transcribe_mlx(executable, &audio, scratch.path()).await?
            }
            WhisperBackend::Cloud => self.transcribe_cloud(&audio, format).await?,
        };

        let text = subtitles::clean_text(&raw);
        Ok(TranscriptResult::new(text, TranscriptSource::Whisper)
            .map(|result| result.with_title(title).with_language(self.language_hint())))
    }

    /// ISO 639-1 code for the backends, or `None` to let them detect it
    fn language_hint(&self) -> Option<String> {
        let language = self.language.trim();
        if language.eq_ignore_ascii_case("auto") {
            return None;
        }
        language
            .split(['-', '_'])
            .next()
            .filter(|code| !code.is_empty())
            .map(str::to_lowercase)
    }

    async fn transcribe_cpp(
        &self,
        executable: &Path,
        model: &Path,
        audio: &Path,
        dir: &Path,
    ) -> Result<String> {
        let base = dir.join("transcript");
        let args: Vec<OsString> = vec![
            "-m".into(),
            model.into(),
            "-f".into(),
            audio.into(),
            "-l".into(),
            self.language_hint().unwrap_or_else(|| "auto".to_string()).into(),
            "-otxt".into(),
            "-of".into(),
            base.clone().into_os_string(),
            "-np".into(),
        ];

        run_backend(executable, args).await?;
        read_output(&base.with_extension("txt"))
    }

    async fn transcribe_python(&self, executable: &Path, audio: &Path, dir: &Path) -> Result<String> {
        let mut args: Vec<OsString> = vec![
            audio.into(),
            "--model".into(),
            self.config.model.clone().into(),
            "--output_format".into(),
            "txt".into(),
            "--output_dir".into(),
            dir.into(),
            "--verbose".into(),
            "False".into(),
        ];
        if let Some(language) = self.language_hint() {
            args.push("--language".into());
            args.push(language.into());
        }

        run_backend(executable, args).await?;
        read_output(&dir.join(output_name(audio)))
    }

    async fn transcribe_mlx(&self, executable: &Path, audio: &Path, dir: &Path) -> Result<String> {
        let mut args: Vec<OsString> = vec![
            audio.into(),
            "--model".into(),
            self.config.mlx_model.clone().into(),
            "--output-format".into(),
            "txt".into(),
            "--output-dir".into(),
            dir.into(),
        ];
        if let Some(language) = self.language_hint() {
            args.push("--language".into());
            args.push(language.into());
        }

        run_backend(executable, args).await?;
        read_output(&dir.join(output_name(audio)))
    }

    async fn transcribe_cloud(&self, audio: &Path, format: AudioFormat) -> Result<String> {
        let api_key = self
            .config
            .cloud_api_key
            .as_deref()
            .context("No API key configured for cloud transcription")?;

        let bytes = tokio::fs::read(audio)
            .await
            .with_context(|| format!("Failed to read {}", audio.display()))?;
        let file_name = audio
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        tracing::debug!("Uploading {} bytes to {}", bytes.len(), self.config.cloud_url);

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(format.mime_type())?;

        let mut form = Form::new()
            .part("file", part)
            .text("model", self.config.cloud_model.clone())
            .text("response_format", "json");
        if let Some(language) = self.language_hint() {
            form = form.text("language", language);
        }

        let response = self
            .client
            .post(&self.config.cloud_url)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .context("Cloud transcription request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Cloud transcription returned HTTP {}: {}", status, truncate(&body, 300));
        }

        let json: Value = response
            .json()
            .await
            .context("Cloud transcription returned invalid JSON")?;

        let text = json
            .get("text")
            .and_then(Value::as_str)
            .context("Cloud transcription response has no text")?;

        Ok(text.to_string())
    }
}

/// Python and MLX whisper name their output after the input file
fn output_name(audio: &Path) -> PathBuf {
    let stem = audio
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_else(|| OsString::from("audio"));
    PathBuf::from(stem).with_extension("txt")
}

async fn run_backend(executable: &Path, args: Vec<OsString>) -> Result<()> {
    let output = Command::new(executable)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("Failed to run {}", executable.display()))?;

    if !output.status.success() {
        let error = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "{} failed ({}): {}",
            executable.display(),
            output.status,
            truncate(&error, 500)
        );
    }

    Ok(())
}

fn read_output(path: &Path) -> Result<String> {
    fs_err::read_to_string(path)
        .with_context(|| format!("Speech-to-text produced no transcript at {}", path.display()))
}
