//! Provider chain resolution.
//!
//! A forced provider either resolves with all of its prerequisites or fails
//! the run up front. Auto mode includes every provider whose prerequisites
//! are met, in priority order, and reports the gaps as warnings.

use crate::cli::ProviderMode;
use crate::config::Config;
use crate::providers::{
    probe_whisper_backend, ApiProvider, Provider, WhisperProvider, YtDlpProvider,
};
use crate::tools::ToolLocator;
use crate::TranscriptError;

const YTDLP_BINARY: &str = "yt-dlp";

const API_HINT: &str =
    "Set TRANSCRIPT_API_TOKEN (or api.token in the config file) to use the transcript API";
const YTDLP_HINT: &str =
    "Install yt-dlp to download captions: `pip install yt-dlp` or `brew install yt-dlp`";
const WHISPER_HINT: &str = "Install a speech-to-text backend: whisper.cpp (with WHISPER_MODEL_PATH), \
`pip install openai-whisper`, `pip install mlx-whisper`, or set OPENAI_API_KEY for cloud transcription";

/// Providers to try, in order, plus advisory warnings about missing ones
#[derive(Debug)]
pub struct Resolution {
    pub chain: Vec<Provider>,
    pub warnings: Vec<String>,
}

/// Build the provider chain for this run
pub async fn resolve(
    config: &Config,
    mode: ProviderMode,
    tools: &dyn ToolLocator,
) -> Result<Resolution, TranscriptError> {
    let resolution = match mode {
        ProviderMode::Auto => resolve_auto(config, tools).await?,
        ProviderMode::Api => forced(Provider::Api(forced_api(config)?)),
        ProviderMode::Ytdlp => forced(Provider::Ytdlp(forced_ytdlp(config, tools).await?)),
        ProviderMode::Whisper => forced(Provider::Whisper(forced_whisper(config, tools).await?)),
    };

    tracing::debug!(
        "Resolved provider chain ({}): {:?}",
        mode,
        resolution.chain.iter().map(|p| p.source().as_str()).collect::<Vec<_>>()
    );

    Ok(resolution)
}

fn forced(provider: Provider) -> Resolution {
    Resolution {
        chain: vec![provider],
        warnings: Vec::new(),
    }
}

async fn resolve_auto(config: &Config, tools: &dyn ToolLocator) -> Result<Resolution, TranscriptError> {
    let mut chain = Vec::new();
    let mut warnings = Vec::new();

    match api_provider(config) {
        Some(api) => chain.push(Provider::Api(api)),
        None => warnings.push(format!(
            "Transcript API disabled: no access token configured. {}",
            API_HINT
        )),
    }

    match ytdlp_provider(config, tools).await {
        Some(ytdlp) => {
            chain.push(Provider::Ytdlp(ytdlp.clone()));

            match whisper_provider(config, ytdlp, tools).await {
                Some(whisper) => chain.push(Provider::Whisper(whisper)),
                None => warnings.push(format!(
                    "No speech-to-text backend found; videos without captions cannot be transcribed. {}",
                    WHISPER_HINT
                )),
            }
        }
        None => warnings.push(format!(
            "yt-dlp not found; caption download and speech-to-text are disabled. {}",
            YTDLP_HINT
        )),
    }

    if chain.is_empty() {
        return Err(TranscriptError::NoProviderAvailable {
            hints: vec![
                API_HINT.to_string(),
                YTDLP_HINT.to_string(),
                format!("Then, for videos without captions: {}", WHISPER_HINT),
            ],
        });
    }

    Ok(Resolution { chain, warnings })
}

fn forced_api(config: &Config) -> Result<ApiProvider, TranscriptError> {
    api_provider(config).ok_or_else(|| TranscriptError::Configuration {
        message: "--provider api requires a transcript API token".to_string(),
        hint: API_HINT.to_string(),
    })
}

async fn forced_ytdlp(config: &Config, tools: &dyn ToolLocator) -> Result<YtDlpProvider, TranscriptError> {
    ytdlp_provider(config, tools)
        .await
        .ok_or_else(|| TranscriptError::Configuration {
            message: "--provider ytdlp requires yt-dlp, which was not found".to_string(),
            hint: YTDLP_HINT.to_string(),
        })
}

async fn forced_whisper(config: &Config, tools: &dyn ToolLocator) -> Result<WhisperProvider, TranscriptError> {
    let downloader = ytdlp_provider(config, tools)
        .await
        .ok_or_else(|| TranscriptError::Configuration {
            message: "--provider whisper requires yt-dlp to download audio, which was not found"
                .to_string(),
            hint: YTDLP_HINT.to_string(),
        })?;

    whisper_provider(config, downloader, tools)
        .await
        .ok_or_else(|| TranscriptError::Configuration {
            message: match config.whisper.backend {
                Some(kind) => format!(
                    "--provider whisper: the configured '{}' backend is not usable",
                    kind.as_str()
                ),
                None => "--provider whisper requires a speech-to-text backend, none was found"
                    .to_string(),
            },
            hint: WHISPER_HINT.to_string(),
        })
}

fn api_provider(config: &Config) -> Option<ApiProvider> {
    config
        .api
        .token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| ApiProvider::new(config.api.url.clone(), token))
}

async fn ytdlp_provider(config: &Config, tools: &dyn ToolLocator) -> Option<YtDlpProvider> {
    let executable = tools.find_executable(YTDLP_BINARY).await?;

    Some(YtDlpProvider::new(
        executable,
        config.app.language.clone(),
        config.app.temp_dir.clone(),
    ))
}

async fn whisper_provider(
    config: &Config,
    downloader: YtDlpProvider,
    tools: &dyn ToolLocator,
) -> Option<WhisperProvider> {
    let backend = probe_whisper_backend(tools, &config.whisper).await?;

    Some(WhisperProvider::new(
        downloader,
        backend,
        config.whisper.clone(),
        config.app.language.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WhisperBackendKind;
    use crate::providers::{TranscriptProvider, WhisperBackend};
    use crate::tools::MockToolLocator;
    use std::path::PathBuf;

    fn tools_with(installed: &'static [&'static str]) -> MockToolLocator {
        let mut tools = MockToolLocator::new();
        tools.expect_find_executable().returning(move |name| {
            installed
                .contains(&name)
                .then(|| PathBuf::from(format!("/usr/bin/{}", name)))
        });
        tools
            .expect_help_text()
            .returning(|_| Some("usage: whisper [-h] audio".to_string()));
        tools
    }

    fn config_with_token(token: Option<&str>) -> Config {
        let mut config = Config::default();
        config.api.token = token.map(str::to_string);
        config
    }

    fn names(resolution: &Resolution) -> Vec<&'static str> {
        resolution.chain.iter().map(|provider| provider.name()).collect()
    }

    #[tokio::test]
    async fn test_forced_api_without_token_fails_before_probing() {
        // No expectations: any tool lookup or probe would panic
        let tools = MockToolLocator::new();

        for token in [None, Some(""), Some("   ")] {
            let error = resolve(&config_with_token(token), ProviderMode::Api, &tools)
                .await
                .unwrap_err();
            assert!(matches!(error, TranscriptError::Configuration { .. }), "{}", error);
            assert!(error.to_string().contains("TRANSCRIPT_API_TOKEN"));
        }
    }

    #[tokio::test]
    async fn test_forced_api_is_the_only_provider() {
        let tools = tools_with(&["yt-dlp", "whisper"]);
        let resolution = resolve(&config_with_token(Some("abc")), ProviderMode::Api, &tools)
            .await
            .unwrap();

        assert_eq!(names(&resolution), vec!["api"]);
        assert!(resolution.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_forced_ytdlp_requires_the_tool() {
        let error = resolve(&config_with_token(Some("abc")), ProviderMode::Ytdlp, &tools_with(&[]))
            .await
            .unwrap_err();
        assert!(matches!(error, TranscriptError::Configuration { .. }));

        let resolution = resolve(&Config::default(), ProviderMode::Ytdlp, &tools_with(&["yt-dlp"]))
            .await
            .unwrap();
        assert_eq!(names(&resolution), vec!["ytdlp"]);
    }

    #[tokio::test]
    async fn test_forced_whisper_needs_downloader_and_backend() {
        let error = resolve(&Config::default(), ProviderMode::Whisper, &tools_with(&["whisper"]))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("yt-dlp"));

        let error = resolve(&Config::default(), ProviderMode::Whisper, &tools_with(&["yt-dlp"]))
            .await
            .unwrap_err();
        assert!(matches!(error, TranscriptError::Configuration { .. }));
        assert!(error.to_string().contains("speech-to-text backend"));

        let resolution = resolve(
            &Config::default(),
            ProviderMode::Whisper,
            &tools_with(&["yt-dlp", "whisper"]),
        )
        .await
        .unwrap();
        assert_eq!(names(&resolution), vec!["whisper"]);
    }

    #[tokio::test]
    async fn test_forced_whisper_with_unusable_pinned_backend() {
        let mut config = Config::default();
        config.whisper.backend = Some(WhisperBackendKind::Cloud);

        let error = resolve(&config, ProviderMode::Whisper, &tools_with(&["yt-dlp", "whisper"]))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("'cloud' backend"));
    }

    #[tokio::test]
    async fn test_auto_full_chain_in_priority_order() {
        let mut config = config_with_token(Some("abc"));
        config.whisper.cloud_api_key = Some("sk-test".to_string());

        let resolution = resolve(&config, ProviderMode::Auto, &tools_with(&["yt-dlp"]))
            .await
            .unwrap();

        assert_eq!(names(&resolution), vec!["api", "ytdlp", "whisper"]);
        assert!(resolution.warnings.is_empty());
        match &resolution.chain[2] {
            Provider::Whisper(whisper) => assert_eq!(whisper.backend(), &WhisperBackend::Cloud),
            other => panic!("unexpected provider: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_auto_without_token_warns_and_continues() {
        let resolution = resolve(&Config::default(), ProviderMode::Auto, &tools_with(&["yt-dlp"]))
            .await
            .unwrap();

        assert_eq!(names(&resolution), vec!["ytdlp"]);
        assert_eq!(resolution.warnings.len(), 2);
        assert!(resolution.warnings[0].contains("Transcript API disabled"));
        assert!(resolution.warnings[1].contains("speech-to-text"));
    }

    #[tokio::test]
    async fn test_auto_whisper_requires_downloader() {
        let mut config = config_with_token(Some("abc"));
        config.whisper.cloud_api_key = Some("sk-test".to_string());

        let resolution = resolve(&config, ProviderMode::Auto, &tools_with(&["whisper"]))
            .await
            .unwrap();

        assert_eq!(names(&resolution), vec!["api"]);
        assert_eq!(resolution.warnings.len(), 1);
        assert!(resolution.warnings[0].contains("yt-dlp not found"));
    }

    #[tokio::test]
    async fn test_auto_with_nothing_available() {
        let error = resolve(&Config::default(), ProviderMode::Auto, &tools_with(&[]))
            .await
            .unwrap_err();

        match &error {
            TranscriptError::NoProviderAvailable { hints } => assert_eq!(hints.len(), 3),
            other => panic!("unexpected error: {}", other),
        }
        assert!(error.to_string().contains("pip install yt-dlp"));
    }
}
