use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::cli::ProviderMode;
use crate::config::Config;
use crate::extractors::VideoId;
use crate::providers::{Provider, TranscriptProvider, TranscriptResult};
use crate::tools::ToolLocator;
use crate::TranscriptError;

pub mod resolver;

pub use resolver::{resolve, Resolution};

/// What happened when one provider was tried for one video
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The availability re-check failed, so the provider was skipped
    Unavailable,
    /// The provider ran but had nothing for this video
    NoTranscript,
    /// The provider failed while fetching
    Failed(String),
}

/// One entry of the per-video attempt log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchAttempt {
    pub provider: &'static str,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

impl fmt::Display for FetchAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::Unavailable => write!(f, "{}: skipped (unavailable)", self.provider),
            AttemptOutcome::NoTranscript => write!(f, "{}: no transcript", self.provider),
            AttemptOutcome::Failed(error) => write!(f, "{}: {}", self.provider, error),
        }
    }
}

/// A transcript plus the providers that were tried before it was found
#[derive(Debug)]
pub struct FetchReport {
    pub transcript: TranscriptResult,
    pub attempts: Vec<FetchAttempt>,
}

/// Try each provider in order until one produces a transcript.
///
/// With `allow_fallback` disabled the first provider that does not succeed
/// ends the run with its own error and later providers are never called.
pub async fn fetch_transcript<P: TranscriptProvider>(
    video_id: &VideoId,
    chain: &[P],
    allow_fallback: bool,
) -> Result<FetchReport, TranscriptError> {
    let mut attempts = Vec::new();

    for provider in chain {
        let name = provider.name();

        if !provider.check_availability().await {
            tracing::debug!("Skipping provider '{}': unavailable", name);
            attempts.push(FetchAttempt {
                provider: name,
                outcome: AttemptOutcome::Unavailable,
            });
            if !allow_fallback {
                break;
            }
            continue;
        }

        tracing::info!("Trying provider '{}' for {}", name, video_id);

        match provider.fetch_transcript(video_id).await {
            Ok(Some(transcript)) => {
                tracing::info!(
                    "Provider '{}' returned {} characters for {}",
                    name,
                    transcript.text().len(),
                    video_id
                );
                return Ok(FetchReport {
                    transcript,
                    attempts,
                });
            }
            Ok(None) => {
                if !allow_fallback {
                    return Err(TranscriptError::NoTranscriptFromProvider {
                        provider: name,
                        video_id: video_id.clone(),
                    });
                }
                tracing::info!("Provider '{}' has no transcript for {}", name, video_id);
                attempts.push(FetchAttempt {
                    provider: name,
                    outcome: AttemptOutcome::NoTranscript,
                });
            }
            Err(error) => {
                if !allow_fallback {
                    return Err(TranscriptError::ProviderExecution {
                        provider: name,
                        source: error,
                    });
                }
                tracing::warn!("Provider '{}' failed for {}: {:#}", name, video_id, error);
                attempts.push(FetchAttempt {
                    provider: name,
                    outcome: AttemptOutcome::Failed(format!("{:#}", error)),
                });
            }
        }
    }

    Err(TranscriptError::AllProvidersFailed {
        video_id: video_id.clone(),
        attempts,
    })
}

/// The resolved provider chain, reused for every video in a run
pub struct TranscriptPipeline {
    chain: Vec<Provider>,
    warnings: Vec<String>,
    allow_fallback: bool,
    show_progress: bool,
}

impl TranscriptPipeline {
    /// Resolve the provider chain for this run
    pub async fn new(
        config: &Config,
        mode: ProviderMode,
        no_fallback: bool,
        tools: &dyn ToolLocator,
    ) -> Result<Self, TranscriptError> {
        let Resolution { chain, warnings } = resolve(config, mode, tools).await?;

        Ok(Self {
            chain,
            warnings,
            // A forced provider never falls back to anything else
            allow_fallback: !mode.is_forced() && !no_fallback,
            show_progress: true,
        })
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn chain(&self) -> &[Provider] {
        &self.chain
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn allow_fallback(&self) -> bool {
        self.allow_fallback
    }

    /// Fetch one video's transcript through the chain
    pub async fn fetch(&self, video_id: &VideoId) -> Result<FetchReport, TranscriptError> {
        let progress = if self.show_progress {
            let progress = ProgressBar::new_spinner();
            progress.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            progress.set_message(format!("Fetching transcript for {}...", video_id));
            progress.enable_steady_tick(Duration::from_millis(120));
            Some(progress)
        } else {
            None
        };

        let result = fetch_transcript(video_id, &self.chain, self.allow_fallback).await;

        if let Some(progress) = progress {
            match &result {
                Ok(report) => progress.finish_with_message(format!(
                    "Transcript for {} via {}",
                    video_id,
                    report.transcript.source()
                )),
                Err(_) => progress.finish_and_clear(),
            }
        }

        result
    }
}
