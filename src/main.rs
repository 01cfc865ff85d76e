use anyhow::Result;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use yt_transcript_article::cli::{Cli, Commands, GlobalArgs};
use yt_transcript_article::config::Config;
use yt_transcript_article::output::{self, RenderOptions};
use yt_transcript_article::tools::SystemTools;
use yt_transcript_article::{TranscriptPipeline, TranscriptProvider, VideoId};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(&cli.global);

    match cli.command {
        Commands::Fetch {
            inputs,
            provider,
            no_fallback,
            language,
            output_dir,
            format,
        } => {
            let mut config = Config::load(&cli.global)?;
            if let Some(language) = language {
                config.app.language = language;
                config.validate()?;
            }

            // Reject bad input before probing any tools
            let video_ids = inputs
                .iter()
                .map(|input| input.parse::<VideoId>())
                .collect::<Result<Vec<_>, _>>()?;

            let pipeline = TranscriptPipeline::new(&config, provider, no_fallback, &SystemTools::new())
                .await?
                .with_progress(!cli.global.quiet);
            print_warnings(pipeline.warnings());

            let options = RenderOptions::new(&config, format);
            let mut failed = 0;

            for video_id in &video_ids {
                let report = match pipeline.fetch(video_id).await {
                    Ok(report) => report,
                    Err(error) => {
                        failed += 1;
                        eprintln!("{} {}", style("✗").red().bold(), error);
                        continue;
                    }
                };

                for attempt in &report.attempts {
                    tracing::debug!("Before success for {}: {}", video_id, attempt);
                }

                match &output_dir {
                    Some(dir) => {
                        let path = output::save_to_file(&report.transcript, video_id, dir, &options)?;
                        eprintln!("{} Transcript saved to: {}", style("✓").green().bold(), path.display());
                    }
                    None => output::print_to_console(&report.transcript, video_id, &options)?,
                }
            }

            if failed > 0 {
                eprintln!(
                    "{}",
                    style(format!("{} of {} videos failed", failed, video_ids.len())).red()
                );
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Providers { provider } => {
            let config = Config::load(&cli.global)?;
            let pipeline = TranscriptPipeline::new(&config, provider, false, &SystemTools::new()).await?;

            println!("Transcript sources ({} mode):", provider);
            for (index, source) in pipeline.chain().iter().enumerate() {
                let status = if source.check_availability().await {
                    style("ready").green()
                } else {
                    style("unavailable").red()
                };
                println!("  {}. {:<8} {} [{}]", index + 1, source.name(), source.describe(), status);
            }
            println!(
                "Fallback: {}",
                if pipeline.allow_fallback() {
                    "next source is tried when one has no transcript or fails"
                } else {
                    "off (a forced source is the only one tried)"
                }
            );
            print_warnings(pipeline.warnings());
        }
        Commands::Config { show, init } => {
            if init {
                let path = match &cli.global.config {
                    Some(path) => path.clone(),
                    None => Config::config_path()?,
                };
                if path.exists() {
                    println!("Config file already exists at {}", path.display());
                } else {
                    Config::default().save(&path)?;
                    println!("Wrote default configuration to {}", path.display());
                }
            }

            if show || !init {
                Config::load(&cli.global)?.display();
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Logs go to stderr so rendered transcripts can be piped from stdout
fn init_tracing(args: &GlobalArgs) {
    let default_level = if args.verbose {
        "yt_transcript_article=debug"
    } else {
        "yt_transcript_article=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        eprintln!("{} {}", style("⚠️ ").yellow(), style(warning).yellow());
    }
}
