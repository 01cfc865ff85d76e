use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::extractors::VideoId;
use crate::providers::TranscriptResult;
use crate::utils::output_file_name;

pub mod formatters;

pub use formatters::*;

/// How transcripts are rendered for this run
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub format: OutputFormat,
    pub wrap_width: usize,
    pub sentences_per_paragraph: usize,
}

impl RenderOptions {
    pub fn new(config: &Config, format: OutputFormat) -> Self {
        Self {
            format,
            wrap_width: config.app.wrap_width,
            sentences_per_paragraph: config.app.sentences_per_paragraph,
        }
    }
}

/// Render a transcript in the requested format
pub fn render(result: &TranscriptResult, video_id: &VideoId, options: &RenderOptions) -> Result<String> {
    let content = match options.format {
        OutputFormat::Markdown => format_as_markdown(
            result,
            video_id,
            options.wrap_width,
            options.sentences_per_paragraph,
        ),
        OutputFormat::Text => {
            format_as_text(result, options.wrap_width, options.sentences_per_paragraph)
        }
        OutputFormat::Json => format_as_json(result, video_id)?,
    };

    Ok(content)
}

/// Write the rendered transcript into `dir`; returns the file path
pub fn save_to_file(
    result: &TranscriptResult,
    video_id: &VideoId,
    dir: &Path,
    options: &RenderOptions,
) -> Result<PathBuf> {
    let content = render(result, video_id, options)?;

    fs_err::create_dir_all(dir).context("Failed to create output directory")?;

    let path = dir.join(output_file_name(
        video_id,
        result.title(),
        options.format.extension(),
    ));
    fs_err::write(&path, content)?;

    tracing::debug!("Wrote {}", path.display());
    Ok(path)
}

/// Print the rendered transcript to stdout
pub fn print_to_console(result: &TranscriptResult, video_id: &VideoId, options: &RenderOptions) -> Result<()> {
    let content = render(result, video_id, options)?;
    println!("{}", content.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::TranscriptSource;

    #[test]
    fn test_save_to_file_names_file_after_video() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("articles");
        let video = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let result = TranscriptResult::new("Some words. More words.", TranscriptSource::Api)
            .unwrap()
            .with_title(Some("Rick: Never/Gonna".to_string()));
        let options = RenderOptions {
            format: OutputFormat::Text,
            wrap_width: 80,
            sentences_per_paragraph: 1,
        };

        let path = save_to_file(&result, &video, &out, &options).unwrap();

        assert_eq!(path.parent(), Some(out.as_path()));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("dQw4w9WgXcQ-"));
        assert!(name.ends_with(".txt"));
        assert!(!name.contains('/'));
        assert_eq!(
            fs_err::read_to_string(&path).unwrap(),
            "Some words.\n\nMore words.\n"
        );
    }

    #[test]
    fn test_render_options_follow_config() {
        let mut config = Config::default();
        config.app.wrap_width = 60;
        let options = RenderOptions::new(&config, OutputFormat::Json);

        assert_eq!(options.wrap_width, 60);
        assert_eq!(options.sentences_per_paragraph, 4);
        assert_eq!(options.format, OutputFormat::Json);
    }
}
