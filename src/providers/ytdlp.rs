use anyhow::Context;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;

use super::{scratch_dir, TranscriptResult, TranscriptSource};
use crate::extractors::VideoId;
use crate::subtitles::{self, SubtitleFormat};
use crate::utils::truncate;
use crate::Result;

/// Audio container requested from yt-dlp before speech-to-text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }

    /// Get MIME type for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
        }
    }
}

/// A caption file written by yt-dlp
#[derive(Debug, Clone, PartialEq, Eq)]
struct SubtitleFile {
    path: PathBuf,
    format: SubtitleFormat,
    language: Option<String>,
}

/// Captions (manual or auto-generated) downloaded with yt-dlp
#[derive(Debug, Clone)]
pub struct YtDlpProvider {
    executable: PathBuf,
    language: String,
    temp_root: Option<PathBuf>,
}

impl YtDlpProvider {
    pub fn new(executable: PathBuf, language: impl Into<String>, temp_root: Option<PathBuf>) -> Self {
        Self {
            executable,
            language: language.into(),
            temp_root,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn temp_root(&self) -> Option<&Path> {
        self.temp_root.as_deref()
    }

    /// The resolved binary is still in place
    pub async fn check_availability(&self) -> bool {
        self.executable.is_file()
    }

    pub async fn fetch_transcript(&self, video_id: &VideoId) -> Result<Option<TranscriptResult>> {
        let scratch = scratch_dir(self.temp_root())?;

        tracing::info!("Downloading captions for {} with yt-dlp", video_id);
        let title = self.download_subtitles(video_id, scratch.path()).await?;

        let Some(subtitle) = find_subtitle(scratch.path(), &self.language)? else {
            tracing::info!("yt-dlp found no captions for {}", video_id);
            return Ok(None);
        };

        tracing::debug!(
            "Parsing {} captions from {}",
            subtitle.format.as_str(),
            subtitle.path.display()
        );

        let raw = fs_err::read_to_string(&subtitle.path)
            .context("Failed to read downloaded captions")?;
        let text = subtitles::parse(&raw, subtitle.format);

        Ok(TranscriptResult::new(text, TranscriptSource::Ytdlp)
            .map(|result| result.with_title(title).with_language(subtitle.language)))
    }

    /// Write caption files for the video into `dir`; returns the video title
    async fn download_subtitles(&self, video_id: &VideoId, dir: &Path) -> Result<Option<String>> {
        let args: Vec<OsString> = vec![
            "--skip-download".into(),
            "--write-subs".into(),
            "--write-auto-subs".into(),
            "--sub-langs".into(),
            self.sub_langs().into(),
            "--sub-format".into(),
            "vtt/srv3/srt/best".into(),
            "--no-playlist".into(),
            "--no-warnings".into(),
            "--no-simulate".into(),
            "--print".into(),
            "%(title)s".into(),
            "--output".into(),
            dir.join("%(id)s.%(ext)s").into_os_string(),
            video_id.watch_url().into(),
        ];

        let output = self.run(args).await?;

        Ok(first_line(&output.stdout))
    }

    /// Download the audio track into `dir`; returns the file and the video title
    pub async fn download_audio(
        &self,
        video_id: &VideoId,
        dir: &Path,
        format: AudioFormat,
    ) -> Result<(PathBuf, Option<String>)> {
        tracing::info!("Downloading audio for {} with yt-dlp", video_id);

        let mut args: Vec<OsString> = vec![
            "--format".into(),
            "bestaudio/best".into(),
            "--extract-audio".into(),
            "--audio-format".into(),
            format.as_str().into(),
        ];

        match format {
            // whisper.cpp only reads 16 kHz mono PCM
            AudioFormat::Wav => args.extend([
                OsString::from("--postprocessor-args"),
                OsString::from("ExtractAudio:-ar 16000 -ac 1"),
            ]),
            // Lowest quality keeps uploads small and is still fine for speech
            AudioFormat::Mp3 => args.extend([OsString::from("--audio-quality"), OsString::from("9")]),
        }

        args.extend([
            OsString::from("--no-playlist"),
            OsString::from("--no-warnings"),
            OsString::from("--no-simulate"),
            OsString::from("--print"),
            OsString::from("%(title)s"),
            OsString::from("--output"),
            dir.join("audio.%(ext)s").into_os_string(),
            OsString::from(video_id.watch_url()),
        ]);

        let output = self.run(args).await?;

        let expected = dir.join(format!("audio.{}", format.as_str()));
        let audio = if expected.is_file() {
            expected
        } else {
            find_audio_file(dir)?.context("yt-dlp did not produce an audio file")?
        };

        Ok((audio, first_line(&output.stdout)))
    }

    fn sub_langs(&self) -> String {
        let language = match self.language.as_str() {
            "auto" => "en",
            other => other,
        };
        format!("{}.*,{}", language, language)
    }

    async fn run<I>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = OsString>,
    {
        let output = Command::new(&self.executable)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed ({}): {}", output.status, truncate(&error, 500));
        }

        Ok(output)
    }
}

fn first_line(stdout: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && *line != "NA")
        .map(str::to_string)
}

/// Best caption file in `dir`: preferred language first, then preferred format
fn find_subtitle(dir: &Path, language: &str) -> Result<Option<SubtitleFile>> {
    let mut candidates = Vec::new();

    for entry in fs_err::read_dir(dir)? {
        let path = entry?.path();
        let Some(format) = SubtitleFormat::from_path(&path) else {
            continue;
        };
        let language = subtitle_language(&path);
        candidates.push(SubtitleFile {
            path,
            format,
            language,
        });
    }

    candidates.sort_by(|a, b| {
        let key = |file: &SubtitleFile| {
            (
                language_rank(file.language.as_deref(), language),
                file.format.rank(),
                file.path.clone(),
            )
        };
        key(a).cmp(&key(b))
    });

    Ok(candidates.into_iter().next())
}

/// yt-dlp names caption files `<id>.<lang>.<ext>`
fn subtitle_language(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let (_, language) = stem.split_once('.')?;
    if language.is_empty() {
        None
    } else {
        Some(language.to_string())
    }
}

fn language_rank(found: Option<&str>, wanted: &str) -> u8 {
    match found {
        Some(found) if found.eq_ignore_ascii_case(wanted) => 0,
        Some(found) if found.to_lowercase().starts_with(&format!("{}-", wanted.to_lowercase())) => 1,
        Some(_) => 2,
        None => 3,
    }
}

fn find_audio_file(dir: &Path) -> Result<Option<PathBuf>> {
    for entry in fs_err::read_dir(dir)? {
        let path = entry?.path();
        let is_audio = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map_or(false, |stem| stem == "audio");
        if is_audio && path.is_file() {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs_err::write(dir.join(name), "WEBVTT\n").unwrap();
    }

    #[test]
    fn test_subtitle_language_from_file_name() {
        assert_eq!(
            subtitle_language(Path::new("/tmp/dQw4w9WgXcQ.en-orig.vtt")).as_deref(),
            Some("en-orig")
        );
        assert_eq!(subtitle_language(Path::new("/tmp/dQw4w9WgXcQ.vtt")), None);
    }

    #[test]
    fn test_preferred_language_beats_format() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "dQw4w9WgXcQ.de.vtt");
        touch(dir.path(), "dQw4w9WgXcQ.en-US.vtt");
        touch(dir.path(), "dQw4w9WgXcQ.en.srt");
        touch(dir.path(), "dQw4w9WgXcQ.info.json");

        let found = find_subtitle(dir.path(), "en").unwrap().unwrap();
        assert_eq!(found.language.as_deref(), Some("en"));
        assert_eq!(found.format, SubtitleFormat::Srt);
    }

    #[test]
    fn test_format_rank_breaks_ties() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "dQw4w9WgXcQ.en.srt");
        touch(dir.path(), "dQw4w9WgXcQ.en.srv3");
        touch(dir.path(), "dQw4w9WgXcQ.en.vtt");

        let found = find_subtitle(dir.path(), "en").unwrap().unwrap();
        assert_eq!(found.format, SubtitleFormat::Vtt);
    }

    #[test]
    fn test_no_caption_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "notes.txt");
        assert!(find_subtitle(dir.path(), "en").unwrap().is_none());
    }

    #[test]
    fn test_sub_langs_pattern() {
        let provider = YtDlpProvider::new(PathBuf::from("yt-dlp"), "de", None);
        assert_eq!(provider.sub_langs(), "de.*,de");

        let provider = YtDlpProvider::new(PathBuf::from("yt-dlp"), "auto", None);
        assert_eq!(provider.sub_langs(), "en.*,en");
    }

    #[test]
    fn test_first_line_skips_placeholders() {
        assert_eq!(first_line(b"\nNA\nMy Video\n").as_deref(), Some("My Video"));
        assert_eq!(first_line(b""), None);
    }

    #[tokio::test]
    async fn test_missing_executable_is_unavailable() {
        let provider = YtDlpProvider::new(PathBuf::from("/nonexistent/yt-dlp"), "en", None);
        assert!(!provider.check_availability().await);
    }

    #[tokio::test]
    async fn test_failing_executable_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = YtDlpProvider::new(
            PathBuf::from("/nonexistent/yt-dlp"),
            "en",
            Some(dir.path().to_path_buf()),
        );
        let video = VideoId::parse("dQw4w9WgXcQ").unwrap();

        assert!(provider.fetch_transcript(&video).await.is_err());
        // the scratch directory is gone even though the fetch failed
        assert_eq!(fs_err::read_dir(dir.path()).unwrap().count(), 0);
    }
}
