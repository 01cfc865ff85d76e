use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::extractors::VideoId;
use crate::providers::{TranscriptResult, TranscriptSource};

/// Word count per paragraph when the transcript has no sentence punctuation
pub const WORDS_PER_CHUNK: usize = 120;

const SENTENCE_ENDINGS: &[char] = &['.', '!', '?', '…'];
const CLOSING_MARKS: &[char] = &['"', '\'', ')', ']', '”', '’'];

#[derive(Serialize)]
struct JsonArticle<'a> {
    video_id: &'a str,
    url: String,
    title: Option<&'a str>,
    language: Option<&'a str>,
    source: TranscriptSource,
    fetched_at: DateTime<Utc>,
    text: &'a str,
}

/// Markdown article: title, source line, wrapped paragraphs
pub fn format_as_markdown(
    result: &TranscriptResult,
    video_id: &VideoId,
    wrap_width: usize,
    sentences_per_paragraph: usize,
) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", article_title(result, video_id)));

    let url = video_id.watch_url();
    let mut source_line = format!("_Source: [{}]({}) · transcript via {}", url, url, result.source());
    if let Some(language) = result.language() {
        source_line.push_str(&format!(" · language: {}", language));
    }
    source_line.push('_');
    output.push_str(&source_line);
    output.push_str("\n\n");

    output.push_str(&format_as_text(result, wrap_width, sentences_per_paragraph));
    output
}

/// Wrapped paragraphs separated by blank lines
pub fn format_as_text(result: &TranscriptResult, wrap_width: usize, sentences_per_paragraph: usize) -> String {
    let mut output = paragraphs(result.text(), sentences_per_paragraph)
        .iter()
        .map(|paragraph| wrap(paragraph, wrap_width))
        .collect::<Vec<_>>()
        .join("\n\n");
    output.push('\n');
    output
}

/// Pretty-printed JSON with metadata and the unwrapped text
pub fn format_as_json(result: &TranscriptResult, video_id: &VideoId) -> Result<String> {
    let article = JsonArticle {
        video_id: video_id.as_str(),
        url: video_id.watch_url(),
        title: result.title(),
        language: result.language(),
        source: result.source(),
        fetched_at: Utc::now(),
        text: result.text(),
    };

    Ok(serde_json::to_string_pretty(&article)?)
}

fn article_title(result: &TranscriptResult, video_id: &VideoId) -> String {
    match result.title() {
        Some(title) => title.trim().to_string(),
        None => format!("YouTube video {}", video_id),
    }
}

/// Group the transcript into paragraphs of `sentences_per_paragraph`
/// sentences, or fixed word chunks when there is no sentence punctuation
pub fn paragraphs(text: &str, sentences_per_paragraph: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let sentences = sentences(&words);
    if sentences.len() <= 1 && !ends_sentence(words[words.len() - 1]) {
        return words
            .chunks(WORDS_PER_CHUNK)
            .map(|chunk| chunk.join(" "))
            .collect();
    }

    sentences
        .chunks(sentences_per_paragraph.max(1))
        .map(|group| group.join(" "))
        .collect()
}

fn sentences(words: &[&str]) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in words {
        current.push(word);
        if ends_sentence(word) {
            sentences.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        sentences.push(current.join(" "));
    }

    sentences
}

fn ends_sentence(word: &str) -> bool {
    word.trim_end_matches(CLOSING_MARKS)
        .ends_with(SENTENCE_ENDINGS)
}

/// Greedy word wrap; words longer than `width` get a line of their own
pub fn wrap(text: &str, width: usize) -> String {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }

    lines.join("\n")
}
