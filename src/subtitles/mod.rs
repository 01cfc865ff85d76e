//! Caption payload parsing.
//!
//! Turns WebVTT, SubRip and YouTube's XML caption formats into plain text with
//! one caption line per output line. Auto-generated YouTube captions roll the
//! previous line into every new cue, so lines are deduplicated across the whole
//! document rather than per cue.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

lazy_static! {
    static ref INLINE_TIMESTAMP_RE: Regex =
        Regex::new(r"<\d{1,2}:\d{2}(?::\d{2})?[.,]\d{3}>").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"</?[A-Za-z][^>]*>").unwrap();
    static ref LINE_BREAK_TAG_RE: Regex = Regex::new(r"(?i)<br\s*/?>").unwrap();
    static ref XML_PARAGRAPH_RE: Regex =
        Regex::new(r"(?s)<p\b[^>]*>(.*?)</p>|<text\b[^>]*>(.*?)</text>").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref ANNOTATION_RE: Regex = Regex::new(r"^(?:\[[^\]]*\]|\([^)]*\))$").unwrap();
    static ref MUSIC_MARKER_RE: Regex = Regex::new(r"^[♪♫](?:.*[♪♫])?$").unwrap();
    static ref TIMING_RE: Regex = Regex::new(
        r"^\s*(?:\d+:)?\d{1,2}:\d{2}[.,]\d{3}\s+-->\s+(?:\d+:)?\d{1,2}:\d{2}[.,]\d{3}"
    )
    .unwrap();
}

/// Caption formats understood by [`parse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    /// WebVTT, as written by yt-dlp for YouTube captions
    Vtt,
    /// SubRip
    Srt,
    /// XML paragraph formats (srv1/srv2/srv3 timedtext, TTML)
    Xml,
}

impl SubtitleFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "vtt" => Some(SubtitleFormat::Vtt),
            "srt" => Some(SubtitleFormat::Srt),
            "srv1" | "srv2" | "srv3" | "ttml" | "xml" => Some(SubtitleFormat::Xml),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Preference when several caption files exist for one video (lower wins)
    pub fn rank(&self) -> u8 {
        match self {
            SubtitleFormat::Vtt => 0,
            SubtitleFormat::Xml => 1,
            SubtitleFormat::Srt => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubtitleFormat::Vtt => "vtt",
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Xml => "xml",
        }
    }
}

/// Parse a raw caption payload into deduplicated plain text.
///
/// Never fails: input that yields no caption text produces an empty string.
pub fn parse(raw: &str, format: SubtitleFormat) -> String {
    let raw = normalize_newlines(raw);

    let lines = match format {
        SubtitleFormat::Vtt | SubtitleFormat::Srt => cue_lines(&raw, format),
        SubtitleFormat::Xml => xml_lines(&raw),
    };

    finish(lines)
}

/// Run the caption cleaning pipeline over text that has no cue structure
/// (API responses, speech-to-text output).
pub fn clean_text(raw: &str) -> String {
    let raw = normalize_newlines(raw);
    finish(raw.lines().map(str::to_string).collect())
}

fn normalize_newlines(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Text lines of a line-cue document (WebVTT or SubRip), in document order
fn cue_lines(raw: &str, format: SubtitleFormat) -> Vec<String> {
    let mut lines = Vec::new();
    let mut first_block = true;

    for block in raw.split("\n\n") {
        let block = block.trim_matches('\n');
        if block.trim().is_empty() {
            continue;
        }
        let is_first = std::mem::replace(&mut first_block, false);

        if format == SubtitleFormat::Vtt {
            if is_first && block.starts_with("WEBVTT") {
                continue;
            }
            if ["NOTE", "STYLE", "REGION"]
                .iter()
                .any(|keyword| block.starts_with(keyword))
            {
                continue;
            }
        }

        let block_lines: Vec<&str> = block.lines().collect();

        for (index, line) in block_lines.iter().enumerate() {
            // A timing line and the identifier or counter right above it
            let is_identifier = block_lines
                .get(index + 1)
                .map_or(false, |next| is_timing_line(next));
            if is_timing_line(line) || is_identifier {
                continue;
            }
            lines.push(line.to_string());
        }
    }

    lines
}

fn is_timing_line(line: &str) -> bool {
    TIMING_RE.is_match(line)
}

/// Text lines of an XML caption document, one or more per paragraph element
fn xml_lines(raw: &str) -> Vec<String> {
    XML_PARAGRAPH_RE
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .flat_map(|body| {
            let body = LINE_BREAK_TAG_RE.replace_all(body.as_str(), "\n");
            body.lines().map(str::to_string).collect::<Vec<_>>()
        })
        .collect()
}

/// Clean every line, drop annotations and repeats, and join the survivors
fn finish(lines: Vec<String>) -> String {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();

    for line in lines {
        let cleaned = clean_line(&line);
        if cleaned.is_empty() || is_annotation(&cleaned) {
            continue;
        }
        if seen.insert(cleaned.clone()) {
            kept.push(cleaned);
        }
    }

    kept.join("\n")
}

fn clean_line(line: &str) -> String {
    let without_timestamps = INLINE_TIMESTAMP_RE.replace_all(line, "");
    let without_tags = TAG_RE.replace_all(&without_timestamps, "");
    // Escaped markup only becomes a tag once decoded
    let decoded = decode_entities(&without_tags);
    let without_escaped_tags = TAG_RE.replace_all(&decoded, "");
    WHITESPACE_RE
        .replace_all(&without_escaped_tags, " ")
        .trim()
        .to_string()
}

/// Decode the handful of entities caption files actually contain.
/// `&amp;` goes first so double-encoded text (`&amp;#39;`) decodes fully.
fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
}

fn is_annotation(line: &str) -> bool {
    ANNOTATION_RE.is_match(line) || MUSIC_MARKER_RE.is_match(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLLING_VTT: &str = "WEBVTT\nKind: captions\nLanguage: en\n\n\
00:00:00.000 --> 00:00:02.000 align:start position:0%\n\
so<00:00:00.500><c> today</c><00:00:01.000><c> we</c>\n\n\
00:00:02.000 --> 00:00:02.010 align:start position:0%\n\
so today we\n \n\n\
00:00:02.010 --> 00:00:04.000 align:start position:0%\n\
so today we\nare<c> talking</c>\n\n\
00:00:04.000 --> 00:00:04.010 align:start position:0%\n\
are talking\n\n\
00:00:04.010 --> 00:00:06.000 align:start position:0%\n\
are talking\nabout rust\n";

    #[test]
    fn test_vtt_rolling_captions_are_deduplicated() {
        let text = parse(ROLLING_VTT, SubtitleFormat::Vtt);
        assert_eq!(text, "so today we\nare talking\nabout rust");
    }

    #[test]
    fn test_line_repeated_in_five_cues_appears_once() {
        let mut vtt = String::from("WEBVTT\n\n");
        for i in 0..5 {
            vtt.push_str(&format!(
                "00:00:0{}.000 --> 00:00:0{}.500\nwelcome back everyone\n\n",
                i, i
            ));
        }
        vtt.push_str("00:00:06.000 --> 00:00:07.000\nlet's begin\n");

        let text = parse(&vtt, SubtitleFormat::Vtt);
        assert_eq!(text.matches("welcome back everyone").count(), 1);
        assert_eq!(text, "welcome back everyone\nlet's begin");
    }

    #[test]
    fn test_non_consecutive_duplicates_keep_first_position() {
        let srt = "1\n00:00:01,000 --> 00:00:02,000\nalpha\n\n\
2\n00:00:02,000 --> 00:00:03,000\nbeta\n\n\
3\n00:00:03,000 --> 00:00:04,000\nalpha\n\n\
4\n00:00:04,000 --> 00:00:05,000\ngamma\n";

        assert_eq!(parse(srt, SubtitleFormat::Srt), "alpha\nbeta\ngamma");
    }

    #[test]
    fn test_srt_strips_counters_tags_and_entities() {
        let srt = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,000\r\n<i>Tom &amp; Jerry</i>\r\n\r\n\
2\r\n00:00:02,500 --> 00:00:04,000\r\n<font color=\"#fff\">it&#39;s   &quot;fine&quot;</font>\r\n";

        assert_eq!(
            parse(srt, SubtitleFormat::Srt),
            "Tom & Jerry\nit's \"fine\""
        );
    }

    #[test]
    fn test_annotations_and_music_markers_are_dropped() {
        let vtt = "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\n[Music]\n\n\
00:00:01.000 --> 00:00:02.000\n♪ la la la ♪\n\n\
00:00:02.000 --> 00:00:03.000\n(applause)\n\n\
00:00:03.000 --> 00:00:04.000\nthank you [laughs] all\n";

        assert_eq!(parse(vtt, SubtitleFormat::Vtt), "thank you [laughs] all");
    }

    #[test]
    fn test_vtt_note_and_style_blocks_are_skipped() {
        let vtt = "WEBVTT\n\nNOTE this is a comment\nspanning lines\n\n\
STYLE\n::cue { color: red }\n\n\
intro\n00:00:00.000 --> 00:00:01.000\nhello there\n";

        assert_eq!(parse(vtt, SubtitleFormat::Vtt), "hello there");
    }

    #[test]
    fn test_srv3_word_segments_are_joined() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><timedtext format="3">
<body>
<p t="0" d="2000" w="1"><s ac="0">we&#39;re</s><s t="400" ac="0"> going</s><s t="800"> live</s></p>
<p t="2000" d="10" a="1">
</p>
<p t="2010" d="2000" w="1"><s>we&#39;re going live</s></p>
<p t="4000" d="2000"><s>[Music]</s></p>
<p t="6000" d="2000">right &amp; now</p>
</body></timedtext>"#;

        assert_eq!(parse(xml, SubtitleFormat::Xml), "we're going live\nright & now");
    }

    #[test]
    fn test_legacy_timedtext_and_ttml_line_breaks() {
        let timedtext = r#"<transcript><text start="0" dur="1">first line</text><text start="1" dur="1">1 &lt; 2 &amp;&amp; 3 &gt; 2</text></transcript>"#;
        assert_eq!(parse(timedtext, SubtitleFormat::Xml), "first line\n1 < 2 && 3 > 2");

        let ttml = r#"<tt><body><div><p begin="0s" end="1s">top<br/>bottom</p></div></body></tt>"#;
        assert_eq!(parse(ttml, SubtitleFormat::Xml), "top\nbottom");
    }

    #[test]
    fn test_parsing_is_idempotent_on_clean_text() {
        let clean = "first sentence here\nsecond one follows\nthird and last";
        assert_eq!(parse(clean, SubtitleFormat::Vtt), clean);
        assert_eq!(parse(clean, SubtitleFormat::Srt), clean);

        let once = parse(ROLLING_VTT, SubtitleFormat::Vtt);
        assert_eq!(parse(&once, SubtitleFormat::Vtt), once);
    }

    #[test]
    fn test_unparseable_input_yields_empty_text() {
        assert_eq!(parse("", SubtitleFormat::Vtt), "");
        assert_eq!(parse("WEBVTT\n\n", SubtitleFormat::Vtt), "");
        assert_eq!(parse("no paragraphs here", SubtitleFormat::Xml), "");
        assert_eq!(parse("<p", SubtitleFormat::Xml), "");
    }

    #[test]
    fn test_clean_text_collapses_and_dedupes() {
        let raw = "  Hello    world \n\nHello world\n[BLANK_AUDIO]\nsecond&nbsp;line";
        assert_eq!(clean_text(raw), "Hello world\nsecond line");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SubtitleFormat::from_extension("VTT"), Some(SubtitleFormat::Vtt));
        assert_eq!(SubtitleFormat::from_extension("srv3"), Some(SubtitleFormat::Xml));
        assert_eq!(SubtitleFormat::from_extension("srt"), Some(SubtitleFormat::Srt));
        assert_eq!(SubtitleFormat::from_extension("json3"), None);
        assert_eq!(
            SubtitleFormat::from_path(Path::new("/tmp/abc.en.vtt")),
            Some(SubtitleFormat::Vtt)
        );
    }

    #[test]
    fn test_escaped_markup_is_stripped() {
        let timedtext = r#"<transcript><text start="0" dur="2">&lt;font color=&quot;#E5E5E5&quot;&gt;hello there&lt;/font&gt;</text></transcript>"#;
        let text = parse(timedtext, SubtitleFormat::Xml);

        assert_eq!(text, "hello there");
        assert_eq!(parse(&text, SubtitleFormat::Xml), "");
        assert_eq!(parse(&text, SubtitleFormat::Vtt), text);
    }

    #[test]
    fn test_double_encoded_entities_and_escaped_tags_in_plain_text() {
        assert_eq!(clean_text("it&amp;#39;s &lt;i&gt;fine&lt;/i&gt;"), "it's fine");
    }

    #[test]
    fn test_arrow_in_prose_is_not_a_timing_line() {
        let clean = "first line\nwe go from a --> b\nlast line";
        assert_eq!(parse(clean, SubtitleFormat::Vtt), clean);
        assert_eq!(parse(clean, SubtitleFormat::Srt), clean);
    }

    #[test]
    fn test_only_the_line_above_a_timing_line_is_dropped() {
        let vtt = "WEBVTT\n\nkept before\ncue-7\n00:00:01.000 --> 00:00:02.000 align:start\nspoken";
        assert_eq!(parse(vtt, SubtitleFormat::Vtt), "kept before\nspoken");

        let srt = "12\n01:02:03,400 --> 01:02:05,000\nhours in";
        assert_eq!(parse(srt, SubtitleFormat::Srt), "hours in");
    }

    #[test]
    fn test_header_after_leading_blank_lines_is_skipped() {
        let vtt = "\n\nWEBVTT\nKind: captions\nLanguage: en\n\n00:00:00.000 --> 00:00:01.000\nhi\n";
        assert_eq!(parse(vtt, SubtitleFormat::Vtt), "hi");
    }
}
