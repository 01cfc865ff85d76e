use crate::extractors::VideoId;

/// Maximum length of a title fragment inside generated file names
const MAX_TITLE_CHARS: usize = 80;

/// Sanitize filename for safe filesystem usage
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            match c {
                // Keep alphanumeric characters, spaces, hyphens, underscores, and dots
                c if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' || c == '.' => c,
                // Replace everything else with underscore
                _ => '_',
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// File name for a rendered transcript: `<id>-<title>.<ext>`, or `<id>.<ext>`
pub fn output_file_name(video_id: &VideoId, title: Option<&str>, extension: &str) -> String {
    let title = title
        .map(sanitize_filename)
        .map(|t| t.chars().take(MAX_TITLE_CHARS).collect::<String>())
        .map(|t| t.trim().trim_matches('.').replace(' ', "_"))
        .filter(|t| !t.is_empty());

    match title {
        Some(title) => format!("{}-{}.{}", video_id, title, extension),
        None => format!("{}.{}", video_id, extension),
    }
}

/// Shorten tool output and response bodies for error messages
pub fn truncate(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let shortened: String = text.chars().take(max_chars).collect();
    format!("{}…", shortened)
}
