use url::Url;

pub mod payload;
pub mod video_id;

pub use payload::{extract, TranscriptRecord};
pub use video_id::VideoId;

use crate::Result;

/// Validate and normalize URLs
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://api.example.com/transcripts").is_ok());
        assert!(validate_url("http://localhost:8080").is_ok());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("not a url").is_err());
    }
}
