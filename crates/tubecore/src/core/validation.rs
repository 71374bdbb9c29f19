//! URL validation and filename sanitization
//!
//! Incoming chat text is matched against the two canonical YouTube URL shapes
//! before anything reaches the catalog builder:
//! - `youtube.com/watch?v=<id>` (optional `www.`, optional scheme)
//! - `youtu.be/<id>` (optional `www.`, optional scheme)

use lazy_regex::regex;
use thiserror::Error;

/// Validation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Text is not one of the accepted YouTube URL shapes
    #[error("Invalid YouTube URL: {0}")]
    InvalidUrl(String),

    /// URL matched but no video id could be extracted
    #[error("No video id in URL: {0}")]
    MissingVideoId(String),
}

/// Checks that `url` starts with one of the accepted YouTube URL shapes.
///
/// # Examples
/// ```
/// use tubecore::core::validation::is_valid_youtube_url;
///
/// assert!(is_valid_youtube_url("https://youtube.com/watch?v=dQw4w9WgXcQ"));
/// assert!(is_valid_youtube_url("youtu.be/dQw4w9WgXcQ"));
/// assert!(!is_valid_youtube_url("https://vimeo.com/12345"));
/// ```
pub fn is_valid_youtube_url(url: &str) -> bool {
    regex!(r"^(https?://)?(www\.)?(youtube\.com/watch\?v=|youtu\.be/)[a-zA-Z0-9_-]+").is_match(url.trim())
}

/// Extracts the video id from a `watch?v=` or `youtu.be/` URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    let watch = regex!(r"(?:https?://)?(?:www\.)?youtube\.com/watch\?v=([a-zA-Z0-9_-]+)");
    let short = regex!(r"(?:https?://)?(?:www\.)?youtu\.be/([a-zA-Z0-9_-]+)");

    watch
        .captures(url)
        .or_else(|| short.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Validates the URL and returns its video id.
pub fn validate_youtube_url(url: &str) -> Result<String, ValidationError> {
    if !is_valid_youtube_url(url) {
        return Err(ValidationError::InvalidUrl(url.to_string()));
    }
    extract_video_id(url).ok_or_else(|| ValidationError::MissingVideoId(url.to_string()))
}

/// Canonical short URL for a video id.
pub fn canonical_url(video_id: &str) -> String {
    format!("https://youtu.be/{}", video_id)
}

/// Replaces filesystem-unsafe characters and trims the result to at most
/// `max_bytes` bytes of UTF-8, cutting on a char boundary.
///
/// Falls back to `"video"` when nothing printable is left.
pub fn sanitize_filename(name: &str, max_bytes: usize) -> String {
    let mut cleaned = String::with_capacity(name.len().min(max_bytes));
    for c in name.chars().map(|c| match c {
        '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
        c if c.is_control() => '_',
        c => c,
    }) {
        if cleaned.len() + c.len_utf8() > max_bytes {
            break;
        }
        cleaned.push(c);
    }

    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "video".to_string()
    } else {
        trimmed.to_string()
    }
}
