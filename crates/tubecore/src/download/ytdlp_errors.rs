//! yt-dlp stderr analysis
//!
//! Maps the free-form error output of yt-dlp onto [`DownloadError`] variants.

use lazy_regex::regex_captures;

use crate::core::process::output_tail;
use crate::download::error::DownloadError;

/// Coarse class of a yt-dlp failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YtDlpErrorType {
    /// Private, removed, region/age restricted, or blocked behind a bot check
    VideoUnavailable,
    /// Explicit HTTP status in the output
    HttpError(u16),
    /// Timeouts, DNS, refused connections
    NetworkError,
    /// Requested `-f` tag does not exist
    FormatUnavailable,
    Unknown,
}

/// Analyzes yt-dlp stderr and determines the error type.
pub fn analyze_ytdlp_error(stderr: &str) -> YtDlpErrorType {
    let stderr_lower = stderr.to_lowercase();

    if stderr_lower.contains("private video")
        || stderr_lower.contains("video unavailable")
        || stderr_lower.contains("this video is not available")
        || stderr_lower.contains("video is private")
        || stderr_lower.contains("video has been removed")
        || stderr_lower.contains("this video does not exist")
        || stderr_lower.contains("available in your country")
        || stderr_lower.contains("blocked it in your country")
        || stderr_lower.contains("geo restrict")
        || stderr_lower.contains("sign in to confirm your age")
        || stderr_lower.contains("sign in to confirm you're not a bot")
    {
        return YtDlpErrorType::VideoUnavailable;
    }

    if stderr_lower.contains("requested format is not available") {
        return YtDlpErrorType::FormatUnavailable;
    }

    if let Some((_, code)) = regex_captures!(r"http error (\d{3})", &stderr_lower) {
        if let Ok(code) = code.parse::<u16>() {
            return YtDlpErrorType::HttpError(code);
        }
    }

    if stderr_lower.contains("timed out")
        || stderr_lower.contains("timeout")
        || stderr_lower.contains("connection")
        || stderr_lower.contains("network")
        || stderr_lower.contains("name resolution")
        || stderr_lower.contains("failed to connect")
    {
        return YtDlpErrorType::NetworkError;
    }

    YtDlpErrorType::Unknown
}

/// Most useful line of the output: the last `ERROR:` line, else the tail.
pub fn error_detail(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|line| line.trim_start().starts_with("ERROR:"))
        .map(|line| line.trim().trim_start_matches("ERROR:").trim().to_string())
        .unwrap_or_else(|| output_tail(stderr.as_bytes(), 300))
}

/// Converts failed yt-dlp output into a [`DownloadError`].
///
/// `tag` is the stream being downloaded, if any.
pub fn to_download_error(stderr: &str, tag: Option<&str>) -> DownloadError {
    let detail = error_detail(stderr);
    match analyze_ytdlp_error(stderr) {
        YtDlpErrorType::VideoUnavailable => DownloadError::UpstreamUnavailable(detail),
        YtDlpErrorType::HttpError(code) => DownloadError::Transport {
            code: Some(code),
            detail,
        },
        YtDlpErrorType::NetworkError => DownloadError::Transport { code: None, detail },
        YtDlpErrorType::FormatUnavailable => match tag {
            Some(tag) => DownloadError::StreamMissing { tag: tag.to_string() },
            None => DownloadError::Unexpected(detail),
        },
        YtDlpErrorType::Unknown => DownloadError::Unexpected(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_variants() {
        for stderr in [
            "ERROR: [youtube] abc123: Video unavailable",
            "ERROR: [youtube] abc123: Private video. Sign in if you've been granted access",
            "ERROR: [youtube] abc123: Sign in to confirm you're not a bot",
            "ERROR: The uploader has not made this video available in your country",
            "ERROR: [youtube] abc123: Video unavailable. The uploader has blocked it in your country",
            "ERROR: [youtube] abc123: This video is geo restricted",
        ] {
            assert_eq!(analyze_ytdlp_error(stderr), YtDlpErrorType::VideoUnavailable, "{}", stderr);
        }
    }

    #[test]
    fn test_region_block_is_upstream_unavailable() {
        let err = to_download_error("ERROR: The uploader has not made this video available in your country", None);
        assert!(matches!(err, DownloadError::UpstreamUnavailable(_)));
    }

    #[test]
    fn test_http_code_extracted() {
        let stderr = "WARNING: retrying\nERROR: unable to download video data: HTTP Error 403: Forbidden";
        assert_eq!(analyze_ytdlp_error(stderr), YtDlpErrorType::HttpError(403));
        assert_eq!(
            to_download_error(stderr, None),
            DownloadError::Transport {
                code: Some(403),
                detail: "unable to download video data: HTTP Error 403: Forbidden".into()
            }
        );
    }

    #[test]
    fn test_network_error() {
        let err = to_download_error("ERROR: Read timed out.", None);
        assert!(matches!(err, DownloadError::Transport { code: None, .. }));
    }

    #[test]
    fn test_missing_format_maps_to_stream_missing() {
        let stderr = "ERROR: [youtube] abc123: Requested format is not available";
        assert_eq!(
            to_download_error(stderr, Some("137")),
            DownloadError::StreamMissing { tag: "137".into() }
        );
        assert!(matches!(to_download_error(stderr, None), DownloadError::Unexpected(_)));
    }

    #[test]
    fn test_unknown_uses_tail() {
        let err = to_download_error("something odd happened", None);
        assert_eq!(err, DownloadError::Unexpected("something odd happened".into()));
    }
}
