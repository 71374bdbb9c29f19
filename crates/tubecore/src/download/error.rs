use strum::{AsRefStr, Display};
use thiserror::Error;

use crate::core::retry::Retryable;

/// Structured failure of the catalog builder, the fetch pipeline or delivery.
///
/// Every variant maps to a stable [`reason`](DownloadError::reason) string used in
/// logs and in the usage store, and to a [`UserHint`] the transport renders.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DownloadError {
    /// Video is private, removed, age/region restricted or blocked for bots
    #[error("video unavailable or restricted: {0}")]
    UpstreamUnavailable(String),

    /// Network/HTTP failure while talking to the platform
    #[error("HTTP error {}: {detail}", .code.map_or_else(|| "-".to_string(), |c| c.to_string()))]
    Transport { code: Option<u16>, detail: String },

    /// Provider answered but no stream survived filtering
    #[error("no downloadable streams found")]
    EmptyCatalog,

    /// Chosen tag no longer resolvable at fetch time
    #[error("stream with tag {tag} is not available")]
    StreamMissing { tag: String },

    /// Adaptive video chosen but no audio-only stream to pair it with
    #[error("no audio stream available to merge with adaptive video")]
    AudioMissing,

    /// Muxing tool exited non-zero or could not run
    #[error("merging video and audio failed: {0}")]
    MergeFailed(String),

    /// Transport could not send the finished file (size limit, timeout, API error)
    #[error("sending the file failed: {0}")]
    DeliveryFailed(String),

    /// Anything uncategorized
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Next action suggested to the user after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum UserHint {
    TryAnotherUrl,
    TryLowerQuality,
    TryAgainLater,
}

impl DownloadError {
    /// Stable machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            DownloadError::UpstreamUnavailable(_) => "unavailable",
            DownloadError::Transport { .. } => "http",
            DownloadError::EmptyCatalog => "empty",
            DownloadError::StreamMissing { .. } => "stream_missing",
            DownloadError::AudioMissing => "audio_missing",
            DownloadError::MergeFailed(_) => "merge_failed",
            DownloadError::DeliveryFailed(_) => "delivery_failed",
            DownloadError::Unexpected(_) => "unexpected",
        }
    }

    pub fn user_hint(&self) -> UserHint {
        match self {
            DownloadError::UpstreamUnavailable(_) | DownloadError::EmptyCatalog => UserHint::TryAnotherUrl,
            DownloadError::StreamMissing { .. } | DownloadError::AudioMissing | DownloadError::MergeFailed(_) => {
                UserHint::TryLowerQuality
            }
            DownloadError::DeliveryFailed(detail) if is_too_large(detail) => UserHint::TryLowerQuality,
            DownloadError::Transport { .. } | DownloadError::DeliveryFailed(_) | DownloadError::Unexpected(_) => {
                UserHint::TryAgainLater
            }
        }
    }

    /// True when delivery failed because the platform rejected the file size
    pub fn is_too_large(&self) -> bool {
        matches!(self, DownloadError::DeliveryFailed(detail) if is_too_large(detail))
    }
}

fn is_too_large(detail: &str) -> bool {
    let lower = detail.to_lowercase();
    lower.contains("request entity too large") || lower.contains("file is too big")
}

/// Only transient provider failures are worth another catalog attempt.
///
/// `EmptyCatalog` is permanent for a given video, and pipeline failures are
/// per-selection, so neither is retried.
impl Retryable for DownloadError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            DownloadError::UpstreamUnavailable(_) | DownloadError::Transport { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_display() {
        let err = DownloadError::Transport {
            code: Some(403),
            detail: "Forbidden".into(),
        };
        assert_eq!(err.to_string(), "HTTP error 403: Forbidden");

        let err = DownloadError::Transport {
            code: None,
            detail: "connection reset".into(),
        };
        assert_eq!(err.to_string(), "HTTP error -: connection reset");
    }

    #[test]
    fn test_download_error_reason() {
        assert_eq!(DownloadError::UpstreamUnavailable("".into()).reason(), "unavailable");
        assert_eq!(DownloadError::EmptyCatalog.reason(), "empty");
        assert_eq!(DownloadError::StreamMissing { tag: "18".into() }.reason(), "stream_missing");
        assert_eq!(DownloadError::AudioMissing.reason(), "audio_missing");
        assert_eq!(DownloadError::MergeFailed("".into()).reason(), "merge_failed");
        assert_eq!(DownloadError::Unexpected("".into()).reason(), "unexpected");
    }

    #[test]
    fn test_retry_classification() {
        assert!(DownloadError::UpstreamUnavailable("x".into()).is_retryable());
        assert!(DownloadError::Transport { code: Some(500), detail: "x".into() }.is_retryable());
        assert!(!DownloadError::EmptyCatalog.is_retryable());
        assert!(!DownloadError::Unexpected("x".into()).is_retryable());
        assert!(!DownloadError::MergeFailed("x".into()).is_retryable());
    }

    #[test]
    fn test_user_hints() {
        assert_eq!(DownloadError::EmptyCatalog.user_hint(), UserHint::TryAnotherUrl);
        assert_eq!(DownloadError::AudioMissing.user_hint(), UserHint::TryLowerQuality);
        let too_large = DownloadError::DeliveryFailed("Request Entity Too Large".into());
        assert!(too_large.is_too_large());
        assert_eq!(too_large.user_hint(), UserHint::TryLowerQuality);
        assert_eq!(
            DownloadError::DeliveryFailed("timeout".into()).user_hint(),
            UserHint::TryAgainLater
        );
    }
}
