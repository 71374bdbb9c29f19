//! Data types shared by the provider, the catalog builder and the pipeline.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::core::validation::canonical_url;

/// Media kind of a stream or option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// Whether a video stream already carries audio (`prog`) or must be muxed with one (`adapt`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
pub enum Placement {
    #[serde(rename = "prog")]
    #[strum(serialize = "prog")]
    Progressive,
    #[serde(rename = "adapt")]
    #[strum(serialize = "adapt")]
    Adaptive,
}

/// One stream as reported by the metadata provider, before any filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStream {
    /// Opaque provider tag (yt-dlp `format_id`)
    pub tag: String,
    pub kind: MediaKind,
    /// Container extension without dot (`mp4`, `m4a`, `webm`)
    pub extension: String,
    /// Average audio bitrate, audio-only streams
    pub bitrate_kbps: Option<u32>,
    /// Resolution label such as `720p`, video streams
    pub resolution: Option<String>,
    /// Progressive/adaptive flag, video streams
    pub placement: Option<Placement>,
}

impl RawStream {
    pub fn audio(tag: impl Into<String>, bitrate_kbps: Option<u32>, extension: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            kind: MediaKind::Audio,
            extension: extension.into(),
            bitrate_kbps,
            resolution: None,
            placement: None,
        }
    }

    pub fn video(
        tag: impl Into<String>,
        resolution: impl Into<String>,
        extension: impl Into<String>,
        placement: Placement,
    ) -> Self {
        Self {
            tag: tag.into(),
            kind: MediaKind::Video,
            extension: extension.into(),
            bitrate_kbps: None,
            resolution: Some(resolution.into()),
            placement: Some(placement),
        }
    }

    pub fn is_audio_only(&self) -> bool {
        self.kind == MediaKind::Audio
    }
}

/// Provider answer for one video URL.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub duration_secs: u64,
    pub thumbnail_url: Option<String>,
    pub streams: Vec<RawStream>,
}

impl VideoMetadata {
    pub fn stream_by_tag(&self, tag: &str) -> Option<&RawStream> {
        self.streams.iter().find(|s| s.tag == tag)
    }

    /// Highest-bitrate audio-only stream; streams without a bitrate rank last.
    pub fn best_audio(&self) -> Option<&RawStream> {
        self.streams
            .iter()
            .filter(|s| s.is_audio_only())
            .max_by_key(|s| s.bitrate_kbps.unwrap_or(0))
    }
}

/// A selectable encoding of one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOption {
    pub tag: String,
    pub kind: MediaKind,
    /// `160kbps` for audio, `720p` for video
    pub quality: String,
    pub extension: String,
    /// Set for video options only
    pub placement: Option<Placement>,
}

/// How the pipeline has to assemble an option into one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPlan {
    /// Video-only stream plus best audio, muxed
    AdaptiveVideo,
    /// Single file already carrying audio and video
    ProgressiveVideo,
    /// Single audio stream, transcoded to MP3 if needed
    Audio,
}

impl StreamOption {
    pub fn plan(&self) -> FetchPlan {
        match (self.kind, self.placement) {
            (MediaKind::Audio, _) => FetchPlan::Audio,
            (MediaKind::Video, Some(Placement::Adaptive)) => FetchPlan::AdaptiveVideo,
            (MediaKind::Video, _) => FetchPlan::ProgressiveVideo,
        }
    }

    /// Numeric rank of the quality label (`720p` → 720, `160kbps` → 160)
    pub fn quality_rank(&self) -> u32 {
        quality_rank(&self.quality)
    }
}

/// Leading number of a quality label, 0 when there is none.
pub fn quality_rank(label: &str) -> u32 {
    let digits: String = label.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Bounded, deduplicated, ranked options plus metadata for one video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoCatalog {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub duration_secs: u64,
    pub thumbnail_url: Option<String>,
    pub audio_options: Vec<StreamOption>,
    pub video_options: Vec<StreamOption>,
}

impl VideoCatalog {
    pub fn options(&self, kind: MediaKind) -> &[StreamOption] {
        match kind {
            MediaKind::Audio => &self.audio_options,
            MediaKind::Video => &self.video_options,
        }
    }
}

/// One user's request to fetch one option; drives exactly one pipeline run.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub video_id: String,
    pub option: StreamOption,
    pub user_id: i64,
    /// Correlates log lines of this job
    pub correlation_id: Uuid,
}

impl DownloadJob {
    pub fn new(video_id: impl Into<String>, option: StreamOption, user_id: i64) -> Self {
        Self {
            video_id: video_id.into(),
            option,
            user_id,
            correlation_id: Uuid::new_v4(),
        }
    }

    pub fn url(&self) -> String {
        canonical_url(&self.video_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_placement_labels() {
        assert_eq!(Placement::Progressive.to_string(), "prog");
        assert_eq!(Placement::from_str("adapt").unwrap(), Placement::Adaptive);
        assert_eq!(MediaKind::from_str("audio").unwrap(), MediaKind::Audio);
        assert_eq!(MediaKind::Video.as_ref(), "video");
    }

    #[test]
    fn test_quality_rank() {
        assert_eq!(quality_rank("1080p"), 1080);
        assert_eq!(quality_rank("160kbps"), 160);
        assert_eq!(quality_rank("best"), 0);
    }

    #[test]
    fn test_plan() {
        let mut option = StreamOption {
            tag: "137".into(),
            kind: MediaKind::Video,
            quality: "1080p".into(),
            extension: "mp4".into(),
            placement: Some(Placement::Adaptive),
        };
        assert_eq!(option.plan(), FetchPlan::AdaptiveVideo);
        option.placement = Some(Placement::Progressive);
        assert_eq!(option.plan(), FetchPlan::ProgressiveVideo);
        option.kind = MediaKind::Audio;
        assert_eq!(option.plan(), FetchPlan::Audio);
    }

    #[test]
    fn test_best_audio_prefers_highest_bitrate() {
        let metadata = VideoMetadata {
            video_id: "abc".into(),
            title: "t".into(),
            author: "a".into(),
            duration_secs: 1,
            thumbnail_url: None,
            streams: vec![
                RawStream::audio("139", Some(48), "m4a"),
                RawStream::audio("251", Some(160), "webm"),
                RawStream::video("22", "720p", "mp4", Placement::Progressive),
            ],
        };
        assert_eq!(metadata.best_audio().map(|s| s.tag.as_str()), Some("251"));
        assert!(metadata.stream_by_tag("22").is_some());
        assert!(metadata.stream_by_tag("999").is_none());
    }
}
