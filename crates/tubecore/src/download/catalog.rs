//! Stream catalog builder
//!
//! Turns the provider's raw stream list into a bounded, deduplicated, ranked
//! option set. One provider call per build; retries live in
//! [`fetch_catalog_with_retry`].

use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::core::retry::{retry, RetryConfig, RetryResult};
use crate::download::error::DownloadError;
use crate::download::model::{quality_rank, MediaKind, Placement, RawStream, StreamOption, VideoCatalog, VideoMetadata};
use crate::download::provider::MetadataProvider;

/// Filtering and capping rules for catalogs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogPolicy {
    /// Resolution labels a video option may carry
    pub allowed_resolutions: Vec<String>,
    /// Container extension a video option must use
    pub video_container: String,
    pub max_audio_options: usize,
    pub max_video_options: usize,
}

impl Default for CatalogPolicy {
    fn default() -> Self {
        Self {
            allowed_resolutions: ["144p", "240p", "360p", "480p", "720p", "1080p"]
                .into_iter()
                .map(String::from)
                .collect(),
            video_container: "mp4".to_string(),
            max_audio_options: 3,
            max_video_options: 10,
        }
    }
}

impl CatalogPolicy {
    fn accepts_video(&self, stream: &RawStream) -> bool {
        stream.extension.eq_ignore_ascii_case(&self.video_container)
            && stream
                .resolution
                .as_ref()
                .is_some_and(|label| self.allowed_resolutions.iter().any(|allowed| allowed == label))
    }
}

/// Builds catalogs from one metadata provider.
#[derive(Clone)]
pub struct CatalogBuilder {
    provider: Arc<dyn MetadataProvider>,
    policy: CatalogPolicy,
}

impl CatalogBuilder {
    pub fn new(provider: Arc<dyn MetadataProvider>, policy: CatalogPolicy) -> Self {
        Self { provider, policy }
    }

    /// Fetches metadata once and ranks its streams.
    pub async fn build_catalog(&self, url: &str) -> Result<VideoCatalog, DownloadError> {
        let metadata = self.provider.fetch_metadata(url).await?;
        let catalog = build_from_metadata(metadata, &self.policy)?;
        log::info!(
            "Catalog for {}: {} audio / {} video options",
            catalog.video_id,
            catalog.audio_options.len(),
            catalog.video_options.len()
        );
        Ok(catalog)
    }
}

/// Pure part of the builder: filter, rank, dedupe and cap.
pub fn build_from_metadata(metadata: VideoMetadata, policy: &CatalogPolicy) -> Result<VideoCatalog, DownloadError> {
    let audio_options = audio_options(&metadata.streams, policy.max_audio_options);
    let video_options = video_options(&metadata.streams, policy);

    if audio_options.is_empty() && video_options.is_empty() {
        return Err(DownloadError::EmptyCatalog);
    }

    Ok(VideoCatalog {
        video_id: metadata.video_id,
        title: metadata.title,
        author: metadata.author,
        duration_secs: metadata.duration_secs,
        thumbnail_url: metadata.thumbnail_url,
        audio_options,
        video_options,
    })
}

fn audio_options(streams: &[RawStream], cap: usize) -> Vec<StreamOption> {
    let mut audio: Vec<(&RawStream, u32)> = streams
        .iter()
        .filter(|s| s.is_audio_only())
        .filter_map(|s| s.bitrate_kbps.map(|kbps| (s, kbps)))
        .collect();
    audio.sort_by(|a, b| b.1.cmp(&a.1));

    audio
        .into_iter()
        .take(cap)
        .map(|(s, kbps)| StreamOption {
            tag: s.tag.clone(),
            kind: MediaKind::Audio,
            quality: format!("{}kbps", kbps),
            extension: s.extension.clone(),
            placement: None,
        })
        .collect()
}

fn video_options(streams: &[RawStream], policy: &CatalogPolicy) -> Vec<StreamOption> {
    let ranked = |placement: Placement| {
        let mut group: Vec<StreamOption> = streams
            .iter()
            .filter(|s| s.kind == MediaKind::Video && s.placement == Some(placement))
            .filter(|s| policy.accepts_video(s))
            .filter_map(|s| {
                s.resolution.as_ref().map(|label| StreamOption {
                    tag: s.tag.clone(),
                    kind: MediaKind::Video,
                    quality: label.clone(),
                    extension: s.extension.clone(),
                    placement: Some(placement),
                })
            })
            .collect();
        group.sort_by_key(|o| std::cmp::Reverse(o.quality_rank()));
        group
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut options = Vec::new();

    for option in ranked(Placement::Progressive)
        .into_iter()
        .chain(ranked(Placement::Adaptive))
    {
        if seen.insert(option.quality.clone()) {
            options.push(option);
        }
    }

    options.truncate(policy.max_video_options);
    options
}

/// Calls [`CatalogBuilder::build_catalog`] until it succeeds, fails with a
/// non-transient error, or attempts run out.
pub async fn fetch_catalog_with_retry(
    builder: &CatalogBuilder,
    url: &str,
    config: &RetryConfig,
) -> RetryResult<VideoCatalog, DownloadError> {
    let result = retry(config, || builder.build_catalog(url)).await;
    if let Err(e) = &result.result {
        log::error!(
            "Catalog fetch for {} failed after {} attempt(s) in {:?}: {}",
            url,
            result.attempts,
            result.total_duration,
            e
        );
    }
    result
}

/// Highest-ranked option of a list, used by the CLI `info` summary.
pub fn best_option(options: &[StreamOption]) -> Option<&StreamOption> {
    options.iter().max_by_key(|o| quality_rank(&o.quality))
}
