//! Metadata/extraction provider abstraction.
//!
//! The catalog builder and the fetch pipeline only see this trait; the
//! production backend is [`YtDlpProvider`](crate::download::ytdlp::YtDlpProvider).

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::download::error::DownloadError;
use crate::download::model::VideoMetadata;

/// Source of video metadata and raw stream bytes.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch title, author, duration, thumbnail and the raw stream list.
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, DownloadError>;

    /// Download the stream with `tag` into `dest_dir` and return the written file.
    ///
    /// The file name starts with `file_stem`; the extension is chosen by the provider.
    async fn download_stream(
        &self,
        url: &str,
        tag: &str,
        dest_dir: &Path,
        file_stem: &str,
    ) -> Result<PathBuf, DownloadError>;
}
