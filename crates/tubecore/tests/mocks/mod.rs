//! Test doubles for the provider, ffmpeg and the chat transport.
//!
//! Nothing here touches the network or spawns processes.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tubecore::download::{AudioTranscoder, Muxer, Placement, RawStream, VideoMetadata};
use tubecore::flow::Transport;
use tubecore::{DownloadError, StreamOption, VideoCatalog};

/// Stream list of the reference scenario
pub fn scenario_streams() -> Vec<RawStream> {
    vec![
        RawStream::audio("140", Some(160), "m4a"),
        RawStream::audio("139", Some(128), "m4a"),
        RawStream::video("22", "720p", "mp4", Placement::Progressive),
        RawStream::video("136", "720p", "mp4", Placement::Adaptive),
        RawStream::video("137", "1080p", "mp4", Placement::Adaptive),
    ]
}

pub fn metadata(streams: Vec<RawStream>) -> VideoMetadata {
    VideoMetadata {
        video_id: "abc123".into(),
        title: "Test Video".into(),
        author: "Test Channel".into(),
        duration_secs: 212,
        thumbnail_url: None,
        streams,
    }
}

/// Provider that answers metadata calls from a script, then repeats the fallback.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<VideoMetadata, DownloadError>>>,
    fallback: Result<VideoMetadata, DownloadError>,
    pub metadata_calls: AtomicU32,
    pub urls: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn always(result: Result<VideoMetadata, DownloadError>) -> Self {
        Self::scripted(Vec::new(), result)
    }

    pub fn scripted(
        script: Vec<Result<VideoMetadata, DownloadError>>,
        fallback: Result<VideoMetadata, DownloadError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            metadata_calls: AtomicU32::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> u32 {
        self.metadata_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl tubecore::download::MetadataProvider for ScriptedProvider {
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, DownloadError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    async fn download_stream(
        &self,
        _url: &str,
        tag: &str,
        dest_dir: &Path,
        file_stem: &str,
    ) -> Result<PathBuf, DownloadError> {
        let ext = match &self.fallback {
            Ok(meta) => meta.stream_by_tag(tag).map(|s| s.extension.clone()),
            Err(_) => None,
        }
        .unwrap_or_else(|| "bin".to_string());
        let path = dest_dir.join(format!("{}.{}", file_stem, ext));
        std::fs::write(&path, tag).map_err(|e| DownloadError::Unexpected(e.to_string()))?;
        Ok(path)
    }
}

/// Muxer/transcoder that writes placeholder output files.
pub struct FakeFfmpeg {
    pub fail: bool,
}

#[async_trait]
impl Muxer for FakeFfmpeg {
    async fn merge(&self, _video: &Path, _audio: &Path, output: &Path) -> Result<(), String> {
        if self.fail {
            return Err("ffmpeg exited with exit status: 1".into());
        }
        std::fs::write(output, b"merged").map_err(|e| e.to_string())
    }
}

#[async_trait]
impl AudioTranscoder for FakeFfmpeg {
    async fn to_mp3(&self, _input: &Path, output: &Path) -> Result<(), String> {
        if self.fail {
            return Err("libmp3lame not available".into());
        }
        std::fs::write(output, b"mp3").map_err(|e| e.to_string())
    }
}

/// How [`RecordingTransport`] answers `deliver_file`
#[derive(Debug, Clone)]
pub enum Delivery {
    Succeed,
    Fail(String),
    Hang(Duration),
}

/// Transport that records what the flow asked it to do.
pub struct RecordingTransport {
    delivery: Delivery,
    pub rendered: Mutex<Vec<String>>,
    pub failures: Mutex<Vec<DownloadError>>,
    /// (file name, existed at delivery time, option tag)
    pub delivered: Mutex<Vec<(String, bool, String)>>,
}

impl RecordingTransport {
    pub fn new(delivery: Delivery) -> Self {
        Self {
            delivery,
            rendered: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            delivered: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn render(&self, catalog: &VideoCatalog) -> Result<(), DownloadError> {
        self.rendered.lock().unwrap().push(catalog.video_id.clone());
        Ok(())
    }

    async fn render_failure(&self, error: &DownloadError) -> Result<(), DownloadError> {
        self.failures.lock().unwrap().push(error.clone());
        Ok(())
    }

    async fn deliver_file(&self, path: &Path, _title: &str, option: &StreamOption) -> Result<(), DownloadError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.delivered
            .lock()
            .unwrap()
            .push((name, path.exists(), option.tag.clone()));

        match &self.delivery {
            Delivery::Succeed => Ok(()),
            Delivery::Fail(detail) => Err(DownloadError::DeliveryFailed(detail.clone())),
            Delivery::Hang(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(())
            }
        }
    }
}
