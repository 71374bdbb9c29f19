//! yt-dlp backed [`MetadataProvider`].
//!
//! Metadata comes from a single `--dump-single-json` call; streams are fetched
//! with `-f <format_id>` into the job workspace.

use async_trait::async_trait;
use lazy_regex::regex_captures;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use crate::core::config::ToolSettings;
use crate::core::process::{run_with_timeout, ProcessError};
use crate::download::error::DownloadError;
use crate::download::model::{Placement, RawStream, VideoMetadata};
use crate::download::provider::MetadataProvider;
use crate::download::ytdlp_errors::to_download_error;

/// Runs the yt-dlp binary.
#[derive(Debug, Clone)]
pub struct YtDlpProvider {
    bin: String,
    timeout: Duration,
}

impl YtDlpProvider {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    pub fn from_settings(tools: &ToolSettings) -> Self {
        Self::new(tools.ytdlp_bin.clone(), tools.provider_timeout())
    }
}

fn process_error(err: ProcessError) -> DownloadError {
    match err {
        ProcessError::Timeout { .. } => DownloadError::Transport {
            code: None,
            detail: err.to_string(),
        },
        ProcessError::Spawn { .. } => DownloadError::Unexpected(err.to_string()),
    }
}

#[async_trait]
impl MetadataProvider for YtDlpProvider {
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, DownloadError> {
        log::info!("Fetching metadata for {}", url);

        let mut cmd = Command::new(&self.bin);
        cmd.args(["--dump-single-json", "--no-playlist", "--no-warnings", url]);
        let output = run_with_timeout(&mut cmd, self.timeout).await.map_err(process_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn!("yt-dlp metadata failed for {}: {}", url, stderr.trim());
            return Err(to_download_error(&stderr, None));
        }

        let json: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| DownloadError::Unexpected(format!("invalid yt-dlp JSON: {}", e)))?;
        parse_metadata(&json)
    }

    async fn download_stream(
        &self,
        url: &str,
        tag: &str,
        dest_dir: &Path,
        file_stem: &str,
    ) -> Result<PathBuf, DownloadError> {
        let template = dest_dir.join(format!("{}.%(ext)s", file_stem));
        log::info!("Downloading stream {} of {} into {}", tag, url, dest_dir.display());

        let mut cmd = Command::new(&self.bin);
        cmd.arg("-f")
            .arg(tag)
            .args(["--no-playlist", "--no-part", "--no-warnings", "-o"])
            .arg(&template)
            .arg(url);
        let output = run_with_timeout(&mut cmd, self.timeout).await.map_err(process_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn!("yt-dlp download of {} failed: {}", tag, stderr.trim());
            return Err(to_download_error(&stderr, Some(tag)));
        }

        find_downloaded_file(dest_dir, file_stem).await
    }
}

/// yt-dlp picks the extension, so look for `<stem>.*` in the directory.
async fn find_downloaded_file(dir: &Path, file_stem: &str) -> Result<PathBuf, DownloadError> {
    let prefix = format!("{}.", file_stem);
    let mut entries = fs_err::tokio::read_dir(dir)
        .await
        .map_err(|e| DownloadError::Unexpected(e.to_string()))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| DownloadError::Unexpected(e.to_string()))?
    {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&prefix) && !name.ends_with(".part") {
            return Ok(entry.path());
        }
    }

    log::error!("No file matching {}* in {}", prefix, dir.display());
    Err(DownloadError::Unexpected(format!(
        "downloaded file {}* not found in {}",
        prefix,
        dir.display()
    )))
}

fn str_field<'a>(json: &'a Value, key: &str) -> Option<&'a str> {
    json.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Builds [`VideoMetadata`] from yt-dlp's JSON document.
pub fn parse_metadata(json: &Value) -> Result<VideoMetadata, DownloadError> {
    let video_id = str_field(json, "id")
        .ok_or_else(|| DownloadError::Unexpected("yt-dlp JSON has no video id".into()))?
        .to_string();

    let title = str_field(json, "title").unwrap_or("Unknown title").to_string();
    let author = str_field(json, "uploader")
        .or_else(|| str_field(json, "channel"))
        .unwrap_or("Unknown")
        .to_string();
    let duration_secs = json
        .get("duration")
        .and_then(Value::as_f64)
        .map(|d| d.max(0.0).round() as u64)
        .unwrap_or(0);
    let thumbnail_url = str_field(json, "thumbnail").map(String::from);

    let streams = json
        .get("formats")
        .and_then(Value::as_array)
        .map(|formats| formats.iter().filter_map(parse_stream).collect())
        .unwrap_or_default();

    Ok(VideoMetadata {
        video_id,
        title,
        author,
        duration_secs,
        thumbnail_url,
        streams,
    })
}

fn has_codec(format: &Value, key: &str) -> bool {
    format.get(key).and_then(Value::as_str).unwrap_or("") != "none"
}

/// One entry of `formats`; storyboards and entries without an id are skipped.
fn parse_stream(format: &Value) -> Option<RawStream> {
    let tag = str_field(format, "format_id")?;
    let extension = str_field(format, "ext").unwrap_or("");
    let has_video = has_codec(format, "vcodec");
    let has_audio = has_codec(format, "acodec");

    match (has_video, has_audio) {
        (false, true) => {
            let bitrate = format
                .get("abr")
                .and_then(Value::as_f64)
                .filter(|abr| *abr > 0.0)
                .map(|abr| abr.round() as u32);
            Some(RawStream::audio(tag, bitrate, extension))
        }
        (true, _) => {
            let resolution = resolution_label(format)?;
            let placement = if has_audio {
                Placement::Progressive
            } else {
                Placement::Adaptive
            };
            Some(RawStream::video(tag, resolution, extension, placement))
        }
        (false, false) => None,
    }
}

/// `720p` style label from the short side of the frame, falling back to `format_note`.
fn resolution_label(format: &Value) -> Option<String> {
    let width = format.get("width").and_then(Value::as_u64);
    let height = format.get("height").and_then(Value::as_u64);

    let short_side = match (width, height) {
        (Some(w), Some(h)) => Some(w.min(h)),
        (None, Some(h)) => Some(h),
        (Some(w), None) => Some(w),
        (None, None) => str_field(format, "format_note")
            .and_then(|note| regex_captures!(r"(\d{3,4})p", note))
            .and_then(|(_, digits)| digits.parse::<u64>().ok()),
    };

    short_side.filter(|side| *side > 0).map(|side| format!("{}p", side))
}
