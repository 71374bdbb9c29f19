//! ffmpeg-backed muxing and audio transcoding
//!
//! Both steps sit behind traits so the pipeline can be exercised without the
//! binary installed.

use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

use crate::core::config::ToolSettings;
use crate::core::process::{output_tail, run_with_timeout};

/// Common arguments for every ffmpeg call
const FFMPEG_DEFAULT_ARGS: [&str; 4] = ["-hide_banner", "-loglevel", "error", "-nostdin"];

/// Joins a video-only and an audio-only file into one container.
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Copy the video stream, encode audio to AAC, write `output`.
    ///
    /// Returns a human-readable reason on failure.
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), String>;
}

/// Re-encodes an audio file to MP3.
#[async_trait]
pub trait AudioTranscoder: Send + Sync {
    async fn to_mp3(&self, input: &Path, output: &Path) -> Result<(), String>;
}

/// Interface for the [ffmpeg](https://ffmpeg.org) program
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    bin: String,
    timeout: Duration,
}

impl Ffmpeg {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    pub fn from_settings(tools: &ToolSettings) -> Self {
        Self::new(tools.ffmpeg_bin.clone(), tools.ffmpeg_timeout())
    }

    async fn run(&self, cmd: &mut Command) -> Result<(), String> {
        let output = run_with_timeout(cmd, self.timeout).await.map_err(|e| e.to_string())?;
        if output.status.success() {
            Ok(())
        } else {
            Err(format!("ffmpeg exited with {}: {}", output.status, output_tail(&output.stderr, 300)))
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.args(FFMPEG_DEFAULT_ARGS).arg("-y");
        cmd
    }
}

#[async_trait]
impl Muxer for Ffmpeg {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), String> {
        let mut cmd = self.command();
        cmd.args([OsStr::new("-i"), video.as_os_str()])
            .args([OsStr::new("-i"), audio.as_os_str()])
            .args(["-map", "0:v:0", "-map", "1:a:0"])
            .args(["-c:v", "copy", "-c:a", "aac"])
            .arg(output);
        self.run(&mut cmd).await
    }
}

#[async_trait]
impl AudioTranscoder for Ffmpeg {
    async fn to_mp3(&self, input: &Path, output: &Path) -> Result<(), String> {
        let mut cmd = self.command();
        cmd.args([OsStr::new("-i"), input.as_os_str()])
            .args(["-vn", "-c:a", "libmp3lame", "-q:a", "2"])
            .arg(output);
        self.run(&mut cmd).await
    }
}
