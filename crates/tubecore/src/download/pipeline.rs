//! Fetch-and-assemble pipeline.
//!
//! Turns one chosen [`StreamOption`] into one finished file:
//!   workspace → re-read metadata → resolve tag → download → merge or transcode
//!
//! The workspace is removed on every failure path (it is dropped with the
//! error) and handed to the caller on success. The pipeline never touches the
//! usage store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::validation::sanitize_filename;
use crate::download::error::DownloadError;
use crate::download::ffmpeg::{AudioTranscoder, Muxer};
use crate::download::model::{FetchPlan, StreamOption, VideoMetadata};
use crate::download::provider::MetadataProvider;
use crate::download::workspace::Workspace;

/// Max UTF-8 bytes of the title used in output file names; leaves room for
/// the video id and extension under the 255-byte file name limit
const MAX_TITLE_BYTES: usize = 150;

/// Finished file plus the workspace that holds it.
///
/// Dropping this removes the file.
#[derive(Debug)]
pub struct Fulfilled {
    pub path: PathBuf,
    pub title: String,
    pub workspace: Workspace,
}

pub struct FetchPipeline {
    provider: Arc<dyn MetadataProvider>,
    muxer: Arc<dyn Muxer>,
    transcoder: Arc<dyn AudioTranscoder>,
    workspace_root: PathBuf,
}

impl FetchPipeline {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        muxer: Arc<dyn Muxer>,
        transcoder: Arc<dyn AudioTranscoder>,
        workspace_root: PathBuf,
    ) -> Self {
        Self {
            provider,
            muxer,
            transcoder,
            workspace_root,
        }
    }

    /// Fetches `option` for `url` and assembles it into a single file.
    pub async fn fulfill(&self, url: &str, option: &StreamOption) -> Result<Fulfilled, DownloadError> {
        let workspace = Workspace::create(&self.workspace_root)
            .map_err(|e| DownloadError::Unexpected(format!("cannot create workspace: {}", e)))?;

        // Provider state may have changed since the catalog was built
        let metadata = self.provider.fetch_metadata(url).await?;
        let output_stem = format!(
            "{}_{}",
            sanitize_filename(&metadata.title, MAX_TITLE_BYTES),
            metadata.video_id
        );

        let path = match option.plan() {
            FetchPlan::AdaptiveVideo => {
                self.fetch_adaptive(url, option, &metadata, &workspace, &output_stem)
                    .await?
            }
            FetchPlan::ProgressiveVideo => {
                self.fetch_single(url, &option.tag, &metadata, &workspace, &output_stem)
                    .await?
            }
            FetchPlan::Audio => {
                let original = self
                    .fetch_single(url, &option.tag, &metadata, &workspace, &output_stem)
                    .await?;
                self.ensure_mp3(original).await
            }
        };

        log::info!("Assembled {} ({} {})", path.display(), option.kind, option.quality);
        Ok(Fulfilled {
            path,
            title: metadata.title,
            workspace,
        })
    }

    async fn fetch_single(
        &self,
        url: &str,
        tag: &str,
        metadata: &VideoMetadata,
        workspace: &Workspace,
        stem: &str,
    ) -> Result<PathBuf, DownloadError> {
        let stream = metadata
            .stream_by_tag(tag)
            .ok_or_else(|| DownloadError::StreamMissing { tag: tag.to_string() })?;
        self.provider
            .download_stream(url, &stream.tag, workspace.path(), stem)
            .await
    }

    async fn fetch_adaptive(
        &self,
        url: &str,
        option: &StreamOption,
        metadata: &VideoMetadata,
        workspace: &Workspace,
        stem: &str,
    ) -> Result<PathBuf, DownloadError> {
        let video = metadata
            .stream_by_tag(&option.tag)
            .ok_or_else(|| DownloadError::StreamMissing {
                tag: option.tag.clone(),
            })?;
        let audio = metadata.best_audio().ok_or(DownloadError::AudioMissing)?;

        let video_path = self
            .provider
            .download_stream(url, &video.tag, workspace.path(), "source_video")
            .await?;
        let audio_path = self
            .provider
            .download_stream(url, &audio.tag, workspace.path(), "source_audio")
            .await?;

        let output = workspace.join(format!("{}.{}", stem, video.extension));
        log::info!(
            "Merging video {} with audio {} into {}",
            video.tag,
            audio.tag,
            output.display()
        );
        self.muxer
            .merge(&video_path, &audio_path, &output)
            .await
            .map_err(DownloadError::MergeFailed)?;

        for source in [&video_path, &audio_path] {
            fs_err::tokio::remove_file(source)
                .await
                .map_err(|e| DownloadError::Unexpected(e.to_string()))?;
        }
        Ok(output)
    }

    /// Transcodes to MP3 when needed; keeps the original if transcoding fails.
    async fn ensure_mp3(&self, original: PathBuf) -> PathBuf {
        if has_extension(&original, "mp3") {
            return original;
        }

        let target = original.with_extension("mp3");
        match self.transcoder.to_mp3(&original, &target).await {
            Ok(()) => {
                if let Err(e) = fs_err::tokio::remove_file(&original).await {
                    log::warn!("Failed to remove pre-transcode file: {}", e);
                }
                target
            }
            Err(reason) => {
                log::warn!(
                    "MP3 transcoding failed, sending {} as is: {}",
                    original.display(),
                    reason
                );
                if target.exists() {
                    if let Err(e) = fs_err::tokio::remove_file(&target).await {
                        log::warn!("Failed to remove partial MP3: {}", e);
                    }
                }
                original
            }
        }
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::model::{MediaKind, Placement, RawStream};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeProvider {
        title: String,
        streams: Vec<RawStream>,
    }

    #[async_trait]
    impl MetadataProvider for FakeProvider {
        async fn fetch_metadata(&self, _url: &str) -> Result<VideoMetadata, DownloadError> {
            Ok(VideoMetadata {
                video_id: "abc123".into(),
                title: self.title.clone(),
                author: "Someone".into(),
                duration_secs: 10,
                thumbnail_url: None,
                streams: self.streams.clone(),
            })
        }

        async fn download_stream(
            &self,
            _url: &str,
            tag: &str,
            dest_dir: &Path,
            file_stem: &str,
        ) -> Result<PathBuf, DownloadError> {
            let ext = self
                .streams
                .iter()
                .find(|s| s.tag == tag)
                .map(|s| s.extension.clone())
                .unwrap_or_default();
            let path = dest_dir.join(format!("{}.{}", file_stem, ext));
            fs_err::write(&path, tag.as_bytes()).map_err(|e| DownloadError::Unexpected(e.to_string()))?;
            Ok(path)
        }
    }

    struct FakeFfmpeg {
        fail: bool,
        called: AtomicBool,
    }

    impl FakeFfmpeg {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                called: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl Muxer for FakeFfmpeg {
        async fn merge(&self, _video: &Path, _audio: &Path, output: &Path) -> Result<(), String> {
            self.called.store(true, Ordering::SeqCst);
            if self.fail {
                return Err("exit status 1".into());
            }
            fs_err::write(output, b"merged").map_err(|e| e.to_string())
        }
    }

    #[async_trait]
    impl AudioTranscoder for FakeFfmpeg {
        async fn to_mp3(&self, _input: &Path, output: &Path) -> Result<(), String> {
            self.called.store(true, Ordering::SeqCst);
            // leave a partial file behind like a crashed encoder would
            fs_err::write(output, b"partial").map_err(|e| e.to_string())?;
            if self.fail {
                Err("libmp3lame missing".into())
            } else {
                Ok(())
            }
        }
    }

    fn streams() -> Vec<RawStream> {
        vec![
            RawStream::audio("140", Some(128), "m4a"),
            RawStream::audio("251", Some(160), "webm"),
            RawStream::video("18", "360p", "mp4", Placement::Progressive),
            RawStream::video("137", "1080p", "mp4", Placement::Adaptive),
        ]
    }

    fn option(tag: &str, kind: MediaKind, ext: &str, placement: Option<Placement>) -> StreamOption {
        StreamOption {
            tag: tag.into(),
            kind,
            quality: "x".into(),
            extension: ext.into(),
            placement,
        }
    }

    fn pipeline(streams: Vec<RawStream>, ffmpeg: Arc<FakeFfmpeg>, root: &Path) -> FetchPipeline {
        titled_pipeline("My: Clip", streams, ffmpeg, root)
    }

    fn titled_pipeline(title: &str, streams: Vec<RawStream>, ffmpeg: Arc<FakeFfmpeg>, root: &Path) -> FetchPipeline {
        FetchPipeline::new(
            Arc::new(FakeProvider {
                title: title.to_string(),
                streams,
            }),
            ffmpeg.clone(),
            ffmpeg,
            root.to_path_buf(),
        )
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs_err::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_adaptive_leaves_only_merged_file() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline(streams(), FakeFfmpeg::new(false), root.path());

        let done = pipeline
            .fulfill(
                "https://youtu.be/abc123",
                &option("137", MediaKind::Video, "mp4", Some(Placement::Adaptive)),
            )
            .await
            .unwrap();

        assert_eq!(files_in(done.workspace.path()), vec!["My_ Clip_abc123.mp4"]);
        assert_eq!(done.path, done.workspace.join("My_ Clip_abc123.mp4"));
        assert_eq!(done.title, "My: Clip");
    }

    #[tokio::test]
    async fn test_merge_failure_removes_workspace() {
        let root = tempfile::tempdir().unwrap();
        let ffmpeg = FakeFfmpeg::new(true);
        let pipeline = pipeline(streams(), ffmpeg.clone(), root.path());

        let err = pipeline
            .fulfill(
                "https://youtu.be/abc123",
                &option("137", MediaKind::Video, "mp4", Some(Placement::Adaptive)),
            )
            .await
            .unwrap_err();

        assert_eq!(err, DownloadError::MergeFailed("exit status 1".into()));
        assert!(ffmpeg.called.load(Ordering::SeqCst));
        assert!(files_in(root.path()).is_empty());
    }

    #[tokio::test]
    async fn test_adaptive_without_audio() {
        let root = tempfile::tempdir().unwrap();
        let only_video = vec![RawStream::video("137", "1080p", "mp4", Placement::Adaptive)];
        let pipeline = pipeline(only_video, FakeFfmpeg::new(false), root.path());

        let err = pipeline
            .fulfill(
                "https://youtu.be/abc123",
                &option("137", MediaKind::Video, "mp4", Some(Placement::Adaptive)),
            )
            .await
            .unwrap_err();

        assert_eq!(err, DownloadError::AudioMissing);
        assert!(files_in(root.path()).is_empty());
    }

    #[tokio::test]
    async fn test_vanished_tag_is_stream_missing() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline(streams(), FakeFfmpeg::new(false), root.path());

        let err = pipeline
            .fulfill(
                "https://youtu.be/abc123",
                &option("22", MediaKind::Video, "mp4", Some(Placement::Progressive)),
            )
            .await
            .unwrap_err();

        assert_eq!(err, DownloadError::StreamMissing { tag: "22".into() });
        assert!(files_in(root.path()).is_empty());
    }

    #[tokio::test]
    async fn test_progressive_is_downloaded_as_is() {
        let root = tempfile::tempdir().unwrap();
        let ffmpeg = FakeFfmpeg::new(false);
        let pipeline = pipeline(streams(), ffmpeg.clone(), root.path());

        let done = pipeline
            .fulfill(
                "https://youtu.be/abc123",
                &option("18", MediaKind::Video, "mp4", Some(Placement::Progressive)),
            )
            .await
            .unwrap();

        assert_eq!(files_in(done.workspace.path()), vec!["My_ Clip_abc123.mp4"]);
        assert!(!ffmpeg.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_long_multibyte_title_fits_file_name_limit() {
        let root = tempfile::tempdir().unwrap();
        let title = "日本語のタイトル".repeat(15);
        let pipeline = titled_pipeline(&title, streams(), FakeFfmpeg::new(false), root.path());

        let done = pipeline
            .fulfill(
                "https://youtu.be/abc123",
                &option("18", MediaKind::Video, "mp4", Some(Placement::Progressive)),
            )
            .await
            .unwrap();

        let name = files_in(done.workspace.path()).remove(0);
        assert!(name.len() <= 255, "{} bytes", name.len());
        assert!(name.ends_with("_abc123.mp4"));
        assert_eq!(done.title, title);
    }

    #[tokio::test]
    async fn test_audio_is_transcoded_to_mp3() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline(streams(), FakeFfmpeg::new(false), root.path());

        let done = pipeline
            .fulfill("https://youtu.be/abc123", &option("140", MediaKind::Audio, "m4a", None))
            .await
            .unwrap();

        assert_eq!(files_in(done.workspace.path()), vec!["My_ Clip_abc123.mp3"]);
        assert!(has_extension(&done.path, "mp3"));
    }

    #[tokio::test]
    async fn test_audio_transcode_failure_returns_original() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline(streams(), FakeFfmpeg::new(true), root.path());

        let done = pipeline
            .fulfill("https://youtu.be/abc123", &option("251", MediaKind::Audio, "webm", None))
            .await
            .unwrap();

        assert_eq!(done.path, done.workspace.join("My_ Clip_abc123.webm"));
        assert_eq!(files_in(done.workspace.path()), vec!["My_ Clip_abc123.webm"]);
    }

    #[tokio::test]
    async fn test_dropping_result_removes_files() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline(streams(), FakeFfmpeg::new(false), root.path());

        let done = pipeline
            .fulfill(
                "https://youtu.be/abc123",
                &option("18", MediaKind::Video, "mp4", Some(Placement::Progressive)),
            )
            .await
            .unwrap();
        drop(done);

        assert!(files_in(root.path()).is_empty());
    }
}
