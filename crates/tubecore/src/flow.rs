//! Download flow: what a chat transport calls.
//!
//! Validates URLs, writes usage rows, drives the retry wrapper and the
//! pipeline, and hands finished files to a [`Transport`]. Usage-store writes
//! are best effort: a failing database is logged and never blocks a user.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::Instrument;

use crate::core::config::Config;
use crate::core::error::AppResult;
use crate::core::retry::RetryConfig;
use crate::core::validation::{canonical_url, validate_youtube_url, ValidationError};
use crate::download::catalog::{fetch_catalog_with_retry, CatalogBuilder};
use crate::download::error::{DownloadError, UserHint};
use crate::download::ffmpeg::Ffmpeg;
use crate::download::model::{DownloadJob, StreamOption, VideoCatalog};
use crate::download::pipeline::{FetchPipeline, Fulfilled};
use crate::download::provider::MetadataProvider;
use crate::download::ytdlp::YtDlpProvider;
use crate::storage::db::{Action, LogStatus, UsageStats, UsageStore};

/// Chat-side capabilities the flow needs.
///
/// Size limits, markup escaping and keyboards are the implementor's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Show the options of a freshly built catalog.
    async fn render(&self, catalog: &VideoCatalog) -> Result<(), DownloadError>;

    /// Tell the user what went wrong and what to try next.
    async fn render_failure(&self, error: &DownloadError) -> Result<(), DownloadError>;

    /// Send the finished file. Failures should be [`DownloadError::DeliveryFailed`].
    async fn deliver_file(&self, path: &Path, title: &str, option: &StreamOption) -> Result<(), DownloadError>;
}

/// Failure of [`DownloadFlow::inspect`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlowFailure {
    #[error(transparent)]
    InvalidUrl(#[from] ValidationError),

    #[error(transparent)]
    Download(#[from] DownloadError),
}

impl FlowFailure {
    pub fn user_hint(&self) -> UserHint {
        match self {
            FlowFailure::InvalidUrl(_) => UserHint::TryAnotherUrl,
            FlowFailure::Download(e) => e.user_hint(),
        }
    }
}

/// Chat user as seen by the flow
#[derive(Debug, Clone, Default)]
pub struct ChatUser {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub struct DownloadFlow {
    builder: CatalogBuilder,
    pipeline: FetchPipeline,
    store: UsageStore,
    retry: RetryConfig,
    delivery_timeout: Duration,
}

impl DownloadFlow {
    pub fn new(
        builder: CatalogBuilder,
        pipeline: FetchPipeline,
        store: UsageStore,
        retry: RetryConfig,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            builder,
            pipeline,
            store,
            retry,
            delivery_timeout,
        }
    }

    /// Wires yt-dlp, ffmpeg and the usage store from configuration.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let store = UsageStore::open(&config.database_path, config.timezone()?)?;
        let provider: Arc<dyn MetadataProvider> = Arc::new(YtDlpProvider::from_settings(&config.tools));
        let ffmpeg = Arc::new(Ffmpeg::from_settings(&config.tools));

        Ok(Self::new(
            CatalogBuilder::new(provider.clone(), config.catalog.clone()),
            FetchPipeline::new(provider, ffmpeg.clone(), ffmpeg, config.workspace_root()),
            store,
            config.retry.to_retry_config(),
            config.delivery_timeout(),
        ))
    }

    pub fn store(&self) -> &UsageStore {
        &self.store
    }

    pub fn register_user(&self, user: &ChatUser) {
        if let Err(e) = self.store.record_user(
            user.id,
            user.username.as_deref(),
            user.first_name.as_deref(),
            user.last_name.as_deref(),
        ) {
            log::error!("Failed to record user {}: {}", user.id, e);
        }
    }

    /// Records a plain command such as `/start` in the usage log.
    pub fn log_command(&self, user_id: i64, action: Action) {
        self.start_log(user_id, action, None, None, None);
    }

    fn start_log(
        &self,
        user_id: i64,
        action: Action,
        url: Option<&str>,
        format: Option<&str>,
        quality: Option<&str>,
    ) -> Option<i64> {
        match self.store.start_log(user_id, action, url, format, quality) {
            Ok(id) => Some(id),
            Err(e) => {
                log::error!("Failed to write {} usage row for {}: {}", action, user_id, e);
                None
            }
        }
    }

    fn finish_log(&self, log_id: Option<i64>, status: LogStatus, message: Option<&str>) {
        let Some(log_id) = log_id else { return };
        if let Err(e) = self.store.finish_log(log_id, status, message) {
            log::error!("Failed to finish usage row {} as {}: {}", log_id, status, e);
        }
    }

    /// Validates `url` and builds its catalog through the retry wrapper.
    pub async fn inspect(&self, user_id: i64, url: &str) -> Result<VideoCatalog, FlowFailure> {
        let url = url.trim();
        let log_id = self.start_log(user_id, Action::UrlCheck, Some(url), None, None);

        let video_id = match validate_youtube_url(url) {
            Ok(video_id) => video_id,
            Err(e) => {
                log::info!("Rejected URL from {}: {}", user_id, url);
                self.finish_log(log_id, LogStatus::InvalidUrl, Some(&e.to_string()));
                return Err(e.into());
            }
        };

        // Only the id reaches the provider, never trailing user text
        let canonical = canonical_url(&video_id);
        match fetch_catalog_with_retry(&self.builder, &canonical, &self.retry)
            .await
            .into_result()
        {
            Ok(catalog) => {
                self.finish_log(log_id, LogStatus::InfoRetrieved, None);
                Ok(catalog)
            }
            Err(e) => {
                self.finish_log(log_id, LogStatus::Failed, Some(&e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Rebuilds the catalog for a video id; nothing is cached between steps.
    pub async fn options(&self, video_id: &str) -> Result<VideoCatalog, DownloadError> {
        let url = canonical_url(video_id);
        fetch_catalog_with_retry(&self.builder, &url, &self.retry)
            .await
            .into_result()
    }

    /// Runs one job end to end and delivers the file through `transport`.
    ///
    /// The workspace is gone when this returns, whatever the outcome.
    pub async fn download(&self, transport: &dyn Transport, job: &DownloadJob) -> Result<(), DownloadError> {
        let url = job.url();
        let log_id = self.start_log(
            job.user_id,
            Action::Download,
            Some(&url),
            Some(job.option.kind.as_ref()),
            Some(&job.option.quality),
        );

        let span = tracing::info_span!(
            "download",
            job = %job.correlation_id,
            video = %job.video_id,
            log_id = log_id.unwrap_or(-1)
        );

        let result = self.run_job(transport, job, &url, log_id).instrument(span).await;

        if let Err(e) = &result {
            if let Err(render_err) = transport.render_failure(e).await {
                log::warn!("Could not report failure to the user: {}", render_err);
            }
        }
        result
    }

    async fn run_job(
        &self,
        transport: &dyn Transport,
        job: &DownloadJob,
        url: &str,
        log_id: Option<i64>,
    ) -> Result<(), DownloadError> {
        log::info!("Starting {} {} for user {}", job.option.kind, job.option.quality, job.user_id);

        let fulfilled = match self.pipeline.fulfill(url, &job.option).await {
            Ok(fulfilled) => fulfilled,
            Err(e) => {
                log::error!("Pipeline failed ({}): {}", e.reason(), e);
                self.finish_log(log_id, LogStatus::Failed, Some(&e.to_string()));
                return Err(e);
            }
        };

        let delivery = self.deliver(transport, &fulfilled, &job.option).await;

        let Fulfilled { path, workspace, .. } = fulfilled;
        if let Err(e) = workspace.close() {
            log::warn!("Failed to remove workspace of {}: {}", path.display(), e);
        }

        match delivery {
            Ok(()) => {
                log::info!("Delivered {}", path.display());
                self.finish_log(log_id, LogStatus::Completed, None);
                Ok(())
            }
            Err(e) => {
                log::error!("Delivery failed: {}", e);
                self.finish_log(log_id, LogStatus::FailedToSend, Some(&e.to_string()));
                Err(e)
            }
        }
    }

    async fn deliver(
        &self,
        transport: &dyn Transport,
        fulfilled: &Fulfilled,
        option: &StreamOption,
    ) -> Result<(), DownloadError> {
        match tokio::time::timeout(
            self.delivery_timeout,
            transport.deliver_file(&fulfilled.path, &fulfilled.title, option),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DownloadError::DeliveryFailed(format!(
                "sending timed out after {}s",
                self.delivery_timeout.as_secs()
            ))),
        }
    }

    pub fn stats(&self) -> AppResult<UsageStats> {
        self.store.query_stats()
    }
}

