//! Stream catalog, fetch-and-assemble pipeline and their external tools

pub mod catalog;
pub mod error;
pub mod ffmpeg;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod workspace;
pub mod ytdlp;
pub mod ytdlp_errors;

pub use catalog::{fetch_catalog_with_retry, CatalogBuilder, CatalogPolicy};
pub use error::{DownloadError, UserHint};
pub use ffmpeg::{AudioTranscoder, Ffmpeg, Muxer};
pub use model::{DownloadJob, MediaKind, Placement, RawStream, StreamOption, VideoCatalog, VideoMetadata};
pub use pipeline::{FetchPipeline, Fulfilled};
pub use provider::MetadataProvider;
pub use workspace::Workspace;
pub use ytdlp::YtDlpProvider;
