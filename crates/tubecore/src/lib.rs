//! tubecore - stream selection and download fulfillment for the tubedrop bot
//!
//! Everything except the chat transport lives here.
//!
//! # Module Structure
//!
//! - `core`: configuration, logging, errors, retry, validation, process helpers
//! - `download`: catalog builder, fetch-and-assemble pipeline, yt-dlp and ffmpeg backends
//! - `storage`: SQLite usage store and migrations
//! - `flow`: glue a transport calls (validate, log, fetch, deliver)

pub mod core;
pub mod download;
pub mod flow;
pub mod storage;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult, Config};
pub use download::{DownloadError, DownloadJob, MediaKind, Placement, StreamOption, VideoCatalog};
pub use flow::{ChatUser, DownloadFlow, FlowFailure, Transport};
pub use storage::{LogStatus, UsageStore};
