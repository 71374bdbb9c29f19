//! Inline-button payloads
//!
//! Fields are `|`-separated and must fit Telegram's 64-byte callback limit:
//!
//! - `option|<video_id>|<kind>`: list the options of one media kind
//! - `download|<video_id>|<tag>|<kind>|<quality>|<placement>`: fetch one option
//! - `cancel`: drop the selection
//!
//! Nothing else is carried; the catalog is rebuilt on every step.

use std::fmt;
use tubecore::{MediaKind, Placement, StreamOption};

const SEPARATOR: char = '|';

/// Placement field value for audio options
const NO_PLACEMENT: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    ShowOptions {
        video_id: String,
        kind: MediaKind,
    },
    Download {
        video_id: String,
        tag: String,
        kind: MediaKind,
        quality: String,
        placement: Option<Placement>,
    },
    Cancel,
}

impl CallbackAction {
    pub fn download(video_id: &str, option: &StreamOption) -> Self {
        CallbackAction::Download {
            video_id: video_id.to_string(),
            tag: option.tag.clone(),
            kind: option.kind,
            quality: option.quality.clone(),
            placement: option.placement,
        }
    }

    /// Returns `None` for anything that is not one of the three payload shapes.
    pub fn parse(data: &str) -> Option<Self> {
        let parts: Vec<&str> = data.split(SEPARATOR).collect();
        match parts.as_slice() {
            ["cancel"] => Some(CallbackAction::Cancel),
            ["option", video_id, kind] if !video_id.is_empty() => Some(CallbackAction::ShowOptions {
                video_id: video_id.to_string(),
                kind: kind.parse().ok()?,
            }),
            ["download", video_id, tag, kind, quality, placement] if !video_id.is_empty() && !tag.is_empty() => {
                let placement = match *placement {
                    NO_PLACEMENT => None,
                    other => Some(other.parse().ok()?),
                };
                Some(CallbackAction::Download {
                    video_id: video_id.to_string(),
                    tag: tag.to_string(),
                    kind: kind.parse().ok()?,
                    quality: quality.to_string(),
                    placement,
                })
            }
            _ => None,
        }
    }

    /// Option to fetch for a `Download` payload.
    ///
    /// The extension is left empty: the pipeline names output files after the
    /// stream it resolves at fetch time.
    pub fn stream_option(&self) -> Option<StreamOption> {
        match self {
            CallbackAction::Download {
                tag,
                kind,
                quality,
                placement,
                ..
            } => Some(StreamOption {
                tag: tag.clone(),
                kind: *kind,
                quality: quality.clone(),
                extension: String::new(),
                placement: *placement,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::ShowOptions { video_id, kind } => write!(f, "option|{}|{}", video_id, kind),
            CallbackAction::Download {
                video_id,
                tag,
                kind,
                quality,
                placement,
            } => write!(
                f,
                "download|{}|{}|{}|{}|{}",
                video_id,
                tag,
                kind,
                quality,
                placement.as_ref().map_or(NO_PLACEMENT, |p| p.as_ref())
            ),
            CallbackAction::Cancel => f.write_str("cancel"),
        }
    }
}
