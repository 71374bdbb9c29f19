//! Telegram bot handler tree configuration
//!
//! Commands, link messages and inline-button callbacks all end up in
//! [`tubecore::DownloadFlow`]; this layer only translates Telegram updates.

mod callbacks;
mod commands;
mod errors;
mod links;
mod schema;
mod types;

pub use schema::schema;
pub use types::HandlerDeps;
