//! Telegram transport: bot setup, handlers, keyboards and texts

pub mod bot;
pub mod callback;
pub mod handlers;
pub mod keyboard;
pub mod markdown;
pub mod messages;
pub mod transport;

pub use bot::{create_bot, setup_bot_commands};
pub use handlers::{schema, HandlerDeps};
