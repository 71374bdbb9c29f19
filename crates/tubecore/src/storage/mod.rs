//! Persistence: SQLite pool, migrations and the usage store

pub mod db;
pub mod migrations;

pub use db::{create_pool, Action, DbPool, LogStatus, UsageStats, UsageStore};
