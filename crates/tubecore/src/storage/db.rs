//! Usage store: users and an append-only action log in SQLite.

use chrono::{FixedOffset, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use std::time::Duration;
use strum::{AsRefStr, Display, EnumString};

use crate::core::error::AppResult;
use crate::storage::migrations::run_migrations;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Max stored length of an error message, in chars
pub const MAX_ERROR_MESSAGE_CHARS: usize = 500;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Terminal and intermediate states of a usage-log row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum LogStatus {
    Started,
    InfoRetrieved,
    Completed,
    Failed,
    InvalidUrl,
    FailedToSend,
    Cancelled,
}

/// What a usage-log row records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    Start,
    Help,
    Stats,
    UrlCheck,
    Download,
}

/// Row of the top-users table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopUser {
    pub user_id: i64,
    pub username: Option<String>,
    pub downloads: i64,
}

/// A usage-log row that carries an error message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentError {
    pub action: String,
    pub video_url: String,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    pub total_users: i64,
    pub total_completed_downloads: i64,
    pub top_users: Vec<TopUser>,
    pub recent_errors: Vec<RecentError>,
}

/// Create a new database connection pool
///
/// Every connection gets a busy timeout so concurrent writers wait instead of
/// failing, and the schema is migrated before the pool is returned.
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));
    let pool = Pool::builder().max_size(10).build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;

    log::info!("Database ready at {}", database_path);
    Ok(pool)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Persistence for users and usage-log rows.
///
/// Each operation is a single SQL statement on a pooled connection.
#[derive(Clone)]
pub struct UsageStore {
    pool: DbPool,
    timezone: FixedOffset,
}

impl UsageStore {
    pub fn new(pool: DbPool, timezone: FixedOffset) -> Self {
        Self { pool, timezone }
    }

    /// Opens (and migrates) the database file.
    pub fn open(database_path: &str, timezone: FixedOffset) -> AppResult<Self> {
        Ok(Self::new(create_pool(database_path)?, timezone))
    }

    fn conn(&self) -> AppResult<DbConnection> {
        Ok(self.pool.get()?)
    }

    fn now(&self) -> String {
        Utc::now().with_timezone(&self.timezone).format(TIMESTAMP_FORMAT).to_string()
    }

    /// Inserts the user on first sight; later calls leave the row untouched.
    pub fn record_user(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> AppResult<()> {
        let inserted = self.conn()?.execute(
            "INSERT OR IGNORE INTO users (user_id, username, first_name, last_name, join_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, username, first_name, last_name, self.now()],
        )?;
        if inserted > 0 {
            log::info!("New user {} ({})", user_id, username.unwrap_or("no username"));
        }
        Ok(())
    }

    /// Appends a `started` row and returns its id.
    pub fn start_log(
        &self,
        user_id: i64,
        action: Action,
        video_url: Option<&str>,
        format: Option<&str>,
        quality: Option<&str>,
    ) -> AppResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO usage_logs (user_id, action, video_url, format, quality, timestamp, status, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '')",
            params![
                user_id,
                action.as_ref(),
                video_url.unwrap_or(""),
                format.unwrap_or(""),
                quality.unwrap_or(""),
                self.now(),
                LogStatus::Started.as_ref(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Sets the row's status; the message is cut to [`MAX_ERROR_MESSAGE_CHARS`].
    pub fn finish_log(&self, log_id: i64, status: LogStatus, error_message: Option<&str>) -> AppResult<()> {
        let message = truncate_chars(error_message.unwrap_or(""), MAX_ERROR_MESSAGE_CHARS);
        let updated = self.conn()?.execute(
            "UPDATE usage_logs SET status = ?1, error_message = ?2 WHERE id = ?3",
            params![status.as_ref(), message, log_id],
        )?;
        if updated == 0 {
            log::warn!("finish_log: no usage row with id {}", log_id);
        }
        Ok(())
    }

    /// Current status and message of a row, if it exists.
    pub fn log_status(&self, log_id: i64) -> AppResult<Option<(String, String)>> {
        let row = self
            .conn()?
            .query_row(
                "SELECT status, error_message FROM usage_logs WHERE id = ?1",
                [log_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row)
    }

    pub fn query_stats(&self) -> AppResult<UsageStats> {
        let conn = self.conn()?;

        let total_users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        let total_completed_downloads: i64 = conn.query_row(
            "SELECT COUNT(*) FROM usage_logs WHERE action = ?1 AND status = ?2",
            params![Action::Download.as_ref(), LogStatus::Completed.as_ref()],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT usage_logs.user_id, users.username, COUNT(*) AS cnt
             FROM usage_logs
             LEFT JOIN users ON usage_logs.user_id = users.user_id
             WHERE usage_logs.action = ?1 AND usage_logs.status = ?2
             GROUP BY usage_logs.user_id
             ORDER BY cnt DESC, usage_logs.user_id ASC
             LIMIT 5",
        )?;
        let top_users = stmt
            .query_map(
                params![Action::Download.as_ref(), LogStatus::Completed.as_ref()],
                |row| {
                    Ok(TopUser {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                        downloads: row.get(2)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT action, video_url, error_message, timestamp
             FROM usage_logs
             WHERE error_message != ''
             ORDER BY timestamp DESC, id DESC
             LIMIT 5",
        )?;
        let recent_errors = stmt
            .query_map([], |row| {
                Ok(RecentError {
                    action: row.get(0)?,
                    video_url: row.get(1)?,
                    error_message: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UsageStats {
            total_users,
            total_completed_downloads,
            top_users,
            recent_errors,
        })
    }
}
