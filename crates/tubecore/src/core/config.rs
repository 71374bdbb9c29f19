//! Runtime configuration
//!
//! Layered with figment: compiled defaults → optional TOML file → `TUBEDROP_*` environment
//! variables (nested keys separated by `__`, e.g. `TUBEDROP_RETRY__MAX_ATTEMPTS=5`).
//! The bot token also falls back to `BOT_TOKEN` / `TELOXIDE_TOKEN`, and admin ids to a
//! comma-separated `ADMIN_IDS`.

use chrono::FixedOffset;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::{AppError, AppResult};
use crate::core::retry::RetryConfig;
use crate::download::catalog::CatalogPolicy;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "tubedrop.toml";

/// Environment prefix for all settings
pub const ENV_PREFIX: &str = "TUBEDROP_";

/// Default values
pub mod defaults {
    /// SQLite database file
    pub const DATABASE_PATH: &str = "tubedrop.sqlite";

    /// Timeout for a single yt-dlp invocation (metadata or stream download), seconds
    pub const PROVIDER_TIMEOUT_SECS: u64 = 900;

    /// Timeout for a single ffmpeg invocation, seconds
    pub const FFMPEG_TIMEOUT_SECS: u64 = 1800;

    /// Upper bound for sending the finished file to the chat, seconds
    pub const DELIVERY_TIMEOUT_SECS: u64 = 3600;

    /// Offset applied to usage-log timestamps (WIB, UTC+7)
    pub const UTC_OFFSET_HOURS: i32 = 7;
}

fn parse_admin_ids(raw: &str) -> Vec<i64> {
    raw.split([',', ' ', '\n', '\t'])
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter when `RUST_LOG` is not set
    pub level: String,
    /// Optional log file (appended, no ANSI colors)
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// External tool locations and timeouts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub ytdlp_bin: String,
    pub ffmpeg_bin: String,
    pub provider_timeout_secs: u64,
    pub ffmpeg_timeout_secs: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ytdlp_bin: "yt-dlp".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            provider_timeout_secs: defaults::PROVIDER_TIMEOUT_SECS,
            ffmpeg_timeout_secs: defaults::FFMPEG_TIMEOUT_SECS,
        }
    }
}

impl ToolSettings {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn ffmpeg_timeout(&self) -> Duration {
        Duration::from_secs(self.ffmpeg_timeout_secs)
    }
}

/// Retry settings for catalog fetches, converted into a [`RetryConfig`]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 8000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        let config = RetryConfig::new()
            .max_attempts(self.max_attempts)
            .initial_delay(Duration::from_millis(self.initial_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .backoff_multiplier(self.backoff_multiplier);
        if self.jitter {
            config
        } else {
            config.no_jitter()
        }
    }
}

/// Top-level configuration passed to every component at construction.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Telegram bot token
    #[serde(deserialize_with = "deserialize_secret")]
    pub bot_token: SecretString,
    /// Telegram user ids allowed to run `/stats`
    pub admin_ids: Vec<i64>,
    /// SQLite database file
    pub database_path: String,
    /// Parent directory for per-job workspaces (system temp dir when unset)
    pub workspace_root: Option<PathBuf>,
    /// Upper bound for delivering the finished file, seconds
    pub delivery_timeout_secs: u64,
    /// Offset applied to usage-log timestamps, hours east of UTC
    pub utc_offset_hours: i32,
    pub log: LogSettings,
    pub tools: ToolSettings,
    pub catalog: CatalogPolicy,
    pub retry: RetrySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: empty_secret(),
            admin_ids: Vec::new(),
            database_path: defaults::DATABASE_PATH.to_string(),
            workspace_root: None,
            delivery_timeout_secs: defaults::DELIVERY_TIMEOUT_SECS,
            utc_offset_hours: defaults::UTC_OFFSET_HOURS,
            log: LogSettings::default(),
            tools: ToolSettings::default(),
            catalog: CatalogPolicy::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl Config {
    /// Loads configuration from an optional TOML file and the environment.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let figment = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let mut config = Self::from_figment(figment)?;

        if config.bot_token.expose_secret().is_empty() {
            if let Ok(token) = env::var("BOT_TOKEN").or_else(|_| env::var("TELOXIDE_TOKEN")) {
                config.bot_token = SecretString::from(token);
            }
        }
        if config.admin_ids.is_empty() {
            if let Ok(raw) = env::var("ADMIN_IDS") {
                config.admin_ids = parse_admin_ids(&raw);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Extracts a config from an arbitrary figment (used by `load` and by tests).
    pub fn from_figment(figment: Figment) -> AppResult<Self> {
        Ok(figment.extract::<Config>()?)
    }

    /// Rejects settings the catalog builder and retry wrapper cannot work with.
    pub fn validate(&self) -> AppResult<()> {
        if self.catalog.allowed_resolutions.is_empty() {
            return Err(AppError::Config("catalog.allowed_resolutions must not be empty".into()));
        }
        if self.catalog.max_audio_options == 0 || self.catalog.max_video_options == 0 {
            return Err(AppError::Config("catalog option caps must be greater than zero".into()));
        }
        if self.catalog.video_container.trim().is_empty() {
            return Err(AppError::Config("catalog.video_container must not be empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::Config("retry.max_attempts must be at least 1".into()));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(AppError::Config(format!(
                "retry.backoff_multiplier must be a finite number >= 1.0, got {}",
                self.retry.backoff_multiplier
            )));
        }
        self.timezone()?;
        Ok(())
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    pub fn timezone(&self) -> AppResult<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .ok_or_else(|| AppError::Config(format!("utc_offset_hours out of range: {}", self.utc_offset_hours)))
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root.clone().unwrap_or_else(env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Toml;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.catalog.max_audio_options, 3);
        assert_eq!(config.catalog.max_video_options, 10);
        assert_eq!(config.delivery_timeout(), Duration::from_secs(3600));
    }

    #[test]
    fn test_toml_overrides_nested_sections() {
        let figment = Figment::new().merge(Toml::string(
            r#"
            admin_ids = [1390557485]
            bot_token = "123:abc"

            [retry]
            max_attempts = 5
            jitter = false

            [catalog]
            allowed_resolutions = ["720p", "1080p"]
            "#,
        ));
        let config = Config::from_figment(figment).unwrap();

        assert_eq!(config.admin_ids, vec![1390557485]);
        assert_eq!(config.bot_token.expose_secret(), "123:abc");
        assert_eq!(config.retry.max_attempts, 5);
        assert!(!config.retry.to_retry_config().add_jitter);
        assert_eq!(config.catalog.allowed_resolutions, vec!["720p", "1080p"]);
        // untouched fields keep their defaults
        assert_eq!(config.catalog.video_container, "mp4");
        assert_eq!(config.tools.ytdlp_bin, "yt-dlp");
    }

    #[test]
    fn test_validate_rejects_empty_resolutions() {
        let mut config = Config::default();
        config.catalog.allowed_resolutions.clear();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_backoff_multiplier() {
        for multiplier in [-2.0, 0.5, f64::NAN, f64::INFINITY] {
            let mut config = Config::default();
            config.retry.backoff_multiplier = multiplier;
            assert!(matches!(config.validate(), Err(AppError::Config(_))), "{}", multiplier);
        }

        let figment = Figment::new().merge(Toml::string("[retry]\nbackoff_multiplier = -2.0"));
        let config = Config::from_figment(figment).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_offset() {
        let config = Config {
            utc_offset_hours: 30,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_admin_ids() {
        assert_eq!(parse_admin_ids("1, 2\n3,abc"), vec![1, 2, 3]);
        assert!(parse_admin_ids("").is_empty());
    }
}
