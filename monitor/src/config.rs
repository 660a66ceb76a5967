//! Monitor configuration.

use std::time::Duration;

use kursmon_common::constants::{
    default_request_timeout, default_schedule_interval, RETENTION_DAYS,
};
use kursmon_common::DurationExt;

use crate::thresholds::ThresholdTable;

/// Telegram delivery configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token.
    pub bot_token: String,
    /// Default destination chat.
    pub chat_id: String,
    /// Bot API base URL.
    pub api_base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base_url: "https://api.telegram.org".to_string(),
            timeout: default_request_timeout().as_std(),
        }
    }
}

/// Quote source configuration.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Aggregator page URL.
    pub url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Best offers averaged per leg.
    pub top_count: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "https://kurs.kz".to_string(),
            timeout: default_request_timeout().as_std(),
            top_count: 5,
        }
    }
}

/// History store configuration.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: String,
    /// Records older than this are pruned after every cycle.
    pub retention_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            database_path: "./data/currency-history.db".to_string(),
            retention_days: RETENTION_DAYS,
        }
    }
}

/// Scheduled run configuration.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Time between scheduled cycles.
    pub interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: default_schedule_interval().as_std(),
        }
    }
}

/// Main monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub telegram: TelegramConfig,
    pub source: SourceConfig,
    pub history: HistoryConfig,
    pub schedule: ScheduleConfig,
    /// Threshold table handed to the detector.
    pub thresholds: ThresholdTable,
    /// Log level.
    pub log_level: String,
    /// Emit JSON logs (`LOG_FORMAT` other than `text`).
    pub log_json: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            source: SourceConfig::default(),
            history: HistoryConfig::default(),
            schedule: ScheduleConfig::default(),
            thresholds: ThresholdTable::default(),
            log_level: "info".to_string(),
            log_json: true,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from `lookup`, falling back to defaults.
    /// Unparseable numbers keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            config.telegram.bot_token = token;
        }

        if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID") {
            config.telegram.chat_id = chat_id;
        }

        if let Some(url) = lookup("TELEGRAM_API_URL") {
            config.telegram.api_base_url = url;
        }

        if let Some(url) = lookup("SOURCE_URL") {
            config.source.url = url;
        }

        if let Some(secs) = lookup("SOURCE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.source.timeout = Duration::from_secs(secs);
        }

        if let Some(count) = lookup("SOURCE_TOP_COUNT").and_then(|v| v.parse().ok()) {
            config.source.top_count = count;
        }

        if let Some(path) = lookup("HISTORY_DATABASE_PATH") {
            config.history.database_path = path;
        }

        if let Some(days) = lookup("HISTORY_RETENTION_DAYS").and_then(|v| v.parse().ok()) {
            config.history.retention_days = days;
        }

        if let Some(secs) = lookup("SCHEDULE_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            config.schedule.interval = Duration::from_secs(secs);
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        if let Some(format) = lookup("LOG_FORMAT") {
            config.log_json = !format.eq_ignore_ascii_case("text");
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err("TELEGRAM_BOT_TOKEN must be set".to_string());
        }

        if self.telegram.chat_id.trim().is_empty() {
            return Err("TELEGRAM_CHAT_ID must be set".to_string());
        }

        if self.telegram.timeout.is_zero() || self.source.timeout.is_zero() {
            return Err("Request timeouts must be positive".to_string());
        }

        if self.source.top_count == 0 {
            return Err("Source top count must be at least 1".to_string());
        }

        if self.history.database_path.is_empty() {
            return Err("History database path cannot be empty".to_string());
        }

        if self.history.retention_days == 0 {
            return Err("History retention must be at least 1 day".to_string());
        }

        if self.schedule.interval.is_zero() {
            return Err("Schedule interval must be positive".to_string());
        }

        self.thresholds.validate()
    }
}
