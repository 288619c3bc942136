use std::path::PathBuf;

use crate::Platform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub accounts_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// IANA zone used to bucket post timestamps into calendar dates.
    pub reporting_tz: String,
    /// Platforms processed when a run does not name one.
    pub default_platforms: Vec<Platform>,
    /// Number of metric extractions allowed in flight per batch.
    pub extract_batch_size: usize,
    pub source_base_url: Option<String>,
    pub source_api_key: Option<String>,
    pub source_timeout_secs: u64,
    pub source_user_agent: String,
    pub source_max_retries: u32,
    pub source_retry_backoff_ms: u64,
    pub schedule_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("accounts_path", &self.accounts_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("reporting_tz", &self.reporting_tz)
            .field("default_platforms", &self.default_platforms)
            .field("extract_batch_size", &self.extract_batch_size)
            .field("source_base_url", &self.source_base_url)
            .field(
                "source_api_key",
                &self.source_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("source_timeout_secs", &self.source_timeout_secs)
            .field("source_user_agent", &self.source_user_agent)
            .field("source_max_retries", &self.source_max_retries)
            .field("source_retry_backoff_ms", &self.source_retry_backoff_ms)
            .field("schedule_cron", &self.schedule_cron)
            .finish()
    }
}
