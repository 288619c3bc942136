pub mod accounts;
pub mod app_config;
pub mod config;
pub mod membership;
pub mod metrics;
pub mod period;
pub mod platform;

pub use accounts::{load_accounts, AccountConfig, AccountsFile};
pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use membership::MembershipSet;
pub use metrics::{
    Account, ComposedScore, Granularity, Metric, MetricScores, PeerGroupKey, RawMetrics,
    ScoreKey, ScoreRowView, WeightedScores,
};
pub use period::{first_of_month, DateWindow};
pub use platform::Platform;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read accounts file {path}: {source}")]
    AccountsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse accounts file: {0}")]
    AccountsFileParse(#[from] serde_yaml::Error),

    #[error("accounts validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("unknown granularity: {0}")]
    UnknownGranularity(String),

    #[error("invalid date range: start {start} is after end {end}")]
    InvertedRange { start: String, end: String },
}
