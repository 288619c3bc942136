use thiserror::Error;

/// Errors returned by the engagement data-source client.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway asked us to slow down (HTTP 429).
    #[error("rate limited by data source (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// The account does not exist on the platform or the gateway.
    #[error("account {platform}/{username} not found at data source")]
    NotFound { platform: String, username: String },

    /// Any other non-2xx status.
    #[error("data source returned HTTP {status} for {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid data source base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("data source is not configured: set FAIRSCORE_SOURCE_BASE_URL")]
    NotConfigured,
}
