//! HTTP client for the engagement gateway.
//!
//! The gateway fronts each platform's scraping API and returns one
//! [`EngagementBundle`] per account and date window. Transient failures are
//! retried according to the [`RetryPolicy`] the client was built with.

use std::time::Duration;

use async_trait::async_trait;
use fairscore_core::{AppConfig, DateWindow, Platform};
use reqwest::{header, Client, StatusCode, Url};

use crate::error::SourceError;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::types::EngagementBundle;

/// Anything that can produce raw engagement records for an account.
#[async_trait]
pub trait EngagementSource: Send + Sync {
    async fn fetch_engagement(
        &self,
        platform: Platform,
        username: &str,
        window: &DateWindow,
    ) -> Result<EngagementBundle, SourceError>;
}

pub struct SourceClient {
    client: Client,
    api_key: Option<String>,
    base_url: Url,
    retry: RetryPolicy,
}

impl SourceClient {
    /// Builds a client from application config.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NotConfigured`] when no base URL is set, or any
    /// error from [`SourceClient::with_base_url`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, SourceError> {
        let base_url = config
            .source_base_url
            .as_deref()
            .ok_or(SourceError::NotConfigured)?;
        Self::with_base_url(
            base_url,
            config.source_api_key.as_deref(),
            config.source_timeout_secs,
            &config.source_user_agent,
            RetryPolicy::new(config.source_max_retries, config.source_retry_backoff_ms),
        )
    }

    /// Creates a client against an explicit base URL (a mock server in tests).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`SourceError::InvalidBaseUrl`] if `base_url` cannot carry a path.
    pub fn with_base_url(
        base_url: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
        user_agent: &str,
        retry: RetryPolicy,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed =
            Url::parse(&normalised).map_err(|_| SourceError::InvalidBaseUrl(base_url.to_owned()))?;
        if parsed.cannot_be_a_base() {
            return Err(SourceError::InvalidBaseUrl(base_url.to_owned()));
        }

        Ok(Self {
            client,
            api_key: api_key.map(str::to_owned),
            base_url: parsed,
            retry,
        })
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Fetches the engagement bundle for one account over `window`.
    ///
    /// # Errors
    ///
    /// - [`SourceError::NotFound`] on HTTP 404.
    /// - [`SourceError::RateLimited`] / [`SourceError::UnexpectedStatus`] once
    ///   retries are exhausted.
    /// - [`SourceError::Deserialize`] if the body does not match the bundle shape.
    pub async fn fetch_engagement(
        &self,
        platform: Platform,
        username: &str,
        window: &DateWindow,
    ) -> Result<EngagementBundle, SourceError> {
        let url = self.engagement_url(platform, username, window)?;
        tracing::debug!(%platform, username, %window, "fetching engagement bundle");

        retry_with_backoff(self.retry, || self.request_bundle(&url, platform, username)).await
    }

    /// `{base}/v1/{platform}/accounts/{username}/engagement?start=..&end=..`
    fn engagement_url(
        &self,
        platform: Platform,
        username: &str,
        window: &DateWindow,
    ) -> Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SourceError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["v1", platform.as_str(), "accounts", username, "engagement"]);
        url.query_pairs_mut()
            .append_pair("start", &window.start.to_string())
            .append_pair("end", &window.end.to_string());
        Ok(url)
    }

    async fn request_bundle(
        &self,
        url: &Url,
        platform: Platform,
        username: &str,
    ) -> Result<EngagementBundle, SourceError> {
        let mut request = self.client.get(url.clone());
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(SourceError::NotFound {
                    platform: platform.to_string(),
                    username: username.to_owned(),
                })
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok());
                return Err(SourceError::RateLimited { retry_after_secs });
            }
            status => {
                return Err(SourceError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                })
            }
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
            context: format!("engagement({platform}/{username})"),
            source: e,
        })
    }
}

#[async_trait]
impl EngagementSource for SourceClient {
    async fn fetch_engagement(
        &self,
        platform: Platform,
        username: &str,
        window: &DateWindow,
    ) -> Result<EngagementBundle, SourceError> {
        SourceClient::fetch_engagement(self, platform, username, window).await
    }
}
