//! Shared JSON-over-HTTP client for providers.
//!
//! Retry strategy (bounded by `http.max_retries`):
//! - network error, HTTP 429, HTTP 5xx → retry with exponential backoff
//! - any other non-success status → fail immediately
//! - undecodable body → fail immediately

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::HttpConfig;
use crate::error::FetchError;
use crate::models::Source;

pub struct HttpClient {
    client: reqwest::Client,
    provider: Source,
    authorization: Option<String>,
    max_retries: u32,
    retry_base: Duration,
}

impl HttpClient {
    /// Build a client for `provider`. `authorization` is the full value of
    /// the `Authorization` header, if a credential is available.
    pub fn new(
        provider: Source,
        http: &HttpConfig,
        authorization: Option<String>,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .user_agent(http.user_agent.clone())
            .build()
            .map_err(|error| FetchError::Http {
                provider,
                url: String::new(),
                error,
            })?;

        Ok(Self {
            client,
            provider,
            authorization,
            max_retries: http.max_retries,
            retry_base: Duration::from_millis(http.retry_base_ms),
        })
    }

    pub fn provider(&self) -> Source {
        self.provider
    }

    pub fn has_credentials(&self) -> bool {
        self.authorization.is_some()
    }

    /// GET `url` with `query` and decode the JSON body as `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_base * (1u32 << (attempt - 1).min(5));
                tracing::debug!(%url, attempt, ?delay, "retrying request");
                tokio::time::sleep(delay).await;
            }

            match self.get_once(url, query).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => {
                    tracing::warn!(provider = %self.provider, %url, "request failed: {}", err);
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err.unwrap_or_else(|| FetchError::Config {
            provider: self.provider,
            message: format!("no attempt was made to fetch {}", url),
        }))
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let mut request = self
            .client
            .get(url)
            .query(query)
            .header("Accept", "application/json");
        if let Some(auth) = &self.authorization {
            request = request.header("Authorization", auth);
        }

        let response = request.send().await.map_err(|error| FetchError::Http {
            provider: self.provider,
            url: url.to_string(),
            error,
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| FetchError::Http {
            provider: self.provider,
            url: url.to_string(),
            error,
        })?;

        if !status.is_success() {
            return Err(FetchError::Status {
                provider: self.provider,
                url: url.to_string(),
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|error| FetchError::Decode {
            provider: self.provider,
            url: url.to_string(),
            error,
        })
    }
}

/// Join a base URL and a path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Read a credential from the named environment variable. Blank values
/// count as unset.
pub fn token_from_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
