//! Market data API client
//!
//! Provides a typed HTTP client for a CoinMarketCap-compatible API. Handles
//! the API key header, the request timeout, retries on connection failure
//! and HTTP 429, and decoding of the response envelope.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use coinfolio_core::config::MarketConfig;
//! use coinfolio_market::client::MarketClient;
//!
//! # async fn example() -> Result<(), coinfolio_market::MarketError> {
//! let client = MarketClient::new(&MarketConfig::default())?;
//! let listings = client
//!     .get_data::<serde_json::Value>("/v1/cryptocurrency/listings/latest", &[("convert", "USD".into())])
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use coinfolio_core::config::MarketConfig;

use crate::rate_limit::{backoff_delay, parse_retry_after};
use crate::wire::{Envelope, ErrorEnvelope};
use crate::MarketError;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

/// Default retry-after duration when the header is missing
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Decoded payload of a successful response
#[derive(Debug)]
pub struct ApiPayload<T> {
    /// Server timestamp of the response, or the local receive time
    pub fetched_at: DateTime<Utc>,
    pub data: T,
}

/// HTTP client for market data API calls
pub struct MarketClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl MarketClient {
    /// Creates a client from the market section of the configuration
    ///
    /// # Errors
    /// Returns `MarketError::Network` if the TLS backend cannot be set up.
    pub fn new(config: &MarketConfig) -> Result<Self, MarketError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Creates a client with a custom base URL and default settings
    /// (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: None,
            max_retries: MarketConfig::default().max_retries,
        }
    }

    /// Sets the API key sent with every request
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Overrides how many times a request is retried
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Creates a request builder for the given method and path
    ///
    /// Prepends the base URL and adds the API key header when one is set.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self
            .client
            .request(method, &url)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    /// Sends a GET request, retrying on connection failure and HTTP 429
    ///
    /// 1. **Connection failures** (refused, reset, timeout) are retried after
    ///    an exponential backoff.
    /// 2. **429** responses are retried after the `Retry-After` delay.
    ///
    /// Any other response, successful or not, is returned as-is.
    pub async fn execute_with_retry(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response, MarketError> {
        let mut attempt = 0;
        loop {
            let sent = self.request(Method::GET, path).query(query).send().await;

            let response = match sent {
                Ok(response) => response,
                Err(e) if is_retryable(&e) && attempt < self.max_retries => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        path,
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "Connection failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(MarketError::Network(e)),
            };

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                    .unwrap_or(DEFAULT_RETRY_AFTER);

                if attempt >= self.max_retries {
                    warn!(path, attempts = attempt + 1, "429 retry limit exhausted");
                    return Err(MarketError::TooManyRequests { retry_after });
                }

                info!(
                    path,
                    attempt,
                    retry_after_ms = retry_after.as_millis(),
                    "Received 429, backing off"
                );
                tokio::time::sleep(retry_after).await;
                attempt += 1;
                continue;
            }

            if attempt > 0 {
                info!(path, attempt, "Request succeeded after retry");
            }
            return Ok(response);
        }
    }

    /// Fetches and decodes the `data` member of an endpoint
    ///
    /// Returns `Ok(None)` on HTTP 204. Non-2xx answers are decoded from the
    /// error envelope when possible.
    pub async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<ApiPayload<T>>, MarketError> {
        let response = self.execute_with_retry(path, query).await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            debug!(path, "No content");
            return Ok(None);
        }

        let body = response.text().await?;

        if !status.is_success() {
            return Err(error_from_body(status, &body));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)
            .map_err(|e| MarketError::InvalidResponse(format!("{}: {}", path, e)))?;

        let data = envelope
            .data
            .ok_or_else(|| MarketError::InvalidResponse(format!("{}: missing data", path)))?;

        Ok(Some(ApiPayload {
            fetched_at: envelope.status.timestamp.unwrap_or_else(Utc::now),
            data,
        }))
    }
}

fn is_retryable(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout()
}

/// Builds the error for a non-2xx response from its body
fn error_from_body(status: StatusCode, body: &str) -> MarketError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let code = parsed.as_ref().and_then(|e| e.status.error_code);
    let message = parsed
        .and_then(|e| e.status.error_message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MarketError::Unauthorized {
            status: status.as_u16(),
            message,
        },
        _ => MarketError::Server {
            status: status.as_u16(),
            code,
            message,
        },
    }
}
