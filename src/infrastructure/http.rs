//! Blocking ClickUp API client.
//!
//! Wraps `reqwest::blocking` with the fixed inter-call throttle, response
//! classification and bounded retry/backoff used by every fetcher. All
//! interaction with the provider is read-only GET.

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde_json::Value;

use crate::domain::{AppError, Result};

/// Base URL for the v2 API surface (hierarchy and legacy chat views).
pub const BASE_URL_V2: &str = "https://api.clickup.com/api/v2";
/// Base URL for the v3 API surface (chat channels and messages).
pub const BASE_URL_V3: &str = "https://api.clickup.com/api/v3";

/// Fixed delay between consecutive API calls.
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(1);
/// Per-request socket timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Retry budget for transport-level failures.
const MAX_RETRIES: u32 = 3;
/// Retry budget for 429 responses. A rate limit normally clears within one
/// or two waits; exhausting the budget degrades the call to no data.
const MAX_RATE_LIMIT_RETRIES: u32 = 8;
/// Wait applied when a 429 response carries no Retry-After header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Blocking client for the ClickUp REST API.
pub struct ApiClient {
    http: Client,
    token: String,
    base_v2: String,
    base_v3: String,
}

impl ApiClient {
    /// Creates a client authenticated with a personal API token.
    ///
    /// # Errors
    /// Returns error if the underlying HTTP client cannot be built.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::http("Failed to build HTTP client", e))?;

        Ok(Self {
            http,
            token: token.into(),
            base_v2: BASE_URL_V2.to_string(),
            base_v3: BASE_URL_V3.to_string(),
        })
    }

    /// Builds a v2 endpoint URL.
    #[must_use]
    pub fn v2_url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_v2)
    }

    /// Builds a v3 endpoint URL.
    #[must_use]
    pub fn v3_url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_v3)
    }

    /// Performs a throttled GET and classifies the response.
    ///
    /// Returns `Ok(Some(body))` for a parsed 200 response and `Ok(None)`
    /// when the call degraded to no data (non-200 status, exhausted retry
    /// budget, undecodable body). Callers cannot distinguish a degraded
    /// call from a legitimately empty result.
    ///
    /// # Errors
    /// Returns `AppError::Auth` on a 401 response; the token cannot be
    /// salvaged mid-run.
    pub fn get(&self, url: &str, params: &[(&str, String)]) -> Result<Option<Value>> {
        let mut transport_attempts = 0u32;
        let mut rate_limit_attempts = 0u32;

        loop {
            thread::sleep(RATE_LIMIT_DELAY);

            let response = self
                .http
                .get(url)
                .header("Authorization", &self.token)
                .header("Content-Type", "application/json")
                .query(params)
                .send();

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    if transport_attempts < MAX_RETRIES {
                        let wait = Duration::from_secs(1 << (transport_attempts + 1));
                        transport_attempts += 1;
                        tracing::warn!(
                            "Connection error, retrying in {}s... ({}/{}): {}",
                            wait.as_secs(),
                            transport_attempts,
                            MAX_RETRIES,
                            e
                        );
                        thread::sleep(wait);
                        continue;
                    }
                    tracing::error!("Request failed after {MAX_RETRIES} retries: {e}");
                    return Ok(None);
                }
            };

            match response.status() {
                StatusCode::OK => {
                    return match response.json::<Value>() {
                        Ok(body) => Ok(Some(body)),
                        Err(e) => {
                            tracing::warn!("Undecodable response body from {url}: {e}");
                            Ok(None)
                        }
                    };
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    if rate_limit_attempts >= MAX_RATE_LIMIT_RETRIES {
                        tracing::error!(
                            "Still rate limited after {MAX_RATE_LIMIT_RETRIES} waits, \
                             giving up on {url}"
                        );
                        return Ok(None);
                    }
                    let wait = retry_after(&response);
                    rate_limit_attempts += 1;
                    tracing::warn!("Rate limited. Waiting {}s...", wait.as_secs());
                    thread::sleep(wait);
                }
                StatusCode::UNAUTHORIZED => {
                    return Err(AppError::auth(
                        "Invalid API token. Check your CLICKUP_API_TOKEN.",
                    ));
                }
                status => {
                    let body = response.text().unwrap_or_default();
                    let snippet: String = body.chars().take(200).collect();
                    tracing::warn!("API error {status}: {snippet}");
                    return Ok(None);
                }
            }
        }
    }
}

/// Server-requested wait from the Retry-After header.
fn retry_after(response: &Response) -> Duration {
    response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(DEFAULT_RETRY_AFTER, Duration::from_secs)
}
