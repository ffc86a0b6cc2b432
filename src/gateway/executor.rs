//! Single-URL request execution with redirects and transient retries
//!
//! ```text
//! execute(url)
//!     ↓
//! POST (redirects disabled at transport level)
//!     ↓
//! 3xx + Location? → resolve, re-POST once with the same headers
//!     ↓
//! 502/503/504 or timeout? → sleep 0.5s × 2^n, grow timeout ×1.5, retry
//!     ↓
//! 2xx → JSON body, or raw text if it does not parse
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::Url;
use serde_json::Value;

use super::error::{ExecuteError, TransportError};

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

/// What the executor needs back from one POST
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: String,
}

/// One POST against one URL. Implementations must not follow redirects.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        payload: &Value,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport with redirect following turned off, so the
/// executor can re-send Authorization across redirects itself
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(10)
            .build()
            .context("Failed to create upstream HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamTransport for ReqwestTransport {
    async fn post(
        &self,
        url: &str,
        payload: &Value,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .post(url)
            .headers(headers.clone())
            .json(payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().await.map_err(TransportError::from_reqwest)?;

        Ok(RawResponse {
            status,
            location,
            body,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backoff clock
// ─────────────────────────────────────────────────────────────────────────────

/// Backoff pauses go through this so tests can record them instead of waiting
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Retry policy
// ─────────────────────────────────────────────────────────────────────────────

/// Retry/backoff knobs; defaults match what the flow service tolerates in practice
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt (so total attempts = max_retries + 1)
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each subsequent retry
    pub backoff_base: Duration,
    /// Per-retry multiplier applied to the attempt timeout
    pub timeout_growth: f64,
    /// Upper bound for the grown timeout
    pub timeout_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff_base: Duration::from_millis(500),
            timeout_growth: 1.5,
            timeout_cap: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): base × 2^retry
    pub fn backoff(&self, retry: u32) -> Duration {
        self.backoff_base.saturating_mul(1_u32 << retry.min(16))
    }

    /// Timeout for attempt number `attempt` (0 = first try)
    pub fn attempt_timeout(&self, initial: Duration, attempt: u32) -> Duration {
        if attempt == 0 {
            return initial;
        }
        let grown = initial.as_secs_f64() * self.timeout_growth.powi(attempt as i32);
        let capped = grown.min(self.timeout_cap.as_secs_f64());
        // The cap limits growth only; a retry never gets less time than the first try
        Duration::from_secs_f64(capped).max(initial)
    }
}

/// 502/503/504 are the only statuses worth waiting out
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 502..=504)
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

// ─────────────────────────────────────────────────────────────────────────────
// Executor
// ─────────────────────────────────────────────────────────────────────────────

/// Successful response body: parsed JSON, or the raw text when it is not JSON
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    /// URL that finally answered (differs from the request URL after a redirect)
    pub url: String,
    pub body: ResponseBody,
}

#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn UpstreamTransport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(
        transport: Arc<dyn UpstreamTransport>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    /// POST `payload` to `url`, retrying transient failures
    pub async fn execute(
        &self,
        url: &str,
        payload: &Value,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<UpstreamResponse, ExecuteError> {
        let max_retries = self.policy.max_retries;
        let mut last_status: Option<u16> = None;

        for attempt in 0..=max_retries {
            let attempt_timeout = self.policy.attempt_timeout(timeout, attempt);

            let transient = match self
                .post_following_redirect(url, payload, headers, attempt_timeout)
                .await
            {
                Ok((final_url, raw)) if (200..300).contains(&raw.status) => {
                    return Ok(UpstreamResponse {
                        status: raw.status,
                        url: final_url,
                        body: parse_body(raw.body),
                    });
                }
                Ok((_, raw)) if is_transient_status(raw.status) => {
                    last_status = Some(raw.status);
                    format!("status {}", raw.status)
                }
                Ok((_, raw)) => {
                    return Err(ExecuteError::HttpStatus {
                        status: raw.status,
                        body: raw.body,
                    });
                }
                Err(TransportError::Timeout(msg)) => {
                    last_status = None;
                    format!("timeout after {:.1}s: {}", attempt_timeout.as_secs_f64(), msg)
                }
                Err(err) => return Err(ExecuteError::Transport(err)),
            };

            if attempt < max_retries {
                let delay = self.policy.backoff(attempt);
                tracing::warn!(
                    url = %url,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Transient upstream failure ({}), retrying",
                    transient
                );
                self.sleeper.sleep(delay).await;
            } else {
                tracing::warn!(url = %url, attempts = attempt + 1, "Retry budget exhausted ({})", transient);
            }
        }

        Err(ExecuteError::GatewayUnavailable {
            attempts: max_retries + 1,
            last_status,
        })
    }

    /// One POST, plus a single manual re-POST if the upstream redirects
    async fn post_following_redirect(
        &self,
        url: &str,
        payload: &Value,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<(String, RawResponse), TransportError> {
        let raw = self.transport.post(url, payload, headers, timeout).await?;

        if !is_redirect(raw.status) {
            return Ok((url.to_string(), raw));
        }
        let Some(location) = raw.location.as_deref() else {
            return Ok((url.to_string(), raw));
        };

        let target = resolve_location(url, location)?;
        tracing::debug!(from = %url, to = %target, status = raw.status, "Following upstream redirect");

        let redirected = self.transport.post(&target, payload, headers, timeout).await?;
        Ok((target, redirected))
    }
}

fn resolve_location(base: &str, location: &str) -> Result<String, TransportError> {
    let base = Url::parse(base)
        .map_err(|e| TransportError::Other(format!("invalid request URL {base}: {e}")))?;
    base.join(location)
        .map(|u| u.to_string())
        .map_err(|e| TransportError::Other(format!("invalid redirect location {location}: {e}")))
}

fn parse_body(body: String) -> ResponseBody {
    match serde_json::from_str::<Value>(&body) {
        Ok(json) => ResponseBody::Json(json),
        Err(_) => ResponseBody::Text(body),
    }
}
