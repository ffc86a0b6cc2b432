//! Upstream gateway client: candidates × header encodings → extracted answer

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::auth::{AuthHeaders, HeaderSet, InvalidCredential};
use super::endpoints::resolve_candidates;
use super::error::{ExecuteError, GatewayError};
use super::executor::{
    ReqwestTransport, RequestExecutor, RetryPolicy, Sleeper, TokioSleeper, UpstreamTransport,
};
use super::extract::extract_text;
use crate::config::UpstreamConfig;

/// A chat message as accepted from callers
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Per-call credential; beats the configured application token
    #[serde(default)]
    pub token: Option<String>,
    /// Conversation/session id forwarded to the flow for memory
    #[serde(default)]
    pub session_id: Option<String>,
    /// Component overrides forwarded verbatim
    #[serde(default)]
    pub tweaks: Option<Map<String, Value>>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Wire body for the flow run endpoint
fn upstream_payload(request: &ChatRequest) -> Value {
    let mut payload = json!({
        "input_value": request.message,
        "output_type": "chat",
        "input_type": "chat",
    });
    if let Some(tweaks) = &request.tweaks {
        payload["tweaks"] = Value::Object(tweaks.clone());
    }
    if let Some(session_id) = request
        .session_id
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        payload["session_id"] = json!(session_id);
    }
    payload
}

/// What happened at one candidate URL
#[derive(Debug)]
enum CandidateOutcome {
    Answered { text: String, encoding: &'static str },
    /// 405: this URL shape does not accept POST runs
    WrongShape,
    Failed(String),
}

/// Calls the flow service; constructed once at startup and shared
pub struct GatewayClient {
    config: UpstreamConfig,
    executor: RequestExecutor,
}

impl GatewayClient {
    pub fn new(
        config: UpstreamConfig,
        transport: Arc<dyn UpstreamTransport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let policy = RetryPolicy {
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            timeout_cap: Duration::from_secs(config.timeout_cap_secs),
            ..RetryPolicy::default()
        };
        Self {
            executor: RequestExecutor::new(transport, sleeper, policy),
            config,
        }
    }

    /// Production wiring: reqwest transport and the tokio clock
    pub fn from_config(config: UpstreamConfig) -> anyhow::Result<Self> {
        let transport = Arc::new(ReqwestTransport::new()?);
        Ok(Self::new(config, transport, Arc::new(TokioSleeper)))
    }

    /// Run one chat message through the flow service
    pub async fn run(&self, request: &ChatRequest) -> Result<String, GatewayError> {
        let token = request
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or(self.config.application_token.as_deref());
        let auth = AuthHeaders::new(token).map_err(|_: InvalidCredential| {
            tracing::warn!("Rejecting chat call: access token is not a valid header value");
            GatewayError::InvalidCredential
        })?;

        if auth.is_anonymous() && !self.config.allow_anonymous {
            tracing::warn!("Rejecting chat call: no upstream credential and anonymous mode is off");
            return Err(GatewayError::MissingCredential);
        }

        let candidates = resolve_candidates(&self.config);
        if candidates.is_empty() {
            return Err(GatewayError::NoEndpoint);
        }

        let payload = upstream_payload(request);
        let timeout = Duration::from_secs(self.config.timeout_secs);

        tracing::debug!(
            candidates = candidates.len(),
            token_hash = auth.token_hash().as_deref().unwrap_or("anonymous"),
            "Starting upstream chat call"
        );

        let mut last_error: Option<String> = None;

        for url in &candidates {
            match self.try_candidate(url, &payload, &auth, timeout).await {
                CandidateOutcome::Answered { text, encoding } => {
                    tracing::info!(url = %url, encoding, "Upstream answered");
                    return Ok(text);
                }
                CandidateOutcome::WrongShape => {
                    tracing::debug!(url = %url, "Candidate rejected POST (405), trying next");
                }
                CandidateOutcome::Failed(reason) => {
                    tracing::warn!(url = %url, "Candidate failed: {}", reason);
                    last_error = Some(reason);
                }
            }
        }

        Err(GatewayError::Exhausted {
            candidates: candidates.len(),
            last_error: last_error
                .unwrap_or_else(|| "every endpoint answered 405 Method Not Allowed".to_string()),
        })
    }

    async fn try_candidate(
        &self,
        url: &str,
        payload: &Value,
        auth: &AuthHeaders,
        timeout: Duration,
    ) -> CandidateOutcome {
        let primary = auth.primary();
        match self.attempt(url, payload, &primary, timeout).await {
            Ok(outcome) => outcome,
            Err(ExecuteError::HttpStatus { status: 405, .. }) => CandidateOutcome::WrongShape,
            Err(ExecuteError::HttpStatus { status: 401, .. }) if !auth.is_anonymous() => {
                self.try_alternates(url, payload, auth, timeout).await
            }
            Err(err) => CandidateOutcome::Failed(format!("{url}: {err}")),
        }
    }

    /// After a 401, walk the alternate header encodings against the same URL
    async fn try_alternates(
        &self,
        url: &str,
        payload: &Value,
        auth: &AuthHeaders,
        timeout: Duration,
    ) -> CandidateOutcome {
        let mut last = String::from("HTTP 401");
        for set in auth.alternates() {
            tracing::debug!(url = %url, encoding = set.label, "Retrying with alternate auth header");
            match self.attempt(url, payload, &set, timeout).await {
                Ok(outcome) => return outcome,
                Err(err) => last = format!("{} with {}", err, set.label),
            }
        }
        CandidateOutcome::Failed(format!(
            "{url}: unauthorized with every auth header encoding (last: {last})"
        ))
    }

    async fn attempt(
        &self,
        url: &str,
        payload: &Value,
        set: &HeaderSet,
        timeout: Duration,
    ) -> Result<CandidateOutcome, ExecuteError> {
        let response = self
            .executor
            .execute(url, payload, &set.headers, timeout)
            .await?;
        if response.url != url {
            tracing::info!(from = %url, to = %response.url, "Answer came from a redirected URL");
        }
        tracing::debug!(status = response.status, encoding = set.label, "Upstream responded");
        Ok(CandidateOutcome::Answered {
            text: extract_text(&response.body),
            encoding: set.label,
        })
    }
}
