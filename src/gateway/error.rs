//! Gateway error types

use thiserror::Error;

/// Failure below HTTP status level
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// Outcome of executing against a single candidate URL
#[derive(Debug, Clone, Error)]
pub enum ExecuteError {
    /// 502/503/504 or timeouts outlasted the retry budget
    #[error("upstream gateway unavailable after {attempts} attempt(s){}", status_suffix(.last_status))]
    GatewayUnavailable {
        attempts: u32,
        last_status: Option<u16>,
    },
    #[error("upstream returned HTTP {status}: {}", crate::util::preview(.body, 300))]
    HttpStatus { status: u16, body: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (last status {code})"),
        None => " (last attempt timed out)".to_string(),
    }
}

/// Failure of a whole gateway call; `Display` is shown to end users as-is
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error(
        "The travel assistant is not configured with an access token. \
         Set WANDERPAL_APPLICATION_TOKEN (or [upstream] application_token), \
         pass a token with the request, or enable allow_anonymous."
    )]
    MissingCredential,
    #[error(
        "The access token contains characters that cannot be sent in an HTTP header \
         (line breaks or control characters). Check WANDERPAL_APPLICATION_TOKEN \
         or the token passed with the request."
    )]
    InvalidCredential,
    #[error(
        "No upstream endpoint is configured. Set WANDERPAL_UPSTREAM_RUN_URL, \
         or WANDERPAL_UPSTREAM_BASE_URL together with WANDERPAL_FLOW_ID."
    )]
    NoEndpoint,
    #[error(
        "The travel assistant could not be reached after trying {candidates} endpoint(s). \
         Last error: {last_error}. Check the run URL / base URL and flow id, \
         and that the application token is valid."
    )]
    Exhausted { candidates: usize, last_error: String },
}
