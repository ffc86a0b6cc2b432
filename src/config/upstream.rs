//! Upstream flow service and task queue configuration
//!
//! The flow service can be addressed three ways: a full run URL copied from
//! the flow's API panel, a base URL plus flow id, or both. Everything else
//! tunes how hard we try before giving up.

use serde::Deserialize;

// ─────────────────────────────────────────────────────────────────────────────
// Upstream
// ─────────────────────────────────────────────────────────────────────────────

/// Where and how to call the flow-execution service
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Deployment base, e.g. `http://127.0.0.1:7860` or `https://host/lf/<tenant>`
    pub base_url: String,
    /// Explicit run URL; always tried first when set
    pub run_url: Option<String>,
    /// Flow identifier used to build the standard run routes
    pub flow_id: Option<String>,
    /// Process-wide application token (per-call tokens take precedence)
    pub application_token: Option<String>,
    /// Retries after the first attempt on 502/503/504 or timeout
    pub max_retries: u32,
    /// Timeout for the first attempt at each URL
    pub timeout_secs: u64,
    /// Backoff before the first retry; doubles per retry
    pub backoff_base_ms: u64,
    /// Ceiling for the per-attempt timeout as it grows across retries
    pub timeout_cap_secs: u64,
    /// Allow calls with no credential at all
    pub allow_anonymous: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7860".to_string(),
            run_url: None,
            flow_id: None,
            application_token: None,
            max_retries: 1,
            timeout_secs: 60,
            backoff_base_ms: 500,
            timeout_cap_secs: 120,
            allow_anonymous: false,
        }
    }
}

/// `[upstream]` section as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileUpstream {
    pub base_url: Option<String>,
    pub run_url: Option<String>,
    pub flow_id: Option<String>,
    pub application_token: Option<String>,
    pub max_retries: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub backoff_base_ms: Option<u64>,
    pub timeout_cap_secs: Option<u64>,
    pub allow_anonymous: Option<bool>,
}

impl UpstreamConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileUpstream>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            base_url: file.base_url.unwrap_or(defaults.base_url),
            run_url: file.run_url.filter(|s| !s.trim().is_empty()),
            flow_id: file.flow_id.filter(|s| !s.trim().is_empty()),
            application_token: file.application_token.filter(|s| !s.trim().is_empty()),
            max_retries: file.max_retries.unwrap_or(defaults.max_retries),
            timeout_secs: file.timeout_secs.unwrap_or(defaults.timeout_secs),
            backoff_base_ms: file.backoff_base_ms.unwrap_or(defaults.backoff_base_ms),
            timeout_cap_secs: file.timeout_cap_secs.unwrap_or(defaults.timeout_cap_secs),
            allow_anonymous: file.allow_anonymous.unwrap_or(defaults.allow_anonymous),
        }
    }

    /// Short description for startup logs (never includes the token)
    pub fn describe(&self) -> String {
        let target = match (&self.run_url, &self.flow_id) {
            (Some(run), _) => run.clone(),
            (None, Some(flow)) => format!("{} (flow {})", self.base_url, flow),
            (None, None) => self.base_url.clone(),
        };
        let auth = if self.application_token.is_some() {
            "token configured"
        } else if self.allow_anonymous {
            "anonymous allowed"
        } else {
            "per-call token required"
        };
        format!("{target}, {auth}, {} retr(y/ies)", self.max_retries)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Task queue
// ─────────────────────────────────────────────────────────────────────────────

/// Task retention. Finished tasks live for the process lifetime unless a
/// retention period is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig {
    /// Drop finished tasks older than this many seconds (None = keep forever)
    pub retention_secs: Option<u64>,
    /// How often the sweeper runs when retention is enabled
    pub sweep_interval_secs: u64,
}

impl TaskConfig {
    pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            retention_secs: None,
            sweep_interval_secs: Self::DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

/// `[tasks]` section as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileTasks {
    pub retention_secs: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
}

impl TaskConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileTasks>) -> Self {
        let file = file.unwrap_or_default();
        Self {
            retention_secs: file.retention_secs.filter(|secs| *secs > 0),
            sweep_interval_secs: file
                .sweep_interval_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(Self::DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}
