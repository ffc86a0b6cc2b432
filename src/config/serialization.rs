//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Serialize config to a commented TOML document
    pub fn to_toml(&self) -> String {
        self.render(self.upstream.application_token.as_deref())
    }

    /// Same as [`to_toml`](Self::to_toml) with the token masked, for display
    pub fn to_toml_redacted(&self) -> String {
        self.render(self.upstream.application_token.as_ref().map(|_| "********"))
    }

    fn render(&self, token: Option<&str>) -> String {
        let up = &self.upstream;
        format!(
            r#"# wanderpal configuration

# HTTP API bind address
bind_addr = {bind}

# Upstream flow-execution service
[upstream]
# Deployment base URL (self-hosted Langflow listens on 7860)
base_url = {base_url}
{run_url}
{flow_id}
{token}
# Retries after the first attempt on 502/503/504 or timeout
max_retries = {max_retries}
# Timeout for the first attempt; grows x1.5 per retry up to timeout_cap_secs
timeout_secs = {timeout_secs}
timeout_cap_secs = {timeout_cap_secs}
# Backoff before the first retry; doubles per retry
backoff_base_ms = {backoff_base_ms}
# Accept chat calls with no credential at all
allow_anonymous = {allow_anonymous}

# In-memory task queue
[tasks]
{retention}
sweep_interval_secs = {sweep}

# Logging configuration (RUST_LOG env var overrides)
[logging]
level = {log_level}
# JSON file logging (in addition to stdout)
file_enabled = {log_file_enabled}
file_dir = {log_file_dir}
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = {log_file_prefix}
"#,
            bind = quoted(&self.bind_addr.to_string()),
            base_url = quoted(&up.base_url),
            run_url = optional_line(
                "run_url",
                up.run_url.as_deref(),
                "Full run URL copied from the flow's API panel (tried first)",
            ),
            flow_id = optional_line("flow_id", up.flow_id.as_deref(), "Flow identifier"),
            token = optional_line(
                "application_token",
                token,
                "Application token (prefer WANDERPAL_APPLICATION_TOKEN)",
            ),
            max_retries = up.max_retries,
            timeout_secs = up.timeout_secs,
            timeout_cap_secs = up.timeout_cap_secs,
            backoff_base_ms = up.backoff_base_ms,
            allow_anonymous = up.allow_anonymous,
            retention = match self.tasks.retention_secs {
                Some(secs) => format!("retention_secs = {secs}"),
                None => "# Drop finished tasks after this many seconds (unset = keep)\n# retention_secs = 3600".to_string(),
            },
            sweep = self.tasks.sweep_interval_secs,
            log_level = quoted(&self.logging.level),
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = quoted(&self.logging.file_dir.display().to_string()),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = quoted(&self.logging.file_prefix),
        )
    }
}

/// `key = "value"`, or a commented example when unset
fn optional_line(key: &str, value: Option<&str>, comment: &str) -> String {
    match value {
        Some(v) => format!("# {comment}\n{key} = {}", quoted(v)),
        None => format!("# {comment}\n# {key} = \"\""),
    }
}

/// TOML string literal with any quotes or control characters escaped
fn quoted(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}
