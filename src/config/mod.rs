//! Configuration for the chat relay
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/wanderpal/config.toml)
//! 3. Built-in defaults (lowest priority)

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod observability;
mod serialization;
mod upstream;

#[cfg(test)]
mod tests;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (maintain public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use observability::{LogRotation, LoggingConfig};
pub use upstream::{FileTasks, FileUpstream, TaskConfig, UpstreamConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_BIND: &str = "127.0.0.1:8000";

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP API to
    pub bind_addr: SocketAddr,

    /// Flow service location, credentials and retry tuning
    pub upstream: UpstreamConfig,

    /// Task retention
    pub tasks: TaskConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            upstream: UpstreamConfig::default(),
            tasks: TaskConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub bind_addr: Option<String>,

    /// Optional [upstream] section
    pub upstream: Option<FileUpstream>,

    /// Optional [tasks] section
    pub tasks: Option<FileTasks>,

    /// Optional [logging] section
    pub logging: Option<LoggingConfig>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/wanderpal/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("wanderpal").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    /// Called during startup to help users discover configuration options
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Config is optional
            }
        }

        // Config::default().to_toml() is the single source of truth
        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Load configuration: env vars -> file -> defaults
    pub fn from_env() -> Result<Self> {
        let file = match Self::config_path() {
            Some(path) => load_file_config(&path)?,
            None => FileConfig::default(),
        };
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with an environment lookup
    pub(crate) fn from_sources(
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        // Bind address: env > file > default
        let bind_raw = env("WANDERPAL_BIND")
            .or(file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind_raw
            .parse()
            .with_context(|| format!("Invalid bind address: {bind_raw}"))?;

        // Upstream: file section first, then env overrides field by field
        let mut upstream = UpstreamConfig::from_file(file.upstream);
        if let Some(base) = env("WANDERPAL_UPSTREAM_BASE_URL") {
            upstream.base_url = base;
        }
        if let Some(run_url) = env("WANDERPAL_UPSTREAM_RUN_URL") {
            upstream.run_url = Some(run_url);
        }
        if let Some(flow_id) = env("WANDERPAL_FLOW_ID") {
            upstream.flow_id = Some(flow_id);
        }
        if let Some(token) = env("WANDERPAL_APPLICATION_TOKEN") {
            upstream.application_token = Some(token);
        }
        if let Some(raw) = env("WANDERPAL_MAX_RETRIES") {
            upstream.max_retries = parse_number("WANDERPAL_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = env("WANDERPAL_TIMEOUT_SECS") {
            upstream.timeout_secs = parse_number("WANDERPAL_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = env("WANDERPAL_ALLOW_ANONYMOUS") {
            upstream.allow_anonymous = parse_flag(&raw);
        }

        if upstream.timeout_secs == 0 {
            bail!("upstream timeout_secs must be greater than zero");
        }

        Ok(Self {
            bind_addr,
            upstream,
            tasks: TaskConfig::from_file(file.tasks),
            logging: file.logging.unwrap_or_default(),
        })
    }
}

/// Read and parse a config file; a missing file means defaults
///
/// A file that exists but does not parse is an error: a broken config should
/// fail fast, not silently fall back to defaults.
pub(crate) fn load_file_config(path: &Path) -> Result<FileConfig> {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).with_context(|| {
            format!(
                "Failed to parse {} (check quoting, true/false values and section names)",
                path.display()
            )
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(e) => Err(e).with_context(|| format!("Cannot read {}", path.display())),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{key}={raw} is not a valid number: {e}"))
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
