//! Configuration tests
//!
//! Round-trip guards for the generated template plus precedence checks for
//! the env > file > default layering.

use super::*;
use std::collections::HashMap;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

fn no_env() -> impl Fn(&str) -> Option<String> {
    |_| None
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip tests
// ─────────────────────────────────────────────────────────────────────────────

/// Verify that the generated template parses back into the file layer
#[test]
fn test_config_roundtrip_default() {
    let toml_str = Config::default().to_toml();

    let parsed: Result<FileConfig, _> = toml::from_str(&toml_str);
    assert!(
        parsed.is_ok(),
        "Default config should round-trip.\nTOML:\n{}\nError: {:?}",
        toml_str,
        parsed.err()
    );
}

#[test]
fn test_config_roundtrip_with_upstream_values() {
    let mut config = Config::default();
    config.upstream.run_url = Some("https://lf.example/api/v1/run/abcd-1234".to_string());
    config.upstream.flow_id = Some("abcd-1234".to_string());
    config.upstream.application_token = Some("AstraCS:secret".to_string());
    config.upstream.max_retries = 3;
    config.tasks.retention_secs = Some(600);

    let file: FileConfig = toml::from_str(&config.to_toml()).expect("template should parse");
    let reloaded = Config::from_sources(file, no_env()).expect("config should build");

    assert_eq!(reloaded.upstream.run_url, config.upstream.run_url);
    assert_eq!(reloaded.upstream.flow_id, config.upstream.flow_id);
    assert_eq!(
        reloaded.upstream.application_token.as_deref(),
        Some("AstraCS:secret")
    );
    assert_eq!(reloaded.upstream.max_retries, 3);
    assert_eq!(reloaded.tasks.retention_secs, Some(600));
}

#[test]
fn test_config_roundtrip_escapes_awkward_strings() {
    let mut config = Config::default();
    config.upstream.base_url = r#"http://host/"quoted"\path"#.to_string();
    config.upstream.application_token = Some("tok\"en\u{7}".to_string());
    config.logging.file_dir = std::path::PathBuf::from(r#"C:\logs\"travel""#);
    config.logging.file_prefix = "wander\"pal".to_string();

    let file: FileConfig = toml::from_str(&config.to_toml()).expect("template should parse");
    let reloaded = Config::from_sources(file, no_env()).expect("config should build");

    assert_eq!(reloaded.upstream.base_url, config.upstream.base_url);
    assert_eq!(
        reloaded.upstream.application_token,
        config.upstream.application_token
    );
    assert_eq!(reloaded.logging.file_dir, config.logging.file_dir);
    assert_eq!(reloaded.logging.file_prefix, "wander\"pal");
}

#[test]
fn test_redacted_output_hides_token() {
    let mut config = Config::default();
    config.upstream.application_token = Some("AstraCS:secret".to_string());

    let shown = config.to_toml_redacted();
    assert!(!shown.contains("AstraCS:secret"));
    assert!(shown.contains("application_token = \"********\""));
}

// ─────────────────────────────────────────────────────────────────────────────
// Precedence
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_defaults_without_file_or_env() {
    let config = Config::from_sources(FileConfig::default(), no_env()).unwrap();

    assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8000");
    assert_eq!(config.upstream.base_url, "http://127.0.0.1:7860");
    assert_eq!(config.upstream.max_retries, 1);
    assert_eq!(config.upstream.timeout_cap_secs, 120);
    assert!(!config.upstream.allow_anonymous);
    assert_eq!(config.tasks.retention_secs, None);
    assert_eq!(config.logging.file_rotation, LogRotation::Daily);
}

#[test]
fn test_env_overrides_file() {
    let file: FileConfig = toml::from_str(
        r#"
bind_addr = "0.0.0.0:9000"

[upstream]
base_url = "http://file-base"
flow_id = "file-flow-id"
max_retries = 4
"#,
    )
    .unwrap();

    let env = env_from(&[
        ("WANDERPAL_BIND", "127.0.0.1:7000"),
        ("WANDERPAL_FLOW_ID", "env-flow-id"),
        ("WANDERPAL_APPLICATION_TOKEN", "env-token"),
        ("WANDERPAL_ALLOW_ANONYMOUS", "true"),
        ("WANDERPAL_MAX_RETRIES", "  "),
    ]);
    let config = Config::from_sources(file, env).unwrap();

    assert_eq!(config.bind_addr.to_string(), "127.0.0.1:7000");
    assert_eq!(config.upstream.base_url, "http://file-base");
    assert_eq!(config.upstream.flow_id.as_deref(), Some("env-flow-id"));
    assert_eq!(config.upstream.application_token.as_deref(), Some("env-token"));
    assert!(config.upstream.allow_anonymous);
    // Blank env values do not override the file
    assert_eq!(config.upstream.max_retries, 4);
}

#[test]
fn test_invalid_env_number_is_an_error() {
    let env = env_from(&[("WANDERPAL_MAX_RETRIES", "many")]);
    let err = Config::from_sources(FileConfig::default(), env).unwrap_err();
    assert!(err.to_string().contains("WANDERPAL_MAX_RETRIES"));
}

#[test]
fn test_invalid_bind_is_an_error() {
    let env = env_from(&[("WANDERPAL_BIND", "not-an-address")]);
    assert!(Config::from_sources(FileConfig::default(), env).is_err());
}

#[test]
fn test_blank_file_values_are_treated_as_unset() {
    let file: FileConfig = toml::from_str(
        r#"
[upstream]
run_url = ""
application_token = " "
"#,
    )
    .unwrap();
    let config = Config::from_sources(file, no_env()).unwrap();
    assert_eq!(config.upstream.run_url, None);
    assert_eq!(config.upstream.application_token, None);
}

// ─────────────────────────────────────────────────────────────────────────────
// File loading
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_missing_file_means_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let file = load_file_config(&dir.path().join("absent.toml")).unwrap();
    assert!(file.upstream.is_none());
}

#[test]
fn test_broken_file_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[upstream\nbase_url = ").unwrap();

    let err = load_file_config(&path).unwrap_err();
    assert!(err.to_string().contains("config.toml"));
}

#[test]
fn test_log_rotation_parsing() {
    assert_eq!(LogRotation::parse("Hourly"), LogRotation::Hourly);
    assert_eq!(LogRotation::parse("never"), LogRotation::Never);
    assert_eq!(LogRotation::parse("weekly"), LogRotation::Daily);
}

#[test]
fn test_zero_retention_disables_sweeping() {
    let file: FileConfig = toml::from_str("[tasks]\nretention_secs = 0\n").unwrap();
    let config = Config::from_sources(file, no_env()).unwrap();
    assert_eq!(config.tasks.retention_secs, None);
    assert_eq!(
        config.tasks.sweep_interval_secs,
        TaskConfig::DEFAULT_SWEEP_INTERVAL_SECS
    );
}

#[test]
fn test_partial_logging_section_keeps_defaults() {
    let file: FileConfig =
        toml::from_str("[logging]\nfile_enabled = true\nfile_rotation = \"HOURLY\"\n").unwrap();
    let config = Config::from_sources(file, no_env()).unwrap();

    assert!(config.logging.file_enabled);
    assert_eq!(config.logging.file_rotation, LogRotation::Hourly);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.file_prefix, "wanderpal");
}
