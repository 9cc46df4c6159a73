// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;
use yare::parameterized;

#[test]
fn missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = SyncConfig::load(&dir.path().join("till.toml")).unwrap();

    assert_eq!(config, SyncConfig::default());
    assert_eq!(config.retry.base_backoff_ms, 1000);
    assert_eq!(config.retry.max_backoff_ms, 300_000);
    assert_eq!(config.retry.request_timeout_ms, 10_000);
    assert_eq!(config.sync.retry_interval_secs, 30);
    assert_eq!(config.remote.url, "ws://127.0.0.1:7890");
}

#[test]
fn partial_file_keeps_other_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("till.toml");
    fs::write(
        &path,
        r#"
[queue]
state_dir = "/tmp/till-state"

[retry]
max_attempts = 5
"#,
    )
    .unwrap();

    let config = SyncConfig::load(&path).unwrap();

    assert_eq!(config.state_dir(), PathBuf::from("/tmp/till-state"));
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.retry.jitter_ratio, 0.2);
    assert_eq!(config.remote, RemoteConfig::default());
}

#[test]
fn malformed_file_is_a_config_error() {
    let err = SyncConfig::parse("[retry\nbase_backoff_ms = ").unwrap_err();
    assert!(matches!(err, Error::Config(ref msg) if msg.starts_with("failed to parse config")));
}

#[parameterized(
    jitter_one = { "[retry]\njitter_ratio = 1.0", "jitter_ratio" },
    jitter_negative = { "[retry]\njitter_ratio = -0.1", "jitter_ratio" },
    zero_timeout = { "[retry]\nrequest_timeout_ms = 0", "request_timeout_ms" },
    base_above_max = { "[retry]\nbase_backoff_ms = 10\nmax_backoff_ms = 5", "base_backoff_ms" },
    zero_base = { "[retry]\nbase_backoff_ms = 0", "base_backoff_ms" },
    zero_connect_timeout = { "[remote]\nconnect_timeout_secs = 0", "connect_timeout_secs" },
    http_url = { "[remote]\nurl = \"http://example.com\"", "remote URL" },
    unparsable_url = { "[remote]\nurl = \"ws://host:port\"", "remote URL" },
)]
fn invalid_settings_are_rejected(toml: &str, needle: &str) {
    let err = SyncConfig::parse(toml).unwrap_err();
    assert!(err.to_string().contains(needle), "{err}");
}

#[test]
fn engine_options_treat_zero_as_unlimited() {
    let config = SyncConfig::default();
    let options = config.engine_options();

    assert_eq!(options.max_attempts, None);
    assert_eq!(options.max_age, None);
    assert_eq!(options.request_timeout, Duration::from_secs(10));
    assert_eq!(options.backoff, BackoffPolicy::default());
}

#[test]
fn engine_options_carry_limits() {
    let config = SyncConfig::parse("[retry]\nmax_attempts = 3\nmax_age_secs = 3600").unwrap();
    let options = config.engine_options();

    assert_eq!(options.max_attempts, Some(3));
    assert_eq!(options.max_age, Some(chrono::Duration::hours(1)));
}

#[test]
fn retry_interval_zero_disables_tick() {
    let config = SyncConfig::parse("[sync]\nretry_interval_secs = 0").unwrap();
    assert_eq!(config.retry_interval(), None);
    assert_eq!(
        SyncConfig::default().retry_interval(),
        Some(Duration::from_secs(30))
    );
}

#[test]
fn default_state_dir_ends_with_till() {
    let config = SyncConfig::default();
    let dir = config.state_dir();
    assert!(dir.ends_with("till") || dir.ends_with(".till"));
}

#[test]
fn to_toml_round_trips() {
    let config = SyncConfig::parse("[retry]\nmax_attempts = 2").unwrap();
    let text = config.to_toml().unwrap();
    assert_eq!(SyncConfig::parse(&text).unwrap(), config);
}

#[parameterized(
    empty_port = { "ws://example.com:/sync", "ws" },
    upper_case_scheme = { "WS://example.com", "ws" },
    secure = { "wss://example.com", "wss" },
)]
fn remote_urls_follow_url_syntax(raw: &str, scheme: &str) {
    let url = parse_remote_url(raw).unwrap();
    assert_eq!(url.scheme(), scheme);
    assert_eq!(url.host_str(), Some("example.com"));
}
