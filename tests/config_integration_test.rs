//! Integration tests for configuration loading and validation
//!
//! Note: Tests that modify environment variables should be run with --test-threads=1
//! to avoid interference between tests.

use kinsync::config::{load_config, RetryOn};
use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    std::env::remove_var("KINSYNC_APPLICATION_LOG_LEVEL");
    std::env::remove_var("KINSYNC_KINTONE_SUBDOMAIN");
    std::env::remove_var("KINSYNC_KINTONE_PASSWORD");
    std::env::remove_var("KINSYNC_BULK_MAX_CONCURRENT");
    std::env::remove_var("KINSYNC_BULK_RETRY_ON");
    std::env::remove_var("TEST_KINTONE_PASSWORD");
}

fn write_config(toml_content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(toml_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let temp_file = write_config(
        r#"
[application]
log_level = "debug"

[kintone]
base_url = "https://records.example.com/"
username = "sync-user"
password = "sync-pass"
basic_auth_user = "proxy"
basic_auth_password = "proxy-pass"
timeout_seconds = 120

[bulk]
max_concurrent = 4
max_retries = 5
retry_interval_ms = 250
retry_on = "transport"
write_chunk_size = 50
read_page_size = 200

[logging]
local_enabled = false
local_path = "/tmp/kinsync"
local_rotation = "hourly"
console_json = true
"#,
    );

    let config = load_config(temp_file.path()).expect("Failed to load config");

    assert_eq!(config.application.log_level, "debug");

    assert_eq!(config.kintone.endpoint_base(), "https://records.example.com");
    assert_eq!(config.kintone.username, "sync-user");
    assert_eq!(config.kintone.password.expose_secret().as_str(), "sync-pass");
    assert_eq!(config.kintone.basic_auth_user.as_deref(), Some("proxy"));
    assert_eq!(config.kintone.timeout_seconds, 120);

    assert_eq!(config.bulk.max_concurrent, 4);
    assert_eq!(config.bulk.max_retries, 5);
    assert_eq!(config.bulk.retry_interval_ms, 250);
    assert_eq!(config.bulk.retry_on, RetryOn::TransportOnly);
    assert_eq!(config.bulk.write_chunk_size, 50);
    assert_eq!(config.bulk.read_page_size, 200);

    assert!(!config.logging.local_enabled);
    assert_eq!(config.logging.local_path, "/tmp/kinsync");
    assert_eq!(config.logging.local_rotation, "hourly");
    assert!(config.logging.console_json);
}

#[test]
fn test_load_minimal_config_with_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let temp_file = write_config(
        r#"
[kintone]
subdomain = "example"
username = "user"
password = "pass"
"#,
    );

    let config = load_config(temp_file.path()).expect("Failed to load config");

    assert_eq!(config.application.log_level, "info");
    assert_eq!(config.kintone.endpoint_base(), "https://example.cybozu.com");
    assert_eq!(config.kintone.timeout_seconds, 610);
    assert_eq!(config.bulk.max_concurrent, 1);
    assert_eq!(config.bulk.max_retries, 3);
    assert_eq!(config.bulk.retry_interval_ms, 10_000);
    assert_eq!(config.bulk.retry_on, RetryOn::AnyError);
    assert_eq!(config.bulk.write_chunk_size, 100);
    assert_eq!(config.bulk.read_page_size, 500);
    assert!(!config.logging.local_enabled);
}

#[test]
fn test_env_var_substitution() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("TEST_KINTONE_PASSWORD", "secret_pass");

    let temp_file = write_config(
        r#"
[kintone]
subdomain = "example"
username = "user"
password = "${TEST_KINTONE_PASSWORD}"
"#,
    );

    let config = load_config(temp_file.path()).expect("Failed to load config");

    assert_eq!(config.kintone.password.expose_secret().as_str(), "secret_pass");

    std::env::remove_var("TEST_KINTONE_PASSWORD");
}

#[test]
fn test_missing_substitution_variable_fails() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let temp_file = write_config(
        r#"
[kintone]
subdomain = "example"
username = "user"
password = "${TEST_KINTONE_PASSWORD}"
"#,
    );

    let err = load_config(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("TEST_KINTONE_PASSWORD"));
}

#[test]
fn test_env_var_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("KINSYNC_APPLICATION_LOG_LEVEL", "trace");
    std::env::set_var("KINSYNC_KINTONE_SUBDOMAIN", "other");
    std::env::set_var("KINSYNC_BULK_MAX_CONCURRENT", "8");
    std::env::set_var("KINSYNC_BULK_RETRY_ON", "transport");

    let temp_file = write_config(
        r#"
[application]
log_level = "info"

[kintone]
subdomain = "example"
username = "user"
password = "pass"

[bulk]
max_concurrent = 2
"#,
    );

    let config = load_config(temp_file.path()).expect("Failed to load config");

    assert_eq!(config.application.log_level, "trace");
    assert_eq!(config.kintone.endpoint_base(), "https://other.cybozu.com");
    assert_eq!(config.bulk.max_concurrent, 8);
    assert_eq!(config.bulk.retry_on, RetryOn::TransportOnly);

    cleanup_env_vars();
}

#[test]
fn test_invalid_config_validation() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let invalid = [
        // bad log level
        r#"
[application]
log_level = "invalid_level"

[kintone]
subdomain = "example"
username = "user"
password = "pass"
"#,
        // no endpoint
        r#"
[kintone]
username = "user"
password = "pass"
"#,
        // chunk above the store limit
        r#"
[kintone]
subdomain = "example"
username = "user"
password = "pass"

[bulk]
write_chunk_size = 101
"#,
        // basic auth user without password
        r#"
[kintone]
subdomain = "example"
username = "user"
password = "pass"
basic_auth_user = "proxy"
"#,
    ];

    for toml_content in invalid {
        let temp_file = write_config(toml_content);
        assert!(
            load_config(temp_file.path()).is_err(),
            "accepted invalid config:\n{toml_content}"
        );
    }
}
