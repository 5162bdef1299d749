//! 設定ファイルと環境変数からのプール構成

use easytts::config::{ConfigFile, PoolConfig};
use serial_test::serial;
use std::time::Duration;

const ENV_VARS: [&str; 6] = [
    "EASYTTS_STUDIO_TOKEN",
    "EASYTTS_TOKEN",
    "EASYTTS_BASE_URL",
    "EASYTTS_STATUS_TIMEOUT_SECS",
    "EASYTTS_TRUST_ENV",
    "EASYTTS_FN_INDEX",
];

fn clear_env() {
    for name in ENV_VARS {
        std::env::remove_var(name);
    }
}

#[test]
#[serial]
fn file_takes_precedence_over_env() {
    clear_env();
    std::env::set_var("EASYTTS_STUDIO_TOKEN", "from-env");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[easytts]
sse_timeout = 60

[[easytts.endpoints]]
name = "primary"
base_url = "https://a.example.com/"
studio_token = "file-token"

[[easytts.endpoints]]
base_url = "https://b.example.com"
studio_token = "file-token-2"
fn_index = 5
"#,
    )
    .unwrap();

    let config = ConfigFile::load_or_env(Some(&path)).unwrap();
    let pool = PoolConfig::from_section(&config.easytts).unwrap();
    assert_eq!(pool.endpoints.len(), 2);
    assert_eq!(pool.endpoints[0].base_url, "https://a.example.com");
    assert_eq!(pool.endpoints[1].name, "endpoint-1");
    assert_eq!(pool.endpoints[1].fn_index, 5);
    assert_eq!(pool.timeouts.sse, Duration::from_secs(60));
    assert_eq!(pool.timeouts.status, Duration::from_secs(3));
    clear_env();
}

#[test]
#[serial]
fn env_only_configuration() {
    clear_env();
    std::env::set_var("EASYTTS_STUDIO_TOKEN", "secret");
    std::env::set_var("EASYTTS_BASE_URL", "https://studio.example.com/");
    std::env::set_var("EASYTTS_STATUS_TIMEOUT_SECS", "7");
    std::env::set_var("EASYTTS_TRUST_ENV", "true");

    let missing = tempfile::tempdir().unwrap().path().join("absent.toml");
    let config = ConfigFile::load_or_env(Some(&missing)).unwrap();
    let pool = PoolConfig::from_section(&config.easytts).unwrap();

    assert_eq!(pool.endpoints.len(), 1);
    assert_eq!(pool.endpoints[0].base_url, "https://studio.example.com");
    assert_eq!(pool.endpoints[0].fn_index, 3);
    assert_eq!(pool.endpoints[0].trigger_id, 19);
    assert_eq!(pool.timeouts.status, Duration::from_secs(7));
    assert!(pool.trust_env);
    clear_env();
}

#[test]
#[serial]
fn env_without_token_is_configuration_error() {
    clear_env();
    let missing = tempfile::tempdir().unwrap().path().join("absent.toml");
    let err = ConfigFile::load_or_env(Some(&missing)).unwrap_err();
    assert!(err.is_configuration());
    assert!(!err.is_retryable());
}

#[test]
fn endpoint_debug_hides_token() {
    let config = ConfigFile::parse(
        r#"
[[easytts.endpoints]]
name = "a"
base_url = "https://a"
studio_token = "very-secret-token-value"
"#,
    )
    .unwrap();
    let pool = PoolConfig::from_section(&config.easytts).unwrap();
    let debug = format!("{:?}", pool);
    assert!(!debug.contains("very-secret-token-value"));
}

#[test]
fn config_debug_hides_token() {
    let config = ConfigFile::parse(
        r#"
[[easytts.endpoints]]
base_url = "https://a"
studio_token = "another-secret-token"
"#,
    )
    .unwrap();
    assert!(!format!("{:?}", config).contains("another-secret-token"));
}
