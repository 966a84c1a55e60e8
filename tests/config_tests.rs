// Layered configuration tests
// Author: kelexine (https://github.com/kelexine)

use eventforge::config::AppConfig;
use eventforge::error::EventForgeError;
use eventforge::policy::CostMode;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_missing_file_uses_defaults() {
    let config = AppConfig::load_from(Path::new("/nonexistent/eventforge/config.toml")).unwrap();
    assert_eq!(config.cache.capacity, 100);
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.default_mode().unwrap(), CostMode::Balanced);
    assert_eq!(config.logging.format, "pretty");
}

#[test]
fn test_file_overrides_defaults() {
    let file = write_config(
        r#"
[cache]
capacity = 10
ttl_seconds = 60

[retry]
base_delay_ms = 250

[generation]
default_mode = "Economy"
mode_in_cache_key = true
"#,
    );

    let config = AppConfig::load_from(file.path()).unwrap();
    assert_eq!(config.cache_config().capacity, 10);
    assert_eq!(config.cache_config().ttl, Duration::from_secs(60));
    assert_eq!(config.retry_policy().base_delay, Duration::from_millis(250));
    // Unspecified fields in a present section keep their defaults
    assert_eq!(config.retry_policy().max_delay, Duration::from_secs(30));
    assert_eq!(config.default_mode().unwrap(), CostMode::Economy);
    assert!(config.key_policy().include_cost_mode);
}

#[test]
fn test_unknown_default_mode_fails_at_load() {
    let file = write_config(
        r#"
[generation]
default_mode = "luxury"
"#,
    );

    match AppConfig::load_from(file.path()) {
        Err(EventForgeError::InvalidMode(mode)) => assert_eq!(mode, "luxury"),
        other => panic!("expected InvalidMode, got {:?}", other.map(|c| c.generation)),
    }
}

#[test]
fn test_environment_overrides_file() {
    let file = write_config(
        r#"
[server]
port = 9000
"#,
    );

    std::env::set_var("EVENTFORGE__SERVER__PORT", "9191");
    let config = AppConfig::load_from(file.path());
    std::env::remove_var("EVENTFORGE__SERVER__PORT");

    assert_eq!(config.unwrap().server.port, 9191);
}

#[test]
fn test_nan_jitter_ratio_disables_jitter() {
    let file = write_config(
        r#"
[retry]
jitter_ratio = nan
"#,
    );

    let config = AppConfig::load_from(file.path()).unwrap();
    assert!(config.retry.jitter_ratio.is_nan());
    assert_eq!(config.retry_policy().jitter_ratio, 0.0);
}
