//! Integration tests for YAML configuration loading.

use neomesh::*;
use std::time::Duration;

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_empty_document_uses_defaults() {
    let config = NeomeshConfig::from_yaml_str("{}").unwrap();
    assert_eq!(config, NeomeshConfig::default());
}

#[test]
fn test_full_document() {
    let yaml = r#"
link:
  rx_buffer_size: 128
  tx_buffer_size: 40
  overflow: shift-oldest
session:
  password: "abcde"
  response_timeout_ms: 500
  restart_drain_responses: 1
"#;
    let config = NeomeshConfig::from_yaml_str(yaml).unwrap();

    assert_eq!(config.link.rx_buffer_size, 128);
    assert_eq!(config.link.tx_buffer_size, 40);
    assert_eq!(config.link.overflow, OverflowPolicy::ShiftOldest);
    assert_eq!(config.session.password.as_bytes(), b"abcde");
    assert_eq!(config.session.response_timeout(), Duration::from_millis(500));
    assert_eq!(config.session.restart_drain_responses, 1);
}

#[test]
fn test_partial_document_keeps_other_defaults() {
    let config = NeomeshConfig::from_yaml_str("session:\n  response_timeout_ms: 50\n").unwrap();

    assert_eq!(config.session.response_timeout_ms, 50);
    assert_eq!(config.session.password, Password::default());
    assert_eq!(config.link, LinkConfig::default());
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_wrong_password_length_rejected() {
    let result = NeomeshConfig::from_yaml_str("session:\n  password: \"toolongpassword\"\n");
    assert!(matches!(result, Err(ConfigError::Yaml(_))));
}

#[test]
fn test_tiny_tx_buffer_rejected() {
    let result = NeomeshConfig::from_yaml_str("link:\n  tx_buffer_size: 4\n");
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_zero_timeout_rejected() {
    let result = NeomeshConfig::from_yaml_str("session:\n  response_timeout_ms: 0\n");
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_unknown_overflow_policy_rejected() {
    let result = NeomeshConfig::from_yaml_str("link:\n  overflow: wrap\n");
    assert!(matches!(result, Err(ConfigError::Yaml(_))));
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_load_from_file() {
    let path = std::env::temp_dir().join(format!("neomesh-config-{}.yaml", std::process::id()));
    std::fs::write(&path, "link:\n  rx_buffer_size: 64\n").unwrap();

    let config = NeomeshConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.link.rx_buffer_size, 64);
}

#[test]
fn test_missing_file() {
    let result = NeomeshConfig::load("/nonexistent/neomesh.yaml");
    assert!(matches!(result, Err(ConfigError::Io(_))));
}
