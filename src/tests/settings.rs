use std::path::{Path, PathBuf};

use crate::settings::{load_settings, Config, DEFAULT_SETTINGS_PATH};

#[test]
fn test_partial_yaml_keeps_defaults() {
    let config: Config = serde_yaml::from_str("probe:\n  auth_timeout_secs: 5\n").unwrap();
    assert_eq!(config.probe.auth_timeout_secs, 5);
    assert_eq!(config.probe.connect_timeout_secs, 15);
    assert!(config.probe.accept_invalid_certs);
    assert_eq!(config.server.port, 3001);
    assert_eq!(config.onboarding.output_dir, PathBuf::from("onboarding_output"));
}

#[test]
fn test_shipped_settings_file_parses() {
    let config = load_settings(Path::new(DEFAULT_SETTINGS_PATH)).unwrap();
    assert_eq!(config.probe.connect_timeout_secs, 15);
    assert_eq!(config.probe.auth_timeout_secs, 10);
    assert_eq!(config.server.body_limit_bytes, 1024 * 1024);
}

#[test]
fn test_missing_settings_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_settings(&dir.path().join("absent.yaml")).unwrap();
    assert_eq!(config.probe.auth_timeout_secs, 10);
}

#[test]
fn test_malformed_settings_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, "server: [not, a, map").unwrap();
    assert!(load_settings(&path).is_err());
}

#[test]
fn test_environment_overrides() {
    let mut config = Config::default();
    config.apply_overrides(Some("/srv/dom/output".to_string()), Some("8080".to_string()));
    assert_eq!(config.onboarding.output_dir, PathBuf::from("/srv/dom/output"));
    assert_eq!(config.server.port, 8080);

    config.apply_overrides(Some("  ".to_string()), Some("not-a-port".to_string()));
    assert_eq!(config.onboarding.output_dir, PathBuf::from("/srv/dom/output"));
    assert_eq!(config.server.port, 8080);
}
