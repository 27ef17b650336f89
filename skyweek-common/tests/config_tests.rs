//! Configuration loading and resolution tests
//!
//! Tests that manipulate SKYWEEK_* environment variables are marked #[serial]
//! so they never race each other.

use serial_test::serial;
use skyweek_common::config::{
    load_or_default, load_toml_config, resolve_api_key, resolve_root_folder, write_toml_config,
    StoreBackend, TomlConfig, DEFAULT_PORT,
};
use skyweek_common::WeekStart;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_defaults_when_sections_missing() {
    let config: TomlConfig = toml::from_str("").unwrap();

    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.store.backend, StoreBackend::Sqlite);
    assert_eq!(config.generation.requests_per_minute, 30);
    assert_eq!(config.content.cache_ttl_days, 7);
    assert_eq!(config.content.remote_timeout_secs, 20);
    assert_eq!(config.content.week_starts_on, WeekStart::Monday);
}

#[test]
fn test_parses_full_config() {
    let config: TomlConfig = toml::from_str(
        r#"
        root_folder = "/srv/skyweek"
        port = 6000

        [logging]
        level = "debug"

        [store]
        backend = "http"
        base_url = "https://store.example.com"

        [generation]
        base_url = "https://ai.example.com/v1"
        model = "small-model"

        [content]
        week_starts_on = "sunday"
        remote_timeout_secs = 12
        "#,
    )
    .unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/skyweek")));
    assert_eq!(config.port, 6000);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.store.backend, StoreBackend::Http);
    assert_eq!(config.generation.model, "small-model");
    assert_eq!(config.content.week_starts_on, WeekStart::Sunday);
    assert_eq!(config.content.remote_timeout_secs, 12);
    assert_eq!(config.content.cache_ttl_days, 7);
}

#[test]
fn test_write_then_load_preserves_values() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.toml");

    let mut config = TomlConfig::default();
    config.port = 7001;
    config.store.api_key = Some("secret".to_string());

    write_toml_config(&config, &path).unwrap();
    let loaded = load_toml_config(&path).unwrap();

    assert_eq!(loaded.port, 7001);
    assert_eq!(loaded.store.api_key.as_deref(), Some("secret"));
    assert!(!path.with_extension("toml.tmp").exists());
}

#[test]
fn test_invalid_toml_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(err.to_string().contains("Parse TOML failed"));
}

#[test]
fn test_explicit_missing_path_is_error() {
    let result = load_or_default(Some(Path::new("/definitely/not/here.toml")));
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_root_folder_cli_beats_env() {
    env::set_var("SKYWEEK_ROOT_FOLDER", "/tmp/from-env");
    let config = TomlConfig::default();

    let root = resolve_root_folder(Some(Path::new("/tmp/from-cli")), "SKYWEEK_ROOT_FOLDER", &config);
    assert_eq!(root, PathBuf::from("/tmp/from-cli"));

    env::remove_var("SKYWEEK_ROOT_FOLDER");
}

#[test]
#[serial]
fn test_root_folder_env_beats_toml() {
    env::set_var("SKYWEEK_ROOT_FOLDER", "/tmp/from-env");
    let mut config = TomlConfig::default();
    config.root_folder = Some(PathBuf::from("/tmp/from-toml"));

    let root = resolve_root_folder(None, "SKYWEEK_ROOT_FOLDER", &config);
    assert_eq!(root, PathBuf::from("/tmp/from-env"));

    env::remove_var("SKYWEEK_ROOT_FOLDER");
    let root = resolve_root_folder(None, "SKYWEEK_ROOT_FOLDER", &config);
    assert_eq!(root, PathBuf::from("/tmp/from-toml"));
}

#[test]
#[serial]
fn test_api_key_env_wins_over_toml() {
    env::set_var("SKYWEEK_TEST_API_KEY", "env-key");
    let key = resolve_api_key("Test", "SKYWEEK_TEST_API_KEY", Some("toml-key")).unwrap();
    assert_eq!(key, "env-key");
    env::remove_var("SKYWEEK_TEST_API_KEY");
}

#[test]
#[serial]
fn test_api_key_whitespace_is_ignored() {
    env::set_var("SKYWEEK_TEST_API_KEY", "   ");
    let key = resolve_api_key("Test", "SKYWEEK_TEST_API_KEY", Some("toml-key")).unwrap();
    assert_eq!(key, "toml-key");

    let err = resolve_api_key("Test", "SKYWEEK_TEST_API_KEY", None).unwrap_err();
    assert!(err.to_string().contains("SKYWEEK_TEST_API_KEY"));
    env::remove_var("SKYWEEK_TEST_API_KEY");
}
