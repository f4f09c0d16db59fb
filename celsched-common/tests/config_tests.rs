//! Configuration resolution tests
//!
//! These tests set and clear process environment variables, so every test
//! touching the environment is marked `#[serial]`.

use celsched_common::config::{
    default_database_path, ConfigOverrides, ServerConfig, TomlConfig, DEFAULT_PORT, ENV_BIND,
    ENV_DB_PATH, ENV_FRONTEND_URL, ENV_JWT_SECRET, ENV_PORT,
};
use celsched_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn clear_env() {
    for name in [ENV_PORT, ENV_BIND, ENV_DB_PATH, ENV_JWT_SECRET, ENV_FRONTEND_URL] {
        env::remove_var(name);
    }
}

fn write_toml(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_missing_secret_is_config_error() {
    clear_env();
    let err = ServerConfig::resolve(ConfigOverrides::default()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
#[serial]
fn test_defaults_with_secret_from_env() {
    clear_env();
    env::set_var(ENV_JWT_SECRET, "s3cret");

    let config = ServerConfig::resolve(ConfigOverrides::default()).unwrap();
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.bind_address, "0.0.0.0");
    assert_eq!(config.database_path, default_database_path());
    assert_eq!(config.jwt_secret, "s3cret");
    assert_eq!(config.log_level, "info");
    assert!(config.frontend_url.is_none());

    clear_env();
}

#[test]
#[serial]
fn test_missing_toml_file_is_not_fatal() {
    clear_env();
    env::set_var(ENV_JWT_SECRET, "s3cret");

    let overrides = ConfigOverrides {
        config_file: Some(PathBuf::from("/nonexistent/celsched/config.toml")),
        ..ConfigOverrides::default()
    };
    let config = ServerConfig::resolve(overrides).unwrap();
    assert_eq!(config.port, DEFAULT_PORT);

    clear_env();
}

#[test]
#[serial]
fn test_toml_values_used_when_env_unset() {
    clear_env();
    let file = write_toml(
        r#"
        port = 9100
        bind_address = "127.0.0.1"
        database_path = "/tmp/celsched-test.db"
        jwt_secret = "from-toml"
        frontend_url = "http://localhost:3000"

        [logging]
        level = "debug"
        "#,
    );

    let overrides = ConfigOverrides {
        config_file: Some(file.path().to_path_buf()),
        ..ConfigOverrides::default()
    };
    let config = ServerConfig::resolve(overrides).unwrap();
    assert_eq!(config.port, 9100);
    assert_eq!(config.bind_address, "127.0.0.1");
    assert_eq!(config.database_path, PathBuf::from("/tmp/celsched-test.db"));
    assert_eq!(config.jwt_secret, "from-toml");
    assert_eq!(config.frontend_url.as_deref(), Some("http://localhost:3000"));
    assert_eq!(config.log_level, "debug");
}

#[test]
#[serial]
fn test_priority_cli_over_env_over_toml() {
    clear_env();
    let file = write_toml("port = 9100\njwt_secret = \"from-toml\"\n");
    env::set_var(ENV_PORT, "9200");
    env::set_var(ENV_JWT_SECRET, "from-env");

    let overrides = ConfigOverrides {
        config_file: Some(file.path().to_path_buf()),
        ..ConfigOverrides::default()
    };
    let config = ServerConfig::resolve(overrides.clone()).unwrap();
    assert_eq!(config.port, 9200);
    assert_eq!(config.jwt_secret, "from-env");

    let overrides = ConfigOverrides {
        port: Some(9300),
        ..overrides
    };
    let config = ServerConfig::resolve(overrides).unwrap();
    assert_eq!(config.port, 9300);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_port_env_is_rejected() {
    clear_env();
    env::set_var(ENV_JWT_SECRET, "s3cret");
    env::set_var(ENV_PORT, "not-a-port");

    let err = ServerConfig::resolve(ConfigOverrides::default()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    clear_env();
}

#[test]
fn test_malformed_toml_is_error() {
    let file = write_toml("port = \"eighty\"");
    let err = TomlConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_logging_level_defaults_to_info() {
    let file = write_toml("port = 1234\n");
    let config = TomlConfig::load(file.path()).unwrap();
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.port, Some(1234));
}
