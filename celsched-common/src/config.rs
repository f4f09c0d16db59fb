//! Configuration loading
//!
//! Each setting is resolved in priority order:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing TOML file is not fatal: a warning is logged and resolution
//! continues with the remaining sources. The JWT secret has no default.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

pub const ENV_PORT: &str = "PORT";
pub const ENV_BIND: &str = "CELSCHED_BIND";
pub const ENV_DB_PATH: &str = "CELSCHED_DB_PATH";
pub const ENV_JWT_SECRET: &str = "JWT_SECRET";
pub const ENV_FRONTEND_URL: &str = "FRONTEND_URL";

/// Contents of the optional TOML config file
///
/// Every key is optional; absent keys fall through to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub bind_address: Option<String>,

    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Extra origin allowed by CORS
    #[serde(default)]
    pub frontend_url: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML file; a missing file yields the empty config
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, continuing with environment and defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        info!("Loaded config file: {}", path.display());
        Ok(config)
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub database_path: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub bind_address: String,
    pub database_path: PathBuf,
    pub jwt_secret: String,
    pub frontend_url: Option<String>,
    pub log_level: String,
}

impl ServerConfig {
    /// Resolve every setting from CLI, environment, TOML file and defaults
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        let toml_config = match &overrides.config_file {
            Some(path) => TomlConfig::load(path)?,
            None => TomlConfig::default(),
        };

        let port = match overrides.port {
            Some(port) => port,
            None => match env_var(ENV_PORT) {
                Some(raw) => raw.parse().map_err(|_| {
                    Error::Config(format!("{} must be a port number, got '{}'", ENV_PORT, raw))
                })?,
                None => toml_config.port.unwrap_or(DEFAULT_PORT),
            },
        };

        let bind_address = overrides
            .bind_address
            .or_else(|| env_var(ENV_BIND))
            .or(toml_config.bind_address)
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let database_path = overrides
            .database_path
            .or_else(|| env_var(ENV_DB_PATH).map(PathBuf::from))
            .or(toml_config.database_path)
            .unwrap_or_else(default_database_path);

        let jwt_secret = env_var(ENV_JWT_SECRET)
            .or(toml_config.jwt_secret)
            .ok_or_else(|| {
                Error::Config(format!(
                    "{} must be set (environment or config file)",
                    ENV_JWT_SECRET
                ))
            })?;

        let frontend_url = env_var(ENV_FRONTEND_URL).or(toml_config.frontend_url);

        Ok(Self {
            port,
            bind_address,
            database_path,
            jwt_secret,
            frontend_url,
            log_level: toml_config.logging.level,
        })
    }
}

/// Environment variable, treating empty values as unset
fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Platform data directory, e.g. `~/.local/share/celsched/celsched.db`
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("celsched"))
        .unwrap_or_else(|| PathBuf::from("./celsched_data"))
        .join("celsched.db")
}
