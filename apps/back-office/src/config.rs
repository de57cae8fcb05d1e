//! Back office configuration module.
//!
//! Configuration is layered with the `config` crate:
//!
//! 1. Built-in defaults (this file)
//! 2. Optional TOML file (`bistro.toml`, or the path in `BISTRO_CONFIG`)
//! 3. Environment variables (`BISTRO_PORT`, `BISTRO_DATABASE_PATH`, ...)
//!
//! ## Example `bistro.toml`
//! ```toml
//! bind_addr = "127.0.0.1"
//! port = 8000
//! database_path = "/var/lib/bistro/bistro.db"
//! max_connections = 5
//! cors_origins = ["http://localhost:5173"]
//! log_filter = "info,bistro=debug,sqlx=warn"
//! ```

use std::env;
use std::net::{IpAddr, SocketAddr};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "BISTRO_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "bistro.toml";

/// Back office server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackOfficeConfig {
    /// Interface to listen on
    pub bind_addr: String,

    /// HTTP port
    pub port: u16,

    /// SQLite database file (":memory:" for a throwaway database)
    pub database_path: String,

    /// Connection pool size
    pub max_connections: u32,

    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,

    /// Default tracing filter when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for BackOfficeConfig {
    fn default() -> Self {
        BackOfficeConfig {
            bind_addr: "0.0.0.0".to_string(),
            port: 8000,
            database_path: "./bistro.db".to_string(),
            max_connections: 5,
            cors_origins: Vec::new(),
            log_filter: "info,bistro=debug,sqlx=warn".to_string(),
        }
    }
}

impl BackOfficeConfig {
    /// Loads configuration from defaults, the config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Same as [`load`](Self::load) with an explicit file path.
    ///
    /// A missing file is not an error; the defaults and environment apply.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let defaults = BackOfficeConfig::default();

        let settings = Config::builder()
            .set_default("bind_addr", defaults.bind_addr)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("database_path", defaults.database_path)?
            .set_default("max_connections", i64::from(defaults.max_connections))?
            .set_default("cors_origins", defaults.cors_origins)?
            .set_default("log_filter", defaults.log_filter)?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("BISTRO")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_origins"),
            )
            .build()?;

        let config: BackOfficeConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values the type system cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.parse::<IpAddr>().is_err() {
            return Err(ConfigError::InvalidValue("bind_addr".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidValue("port".to_string()));
        }
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("database_path".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }
        Ok(())
    }

    /// Address the server binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidValue("bind_addr".to_string()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
