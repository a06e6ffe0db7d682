//! Configuration management
//!
//! Settings come from the process environment (after an optional `.env` file)
//! with the defaults below. Command-line flags override the source settings
//! through [`Config::with_data_dir`] and [`Config::with_batch_size`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use olist_common::env;
use olist_common::EnvError;
use sqlx::postgres::PgConnectOptions;

use crate::error::ConfigError;

// ============================================================================
// Defaults
// ============================================================================

/// Default database host.
pub const DEFAULT_DB_HOST: &str = "127.0.0.1";

/// Default database port.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default database user.
pub const DEFAULT_DB_USER: &str = "bi_user";

/// Default database name.
pub const DEFAULT_DB_NAME: &str = "olist_bi";

/// Default client character set.
pub const DEFAULT_DB_CHARSET: &str = "UTF8";

/// Default pool size. Loads are sequential, so one connection is in use at a time.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 2;

/// Default pool acquire timeout in seconds.
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default rows per insert batch.
pub const DEFAULT_BATCH_SIZE: usize = 5_000;

/// Character set names accepted for `DB_CHARSET`, compared case-insensitively
const UTF8_CHARSETS: &[&str] = &["utf8", "utf-8", "utf8mb4", "unicode"];

/// Loader configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub source: SourceConfig,
}

/// Destination database settings
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Full connection URL; when set, the individual parts are ignored
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub name: String,
    pub charset: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Source file settings
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub data_dir: Option<PathBuf>,
    pub batch_size: usize,
}

impl Config {
    /// Load `.env` if present, then read the environment
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Read the environment without touching `.env`
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database: DatabaseConfig::from_env()?,
            source: SourceConfig::from_env()?,
        })
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.source.data_dir = Some(data_dir.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.source.batch_size = batch_size;
        self
    }

    /// Validate everything needed for a full load
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.source.validate()?;
        self.database.validate()
    }
}

impl SourceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            data_dir: env::optional("OLIST_DATA_DIR").map(PathBuf::from),
            batch_size: env::parse_or("LOAD_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
        })
    }

    /// Source root, which must be an existing directory
    pub fn data_dir(&self) -> Result<&Path, ConfigError> {
        let dir = self.data_dir.as_deref().ok_or(EnvError::Missing {
            key: "OLIST_DATA_DIR".to_string(),
        })?;
        if !dir.is_dir() {
            return Err(ConfigError::SourceRoot(dir.to_path_buf()));
        }
        Ok(dir)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::invalid("batch size must be greater than 0"));
        }
        self.data_dir().map(|_| ())
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env::optional("DATABASE_URL"),
            host: env::string_or("DB_HOST", DEFAULT_DB_HOST),
            port: env::parse_or("DB_PORT", DEFAULT_DB_PORT)?,
            user: env::string_or("DB_USER", DEFAULT_DB_USER),
            password: env::optional("DB_PASSWORD"),
            name: env::string_or("DB_NAME", DEFAULT_DB_NAME),
            charset: env::string_or("DB_CHARSET", DEFAULT_DB_CHARSET),
            max_connections: env::parse_or("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            connect_timeout_secs: env::parse_or(
                "DB_CONNECT_TIMEOUT",
                DEFAULT_DB_CONNECT_TIMEOUT_SECS,
            )?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_none() && self.password.is_none() {
            return Err(EnvError::Missing {
                key: "DB_PASSWORD".to_string(),
            }
            .into());
        }

        if !UTF8_CHARSETS
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&self.charset))
        {
            return Err(ConfigError::invalid(format!(
                "DB_CHARSET '{}' is not supported, the destination connection is always UTF-8",
                self.charset
            )));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::invalid(
                "DB_MAX_CONNECTIONS must be greater than 0",
            ));
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Connection options from the URL, or from the individual parts
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        if let Some(url) = &self.url {
            return url.parse::<PgConnectOptions>().map_err(|e| {
                ConfigError::invalid(format!("DATABASE_URL is not a valid connection URL: {}", e))
            });
        }

        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.name);
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        Ok(options)
    }

    /// `host:port/name` for log lines
    pub fn display_target(&self) -> String {
        match &self.url {
            Some(_) => "DATABASE_URL".to_string(),
            None => format!("{}:{}/{}", self.host, self.port, self.name),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("name", &self.name)
            .field("charset", &self.charset)
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            user: DEFAULT_DB_USER.to_string(),
            password: None,
            name: DEFAULT_DB_NAME.to_string(),
            charset: DEFAULT_DB_CHARSET.to_string(),
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DB_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}
