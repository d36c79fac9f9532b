//! Unit of work configuration loaded from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_DATABASE_URL, DEFAULT_MAX_CONNECTIONS,
    DEFAULT_MIN_CONNECTIONS, ENV_CONNECT_TIMEOUT_SECS, ENV_DATABASE_URL,
    ENV_DATABASE_URL_FALLBACK, ENV_ISOLATION_LEVEL, ENV_MAX_CONNECTIONS, ENV_MIN_CONNECTIONS,
    ENV_READ_ONLY, ENV_SQL_LOGGING,
};

/// Complete unit of work configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UnitOfWorkConfig {
    pub database: DatabaseConfig,
    pub transaction: TransactionConfig,
}

impl UnitOfWorkConfig {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read first when present. Unset or unparsable
    /// values fall back to the defaults in [`crate::constants`].
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database: DatabaseConfig {
                url: env::var(ENV_DATABASE_URL)
                    .or_else(|_| env::var(ENV_DATABASE_URL_FALLBACK))
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: parse_env(ENV_MAX_CONNECTIONS)
                    .unwrap_or(DEFAULT_MAX_CONNECTIONS),
                min_connections: parse_env(ENV_MIN_CONNECTIONS)
                    .unwrap_or(DEFAULT_MIN_CONNECTIONS),
                connect_timeout_secs: parse_env(ENV_CONNECT_TIMEOUT_SECS)
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
                sql_logging: parse_env(ENV_SQL_LOGGING).unwrap_or(false),
            },
            transaction: TransactionConfig {
                isolation_level: env::var(ENV_ISOLATION_LEVEL).ok(),
                read_only: parse_env(ENV_READ_ONLY).unwrap_or(false),
            },
        }
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Database connection configuration.
#[derive(Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub sql_logging: bool,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("sql_logging", &self.sql_logging)
            .finish()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            sql_logging: false,
        }
    }
}

/// Settings applied to every transaction a coordinator begins.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransactionConfig {
    /// Isolation level name, `None` keeps the server default
    pub isolation_level: Option<String>,
    /// Begin transactions in read-only access mode
    pub read_only: bool,
}
