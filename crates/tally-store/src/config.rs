//! Database configuration.
//!
//! The engine does not load configuration itself; the surrounding service
//! hands it a ready [`DbConfig`]. Validation still lives here so a bad
//! config fails before any connection is attempted.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Which database backend to connect to, and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DbConfig {
    /// File-backed SQLite database. The default for single-server installs.
    Sqlite { path: PathBuf },

    /// MySQL/MariaDB database, shared by multiple servers.
    Mysql {
        host: String,
        #[serde(default = "default_mysql_port")]
        port: u16,
        database: String,
        user: String,
        #[serde(default)]
        password: String,
    },
}

fn default_mysql_port() -> u16 {
    3306
}

impl DbConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        match self {
            DbConfig::Sqlite { path } => {
                if path.as_os_str().is_empty() {
                    return Err(StoreError::Config("sqlite path must not be empty".into()));
                }
            }
            DbConfig::Mysql {
                host,
                port,
                database,
                user,
                ..
            } => {
                if host.is_empty() {
                    return Err(StoreError::Config("mysql host must not be empty".into()));
                }
                if *port == 0 {
                    return Err(StoreError::Config("mysql port must not be 0".into()));
                }
                if database.is_empty() {
                    return Err(StoreError::Config(
                        "mysql database must not be empty".into(),
                    ));
                }
                if user.is_empty() {
                    return Err(StoreError::Config("mysql user must not be empty".into()));
                }
            }
        }
        Ok(())
    }

    /// Name of the backend, for logging.
    pub fn backend(&self) -> &'static str {
        match self {
            DbConfig::Sqlite { .. } => "sqlite",
            DbConfig::Mysql { .. } => "mysql",
        }
    }
}
