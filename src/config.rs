use std::env;
use std::fs;

use serde::{Deserialize, Serialize};

use crate::error::DbiError;
use crate::types::DatabaseType;

pub const DEFAULT_HOST: &str = "/var/run/postgresql";
pub const DEFAULT_PORT: u16 = 5432;

/// TLS negotiation requested in the configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    #[default]
    Disable,
    Allow,
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

/// Connection settings, usually deserialized from a JSON file.
///
/// ```rust
/// use sql_dbi::prelude::*;
///
/// let cfg: DbConfig = serde_json::from_str(
///     r#"{ "name": "app", "user": "app", "password": "env:APP_DB_PW", "maxOpenConns": 4 }"#,
/// ).unwrap();
/// assert_eq!(cfg.driver(), DatabaseType::Postgres);
/// assert_eq!(cfg.host(), "/var/run/postgresql");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Database name; for `SQLite` the database path (`:memory:` allowed).
    pub name: String,
    /// Database user name.
    pub user: String,
    /// One of: the password itself, `file:/path/to/secret.pw`, or `env:PASSWORD_ENV`.
    pub password: String,
    #[serde(rename = "sslmode")]
    pub ssl_mode: Option<SslMode>,
    /// Defaults to `postgres`.
    pub driver: Option<DatabaseType>,
    /// Hostname or socket directory. Defaults to `/var/run/postgresql`.
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Maximum open connections; 0 keeps the pool default.
    #[serde(rename = "maxOpenConns")]
    pub max_open_conns: usize,
}

impl DbConfig {
    #[must_use]
    pub fn driver(&self) -> DatabaseType {
        self.driver.unwrap_or(DatabaseType::Postgres)
    }

    #[must_use]
    pub fn ssl_mode(&self) -> SslMode {
        self.ssl_mode.unwrap_or_default()
    }

    #[must_use]
    pub fn host(&self) -> &str {
        match self.host.as_deref() {
            Some(host) if !host.is_empty() => host,
            _ => DEFAULT_HOST,
        }
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.filter(|p| *p != 0).unwrap_or(DEFAULT_PORT)
    }

    /// Check the fields the selected driver needs.
    ///
    /// # Errors
    /// Returns `DbiError::ConfigError` naming the first missing field.
    pub fn validate(&self) -> Result<(), DbiError> {
        if self.driver() == DatabaseType::Postgres && self.user.is_empty() {
            return Err(DbiError::ConfigError("db user missing".to_string()));
        }
        if self.name.is_empty() {
            return Err(DbiError::ConfigError("db name missing".to_string()));
        }
        Ok(())
    }

    /// Resolve the password indirection; `None` when no password is configured.
    ///
    /// # Errors
    /// Returns `DbiError::ConfigError` if the environment variable is unset or empty, or the
    /// password file cannot be read.
    pub fn resolve_password(&self) -> Result<Option<String>, DbiError> {
        if self.password.is_empty() {
            return Ok(None);
        }
        let password = resolve_password(&self.password)?;
        Ok(Some(password).filter(|p| !p.is_empty()))
    }
}

/// Resolve `env:VAR`, `file:/path` or a literal password.
///
/// # Errors
/// Returns `DbiError::ConfigError` if the source cannot be read.
pub fn resolve_password(password: &str) -> Result<String, DbiError> {
    if let Some(var) = password.strip_prefix("env:") {
        return match env::var(var) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Err(DbiError::ConfigError(format!(
                "reading password from environment variable {var}: string empty"
            ))),
        };
    }
    if let Some(path) = password.strip_prefix("file:") {
        let data = fs::read_to_string(path).map_err(|e| {
            DbiError::ConfigError(format!("reading password file {path}: {e}"))
        })?;
        return Ok(data.trim_end_matches(['\n', '\r']).to_string());
    }
    Ok(password.to_string())
}
