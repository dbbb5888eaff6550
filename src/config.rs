//! Configuration for the provisioning run
//!
//! Read once at startup from environment variables (`DB_USER`, `DB_PASS`,
//! `DB_NAME`, admin connection parameters) with an optional YAML file named
//! by `PROVISION_CONFIG` as fallback. Environment variables win over file
//! values. Credentials are never hardcoded and never printed.

use crate::error::ProvisionError;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Extension trait for parsing environment variables.
pub trait ConfigExt {
    /// Get an environment variable with a default value.
    fn env_or(name: &str, default: &str) -> String {
        env::var(name).unwrap_or_else(|_| default.to_string())
    }

    /// Get an environment variable as a boolean.
    ///
    /// Returns `true` if the value is "true" (case-insensitive), otherwise `default`.
    fn env_bool(name: &str, default: bool) -> bool {
        env::var(name)
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(default)
    }

    /// Get an environment variable parsed as a specific type.
    ///
    /// Returns `default` if the variable is not set or fails to parse.
    fn env_parse<T: FromStr>(name: &str, default: T) -> T {
        env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}

// Blanket implementation for all types
impl<T> ConfigExt for T {}

/// Optional YAML configuration file, `PROVISION_CONFIG`.
///
/// ```yaml
/// admin:
///   username: postgres
///   password: hunter2
///   host: db.internal
///   port: 5432
/// target:
///   username: alice
///   password: secret
///   database: testdb
/// ```
#[derive(Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    admin: AdminSection,
    #[serde(default)]
    target: TargetSection,
}

#[derive(Deserialize, Default)]
struct AdminSection {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    host: String,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    database: String,
}

#[derive(Deserialize, Default)]
struct TargetSection {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    database: String,
}

impl FileConfig {
    fn read(path: &str) -> Result<Self, ProvisionError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProvisionError::Environment(format!("failed to read config file {path}: {e}"))
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            ProvisionError::Environment(format!("failed to parse config file {path}: {e}"))
        })
    }
}

/// Resolved configuration for one provisioning run.
pub struct Config {
    pub db_user: String,
    pub db_pass: String,
    pub db_name: String,
    pub host: String,
    pub port: u16,
    pub admin_user: String,
    pub admin_pass: String,
    pub admin_db: String,
    pub connect_timeout: Duration,
    pub statement_timeout: Duration,
    pub drop_retry_delay: Duration,
    pub drop_force: bool,
}

impl Config {
    /// Load configuration from the environment, with `PROVISION_CONFIG`
    /// file values as fallback.
    pub fn load() -> Result<Self, ProvisionError> {
        let file = match env::var("PROVISION_CONFIG") {
            Ok(path) => FileConfig::read(&path)?,
            Err(_) => FileConfig::default(),
        };
        Self::from_file(file)
    }

    fn from_file(file: FileConfig) -> Result<Self, ProvisionError> {
        let file_port = file.admin.port.map(|p| p.to_string()).unwrap_or_default();

        let config = Self {
            db_user: env_or_fallback("DB_USER", &file.target.username, ""),
            db_pass: env_or_fallback("DB_PASS", &file.target.password, ""),
            db_name: env_or_fallback("DB_NAME", &file.target.database, ""),
            host: env_or_fallback("DB_HOST", &file.admin.host, "localhost"),
            port: env_or_fallback("DB_PORT", &file_port, "5432")
                .parse()
                .map_err(|_| {
                    ProvisionError::Environment("DB_PORT must be a port number".to_string())
                })?,
            admin_user: env_or_fallback("ADMIN_USER", &file.admin.username, "postgres"),
            admin_pass: env_or_fallback("ADMIN_PASS", &file.admin.password, ""),
            admin_db: env_or_fallback("ADMIN_DB", &file.admin.database, "postgres"),
            connect_timeout: Duration::from_secs(u64::env_parse("CONNECT_TIMEOUT_SECS", 10)),
            statement_timeout: Duration::from_secs(u64::env_parse("STATEMENT_TIMEOUT_SECS", 30)),
            drop_retry_delay: Duration::from_secs(u64::env_parse("DROP_RETRY_DELAY_SECS", 2)),
            drop_force: bool::env_bool("DROP_FORCE", false),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ProvisionError> {
        for (name, value) in [
            ("DB_USER", &self.db_user),
            ("DB_PASS", &self.db_pass),
            ("DB_NAME", &self.db_name),
        ] {
            if value.is_empty() {
                return Err(ProvisionError::Environment(format!(
                    "{name} must be set (environment variable or config file)"
                )));
            }
        }
        if self.db_user == self.admin_user {
            return Err(ProvisionError::Environment(format!(
                "target role {:?} must differ from the admin role",
                self.db_user
            )));
        }
        if self.db_name == self.admin_db {
            return Err(ProvisionError::Environment(format!(
                "target database {:?} must differ from the admin maintenance database",
                self.db_name
            )));
        }
        Ok(())
    }
}

// Passwords stay out of logs and error output.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("db_user", &self.db_user)
            .field("db_pass", &"<redacted>")
            .field("db_name", &self.db_name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("admin_user", &self.admin_user)
            .field("admin_pass", &"<redacted>")
            .field("admin_db", &self.admin_db)
            .field("connect_timeout", &self.connect_timeout)
            .field("statement_timeout", &self.statement_timeout)
            .field("drop_retry_delay", &self.drop_retry_delay)
            .field("drop_force", &self.drop_force)
            .finish()
    }
}

fn env_or_fallback(name: &str, fallback: &str, default: &str) -> String {
    match env::var(name) {
        Ok(v) if !v.is_empty() => v,
        _ => {
            if fallback.is_empty() {
                default.to_string()
            } else {
                fallback.to_string()
            }
        }
    }
}
