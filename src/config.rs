//! Service configuration loaded from environment variables.
//!
//! - `ORDERS_HOST` - bind address (default: 127.0.0.1)
//! - `ORDERS_PORT` - listen port (default: 8080)
//! - `DATABASE_URL` - `PostgreSQL` connection string; in-memory store when unset
//! - `ORDERS_DB_MAX_CONNECTIONS` - pool size (default: 10)
//! - `ORDERS_SEED_DEMO_DATA` - load demo orders at startup (default: true)
//!
//! Log filtering uses `RUST_LOG`.

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub seed_demo_data: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("db_max_connections", &self.db_max_connections)
            .field("seed_demo_data", &self.seed_demo_data)
            .finish()
    }
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            host: parse(&get, "ORDERS_HOST", "127.0.0.1")?,
            port: parse(&get, "ORDERS_PORT", "8080")?,
            database_url: get("DATABASE_URL"),
            db_max_connections: parse(&get, "ORDERS_DB_MAX_CONNECTIONS", "10")?,
            seed_demo_data: parse_bool(&get, "ORDERS_SEED_DEMO_DATA", true)?,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_bool(get: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool, ConfigError> {
    match get(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected a boolean, got {other:?}"),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
        assert!(config.database_url.is_none());
        assert_eq!(config.db_max_connections, 10);
        assert!(config.seed_demo_data);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("ORDERS_HOST", "0.0.0.0"),
            ("ORDERS_PORT", "9000"),
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("ORDERS_DB_MAX_CONNECTIONS", "4"),
            ("ORDERS_SEED_DEMO_DATA", "off"),
        ])
        .unwrap();

        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:9000");
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/orders"));
        assert_eq!(config.db_max_connections, 4);
        assert!(!config.seed_demo_data);
    }

    #[test]
    fn test_blank_database_url_means_in_memory() {
        let config = config(&[("DATABASE_URL", "  ")]).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_invalid_port() {
        let err = config(&[("ORDERS_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "ORDERS_PORT"));
    }

    #[test]
    fn test_invalid_bool() {
        let err = config(&[("ORDERS_SEED_DEMO_DATA", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "ORDERS_SEED_DEMO_DATA"));
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = config(&[("DATABASE_URL", "postgres://user:pw@localhost/orders")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("pw"));
        assert!(debug.contains("[REDACTED]"));
    }
}
