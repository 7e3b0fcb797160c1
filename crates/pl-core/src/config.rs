//! Configuration types and loading
//!
//! Everything is read from the process environment; the server loads a
//! `.env` file first when one is present.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_seconds: u64,
    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Session lifetime in minutes
    pub session_timeout_minutes: u64,
    pub cookie_name: String,
    /// Mark the session cookie `Secure`
    pub cookie_secure: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://projectledger.db?mode=rwc".to_string(),
                max_connections: 10,
                min_connections: 1,
                connect_timeout_seconds: 30,
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                request_timeout_seconds: 30,
                cors_origins: vec!["*".to_string()],
            },
            auth: AuthConfig {
                session_timeout_minutes: 24 * 60,
                cookie_name: "projectledger_session".to_string(),
                cookie_secure: false,
            },
        }
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "true" | "1" | "yes")
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Database
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }
        if let Some(max) = env_parse("DB_MAX_CONNECTIONS")? {
            config.database.max_connections = max;
        }
        if let Some(min) = env_parse("DB_MIN_CONNECTIONS")? {
            config.database.min_connections = min;
        }
        if let Some(timeout) = env_parse("DB_CONNECT_TIMEOUT")? {
            config.database.connect_timeout_seconds = timeout;
        }

        // Server
        if let Ok(host) = std::env::var("HOST") {
            config.server.host = host;
        }
        if let Some(port) = env_parse("PORT")? {
            config.server.port = port;
        }
        if let Some(timeout) = env_parse("REQUEST_TIMEOUT")? {
            config.server.request_timeout_seconds = timeout;
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.server.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        // Auth
        if let Some(minutes) = env_parse("SESSION_TIMEOUT_MINUTES")? {
            config.auth.session_timeout_minutes = minutes;
        }
        if let Ok(name) = std::env::var("SESSION_COOKIE_NAME") {
            config.auth.cookie_name = name;
        }
        if let Ok(secure) = std::env::var("SESSION_COOKIE_SECURE") {
            config.auth.cookie_secure = parse_bool(&secure);
        }

        Ok(config)
    }

    /// Get the server address
    pub fn server_addr(&self) -> std::net::SocketAddr {
        use std::net::SocketAddr;
        let ip: std::net::IpAddr = self.server.host.parse().unwrap_or([0, 0, 0, 0].into());
        SocketAddr::new(ip, self.server.port)
    }
}

impl ServerConfig {
    /// True when `*` is among the configured CORS origins
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}
