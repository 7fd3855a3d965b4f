/// Configuration management for Pollbox
use crate::error::{PollError, PollResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitSettings,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in seconds (default 7 days)
    pub session_ttl_secs: i64,
    /// Mark session cookies Secure; on in production deployments
    pub cookie_secure: bool,
}

/// Request rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub enabled: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> PollResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("POLLBOX_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("POLLBOX_PORT")
            .unwrap_or_else(|_| "8090".to_string())
            .parse()
            .map_err(|_| PollError::Validation("Invalid port number".to_string()))?;
        let version = env::var("POLLBOX_VERSION")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let data_directory: PathBuf = env::var("POLLBOX_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("POLLBOX_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("pollbox.sqlite"));

        let session_ttl_secs = env::var("POLLBOX_SESSION_TTL_SECS")
            .unwrap_or_else(|_| (7 * 24 * 3600).to_string())
            .parse()
            .map_err(|_| PollError::Validation("Invalid session TTL".to_string()))?;
        let cookie_secure = env::var("POLLBOX_COOKIE_SECURE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let rate_limit_enabled = env::var("POLLBOX_RATE_LIMIT_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        let level = env::var("POLLBOX_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
            },
            auth: AuthConfig {
                session_ttl_secs,
                cookie_secure,
            },
            rate_limit: RateLimitSettings {
                enabled: rate_limit_enabled,
            },
            logging: LoggingConfig { level },
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> PollResult<()> {
        if self.service.hostname.is_empty() {
            return Err(PollError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.auth.session_ttl_secs <= 0 {
            return Err(PollError::Validation(
                "Session TTL must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8090,
                version: "0.1.0".to_string(),
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                database: PathBuf::from("./data/pollbox.sqlite"),
            },
            auth: AuthConfig {
                session_ttl_secs: 7 * 24 * 3600,
                cookie_secure: false,
            },
            rate_limit: RateLimitSettings { enabled: true },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_ttl() {
        let mut config = base_config();
        config.auth.session_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_hostname() {
        let mut config = base_config();
        config.service.hostname = String::new();
        assert!(config.validate().is_err());
    }
}
