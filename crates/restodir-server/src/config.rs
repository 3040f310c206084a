//! Configuration management
//!
//! Configuration is read once at startup into an explicit [`Config`] value
//! that is handed to every component. Nothing is kept in process globals.

use http::HeaderName;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Defaults
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default bound on draining audit tasks after the listener stops.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default directory table name.
pub const DEFAULT_TABLE_NAME: &str = "restaurants";

/// Default audit log table name.
pub const DEFAULT_AUDIT_LOGS_TABLE: &str = "audit_logs";

/// Default location of the bootstrap dataset.
pub const DEFAULT_SEED_DATA_PATH: &str = "data/restaurants_data.json";

/// Default geo lookup provider; requests go to `{base}/{ip}/json`.
pub const DEFAULT_GEO_LOOKUP_URL: &str = "https://ipinfo.io";

/// Default geo lookup timeout in seconds.
pub const DEFAULT_GEO_TIMEOUT_SECS: u64 = 5;

/// Default lifetime of cached geo lookups in seconds.
pub const DEFAULT_GEO_CACHE_TTL_SECS: u64 = 300;

/// Default ordered list of proxy headers trusted for the client address.
pub const DEFAULT_TRUSTED_PROXY_HEADERS: &str = "x-forwarded-for,x-real-ip";

/// Default CORS allowed origin.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "*";

/// Configuration errors. All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub tables: TableConfig,
    pub store: StoreConfig,
    pub bootstrap: BootstrapConfig,
    pub geo: GeoConfig,
    pub audit: AuditConfig,
    pub cors: CorsConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Admin gate configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub password: String,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig").field("password", &"<redacted>").finish()
    }
}

/// Table names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub restaurants: String,
    pub audit_logs: String,
}

/// Which store implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    DynamoDb,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dynamodb" | "dynamo" => Ok(StoreBackend::DynamoDb),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Override endpoint, e.g. DynamoDB Local
    pub endpoint: Option<String>,
}

/// Bootstrap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub seed_path: String,
}

/// Geo resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    pub lookup_url: String,
    pub timeout_secs: u64,
    /// 0 disables the cache
    pub cache_ttl_secs: u64,
    /// Trusted edge header carrying a resolved country, e.g. `cf-ipcountry`
    pub country_header: Option<String>,
}

impl GeoConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parsed edge country header, if configured and valid
    pub fn country_header_name(&self) -> Option<HeaderName> {
        self.country_header
            .as_deref()
            .and_then(|h| HeaderName::from_bytes(h.as_bytes()).ok())
    }
}

/// When the audit write happens relative to the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuditMode {
    /// Resolve and write before the request reaches its handler
    #[default]
    Inline,
    /// Hand the write to a tracked task and forward immediately
    Background,
}

impl std::str::FromStr for AuditMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inline" | "sync" => Ok(AuditMode::Inline),
            "background" | "async" => Ok(AuditMode::Background),
            other => Err(format!("unknown audit mode '{}'", other)),
        }
    }
}

/// Audit interceptor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub mode: AuditMode,
    /// Ordered, lower-case header names consulted before the socket peer
    pub trusted_proxy_headers: Vec<String>,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            })
        },
        _ => Ok(default),
    }
}

fn check_header_name(key: &'static str, name: &str) -> Result<(), ConfigError> {
    HeaderName::from_bytes(name.as_bytes())
        .map(|_| ())
        .map_err(|_| ConfigError::Invalid {
            key,
            reason: format!("'{}' is not a valid header name", name),
        })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Load configuration from `.env` (if present) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from the process environment only
    pub fn from_env() -> Result<Self, ConfigError> {
        let password = std::env::var("ADMIN_PASSWORD")
            .ok()
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::Missing("ADMIN_PASSWORD"))?;

        let config = Config {
            server: ServerConfig {
                host: env_or("HOST", DEFAULT_SERVER_HOST),
                port: env_parse("PORT", DEFAULT_SERVER_PORT)?,
                shutdown_timeout_secs: env_parse(
                    "SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                )?,
            },
            admin: AdminConfig { password },
            tables: TableConfig {
                restaurants: env_or("TABLE_NAME", DEFAULT_TABLE_NAME),
                audit_logs: env_or("AUDIT_LOGS_TABLE", DEFAULT_AUDIT_LOGS_TABLE),
            },
            store: StoreConfig {
                backend: env_parse("STORE_BACKEND", StoreBackend::DynamoDb)?,
                endpoint: std::env::var("DYNAMODB_ENDPOINT").ok().filter(|v| !v.is_empty()),
            },
            bootstrap: BootstrapConfig {
                seed_path: env_or("SEED_DATA_PATH", DEFAULT_SEED_DATA_PATH),
            },
            geo: GeoConfig {
                lookup_url: env_or("GEO_LOOKUP_URL", DEFAULT_GEO_LOOKUP_URL),
                timeout_secs: env_parse("GEO_TIMEOUT_SECS", DEFAULT_GEO_TIMEOUT_SECS)?,
                cache_ttl_secs: env_parse("GEO_CACHE_TTL_SECS", DEFAULT_GEO_CACHE_TTL_SECS)?,
                country_header: std::env::var("GEO_COUNTRY_HEADER")
                    .ok()
                    .map(|h| h.trim().to_lowercase())
                    .filter(|h| !h.is_empty()),
            },
            audit: AuditConfig {
                mode: env_parse("AUDIT_MODE", AuditMode::Inline)?,
                trusted_proxy_headers: split_list(
                    &std::env::var("TRUSTED_PROXY_HEADERS")
                        .unwrap_or_else(|_| DEFAULT_TRUSTED_PROXY_HEADERS.to_string()),
                ),
            },
            cors: CorsConfig {
                allowed_origins: env_or("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ALLOWED_ORIGIN)
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                key: "PORT",
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.tables.restaurants.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "TABLE_NAME",
                reason: "cannot be empty".to_string(),
            });
        }

        if self.tables.audit_logs.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "AUDIT_LOGS_TABLE",
                reason: "cannot be empty".to_string(),
            });
        }

        if self.geo.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "GEO_TIMEOUT_SECS",
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.admin.password.is_empty() {
            return Err(ConfigError::Missing("ADMIN_PASSWORD"));
        }

        if let Some(header) = &self.geo.country_header {
            check_header_name("GEO_COUNTRY_HEADER", header)?;
        }

        for header in &self.audit.trusted_proxy_headers {
            check_header_name("TRUSTED_PROXY_HEADERS", header)?;
        }

        Ok(())
    }

    /// A configuration suitable for tests and local runs with an in-memory store
    pub fn for_memory(admin_password: impl Into<String>) -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            admin: AdminConfig {
                password: admin_password.into(),
            },
            tables: TableConfig {
                restaurants: DEFAULT_TABLE_NAME.to_string(),
                audit_logs: DEFAULT_AUDIT_LOGS_TABLE.to_string(),
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                endpoint: None,
            },
            bootstrap: BootstrapConfig {
                seed_path: DEFAULT_SEED_DATA_PATH.to_string(),
            },
            geo: GeoConfig {
                lookup_url: DEFAULT_GEO_LOOKUP_URL.to_string(),
                timeout_secs: DEFAULT_GEO_TIMEOUT_SECS,
                cache_ttl_secs: 0,
                country_header: None,
            },
            audit: AuditConfig {
                mode: AuditMode::Inline,
                trusted_proxy_headers: split_list(DEFAULT_TRUSTED_PROXY_HEADERS),
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "ADMIN_PASSWORD",
        "TABLE_NAME",
        "AUDIT_LOGS_TABLE",
        "PORT",
        "STORE_BACKEND",
        "AUDIT_MODE",
        "TRUSTED_PROXY_HEADERS",
        "GEO_COUNTRY_HEADER",
        "GEO_CACHE_TTL_SECS",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_missing_admin_password_is_fatal() {
        clear_env();
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ADMIN_PASSWORD")));
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        std::env::set_var("ADMIN_PASSWORD", "secret");

        let config = Config::from_env().unwrap();
        assert_eq!(config.tables.restaurants, "restaurants");
        assert_eq!(config.tables.audit_logs, "audit_logs");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.store.backend, StoreBackend::DynamoDb);
        assert_eq!(config.audit.mode, AuditMode::Inline);
        assert_eq!(
            config.audit.trusted_proxy_headers,
            vec!["x-forwarded-for".to_string(), "x-real-ip".to_string()]
        );
        assert_eq!(config.geo.timeout_secs, 5);
        assert!(config.geo.country_header.is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        std::env::set_var("ADMIN_PASSWORD", "secret");
        std::env::set_var("TABLE_NAME", "dining");
        std::env::set_var("AUDIT_LOGS_TABLE", "dining_audit");
        std::env::set_var("PORT", "9090");
        std::env::set_var("STORE_BACKEND", "memory");
        std::env::set_var("AUDIT_MODE", "background");
        std::env::set_var("TRUSTED_PROXY_HEADERS", "");
        std::env::set_var("GEO_COUNTRY_HEADER", "CF-IPCountry");

        let config = Config::from_env().unwrap();
        assert_eq!(config.tables.restaurants, "dining");
        assert_eq!(config.tables.audit_logs, "dining_audit");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.audit.mode, AuditMode::Background);
        assert!(config.audit.trusted_proxy_headers.is_empty());
        assert_eq!(config.geo.country_header.as_deref(), Some("cf-ipcountry"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_port() {
        clear_env();
        std::env::set_var("ADMIN_PASSWORD", "secret");
        std::env::set_var("PORT", "eighty");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_header_names() {
        clear_env();
        std::env::set_var("ADMIN_PASSWORD", "secret");
        std::env::set_var("TRUSTED_PROXY_HEADERS", "x-forwarded-for,bad header");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TRUSTED_PROXY_HEADERS", .. }));

        clear_env();
    }

    #[test]
    fn test_admin_password_is_redacted() {
        let config = Config::for_memory("hunter2");
        let debug = format!("{:?}", config.admin);
        assert!(!debug.contains("hunter2"));
    }
}
