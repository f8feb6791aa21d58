//! Configuration loading and validation

use anyhow::{Context, Result, bail};
use bookmarks_api::LimitSettings;
use bookmarks_auth::DEFAULT_HASH_COST;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Prefix for environment overrides, e.g. `BOOKMARKS__AUTH__JWT_SECRET`
const ENV_PREFIX: &str = "BOOKMARKS";
const ENV_SEPARATOR: &str = "__";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

/// Authentication configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base signing secret; required
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl: String,
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl: String,
    #[serde(default = "default_hash_cost")]
    pub hash_cost: u32,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("hash_cost", &self.hash_cost)
            .finish()
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_limit")]
    pub default: LimitSettings,
    #[serde(default = "default_bookmarks_list_limit")]
    pub bookmarks_list: LimitSettings,
    #[serde(default = "default_categories_list_limit")]
    pub categories_list: LimitSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_database_url() -> String {
    "sqlite:data/bookmarks.db".to_string()
}

fn default_access_token_ttl() -> String {
    "24h".to_string()
}

fn default_refresh_token_ttl() -> String {
    "7d".to_string()
}

fn default_hash_cost() -> u32 {
    DEFAULT_HASH_COST
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_limit() -> LimitSettings {
    LimitSettings::per_minute(100)
}

fn default_bookmarks_list_limit() -> LimitSettings {
    LimitSettings::per_minute(30)
}

fn default_categories_list_limit() -> LimitSettings {
    LimitSettings::per_minute(20)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_ttl: default_access_token_ttl(),
            refresh_token_ttl: default_refresh_token_ttl(),
            hash_cost: default_hash_cost(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            default: default_limit(),
            bookmarks_list: default_bookmarks_list_limit(),
            categories_list: default_categories_list_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from an optional file layered under the environment
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            info!("Config file not found at {}, using defaults and environment", path);
        }

        let config: Config = ::config::Config::builder()
            .add_source(::config::File::from(Path::new(path)).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse configuration from {}", path))?;

        Ok(config)
    }

    /// Reject settings the service must not start with
    ///
    /// The hash cost is checked when the hasher is built, since only the
    /// hashing primitive knows its accepted range.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            bail!(
                "auth.jwt_secret is not set; provide JWT_SECRET, --jwt-secret or {}{}AUTH{}JWT_SECRET",
                ENV_PREFIX,
                ENV_SEPARATOR,
                ENV_SEPARATOR
            );
        }

        for (name, limit) in [
            ("default", &self.rate_limit.default),
            ("bookmarks_list", &self.rate_limit.bookmarks_list),
            ("categories_list", &self.rate_limit.categories_list),
        ] {
            if limit.window_secs == 0 || limit.max_requests == 0 {
                bail!(
                    "rate_limit.{} must have a non-zero window_secs and max_requests",
                    name
                );
            }
        }

        if self.rate_limit.sweep_interval_secs == 0 {
            bail!("rate_limit.sweep_interval_secs must be at least 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> Config {
        let mut config = Config::default();
        config.auth.jwt_secret = "test-secret".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.access_token_ttl, "24h");
        assert_eq!(config.auth.refresh_token_ttl, "7d");
        assert_eq!(config.auth.hash_cost, DEFAULT_HASH_COST);
        assert_eq!(config.rate_limit.default, LimitSettings::per_minute(100));
        assert_eq!(config.rate_limit.bookmarks_list, LimitSettings::per_minute(30));
        assert_eq!(config.rate_limit.categories_list, LimitSettings::per_minute(20));
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        assert!(Config::default().validate().is_err());

        let mut config = valid();
        config.auth.jwt_secret = "   ".to_string();
        assert!(config.validate().is_err());

        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_zero_limit_is_fatal() {
        let mut config = valid();
        config.rate_limit.bookmarks_list.max_requests = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.rate_limit.default.window_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 8080

[auth]
jwt_secret = "from-file"
access_token_ttl = "15m"

[rate_limit.bookmarks_list]
window_secs = 10
max_requests = 5

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.auth.jwt_secret, "from-file");
        assert_eq!(config.auth.access_token_ttl, "15m");
        assert_eq!(config.auth.refresh_token_ttl, "7d");
        assert_eq!(
            config.rate_limit.bookmarks_list,
            LimitSettings {
                window_secs: 10,
                max_requests: 5
            }
        );
        assert_eq!(config.rate_limit.categories_list, LimitSettings::per_minute(20));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", valid().auth);
        assert!(!rendered.contains("test-secret"));
    }
}
