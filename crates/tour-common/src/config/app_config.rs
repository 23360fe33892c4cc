//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    /// Hosted backend; required by the agent, optional for library use
    pub remote: Option<RemoteConfig>,
    pub offline: OfflineConfig,
    pub typing: TypingConfig,
    pub connectivity: ConnectivityConfig,
    /// Redis-backed presence; in-process presence when unset
    pub redis: Option<RedisConfig>,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            _ => Err(format!("Invalid environment: {s}")),
        }
    }
}

/// Hosted backend (REST + object storage) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_documents_table")]
    pub documents_table: String,
    #[serde(default = "default_documents_bucket")]
    pub documents_bucket: String,
    #[serde(default = "default_signed_url_expiry")]
    pub signed_url_expiry_secs: u64,
}

/// Offline document cache and sync configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OfflineConfig {
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Per-document resolver timeout; unbounded when unset
    #[serde(default)]
    pub resolve_timeout_ms: Option<u64>,
}

impl OfflineConfig {
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    #[must_use]
    pub fn resolve_timeout(&self) -> Option<Duration> {
        self.resolve_timeout_ms.map(Duration::from_millis)
    }
}

/// Typing indicator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TypingConfig {
    #[serde(default = "default_typing_auto_stop_ms")]
    pub auto_stop_ms: u64,
}

impl TypingConfig {
    #[must_use]
    pub fn auto_stop(&self) -> Duration {
        Duration::from_millis(self.auto_stop_ms)
    }
}

/// Connectivity probe configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityConfig {
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
}

impl ConnectivityConfig {
    #[must_use]
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

// Default value functions
fn default_app_name() -> String {
    "tour-sync".to_string()
}

fn default_documents_table() -> String {
    "documents".to_string()
}

fn default_documents_bucket() -> String {
    "documents".to_string()
}

fn default_signed_url_expiry() -> u64 {
    3600 // 1 hour
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./offline-documents.json")
}

fn default_settle_delay_ms() -> u64 {
    2000
}

fn default_max_concurrency() -> usize {
    4
}

fn default_typing_auto_stop_ms() -> u64 {
    3000
}

fn default_probe_interval_ms() -> u64 {
    5000
}

fn default_redis_max_connections() -> u32 {
    10
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            settle_delay_ms: default_settle_delay_ms(),
            max_concurrency: default_max_concurrency(),
            resolve_timeout_ms: None,
        }
    }
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            auto_stop_ms: default_typing_auto_stop_ms(),
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: default_probe_interval_ms(),
        }
    }
}

/// Parse an optional variable, reporting malformed values instead of ignoring them
fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable is present but malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let remote = match (lookup("BACKEND_URL"), lookup("BACKEND_API_KEY")) {
            (Some(url), Some(api_key)) => Some(RemoteConfig {
                url: url.trim_end_matches('/').to_string(),
                api_key,
                documents_table: lookup("DOCUMENTS_TABLE").unwrap_or_else(default_documents_table),
                documents_bucket: lookup("DOCUMENTS_BUCKET")
                    .unwrap_or_else(default_documents_bucket),
                signed_url_expiry_secs: parse_var(&lookup, "SIGNED_URL_EXPIRY_SECS")?
                    .unwrap_or_else(default_signed_url_expiry),
            }),
            (Some(_), None) => return Err(ConfigError::MissingVar("BACKEND_API_KEY")),
            (None, _) => None,
        };

        let max_concurrency = parse_var(&lookup, "SYNC_MAX_CONCURRENCY")?
            .unwrap_or_else(default_max_concurrency);
        if max_concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "SYNC_MAX_CONCURRENCY",
                "0".to_string(),
            ));
        }

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default(),
            },
            remote,
            offline: OfflineConfig {
                cache_path: lookup("OFFLINE_CACHE_PATH")
                    .map_or_else(default_cache_path, PathBuf::from),
                settle_delay_ms: parse_var(&lookup, "SYNC_SETTLE_DELAY_MS")?
                    .unwrap_or_else(default_settle_delay_ms),
                max_concurrency,
                resolve_timeout_ms: parse_var(&lookup, "SYNC_RESOLVE_TIMEOUT_MS")?,
            },
            typing: TypingConfig {
                auto_stop_ms: parse_var(&lookup, "TYPING_AUTO_STOP_MS")?
                    .unwrap_or_else(default_typing_auto_stop_ms),
            },
            connectivity: ConnectivityConfig {
                probe_interval_ms: parse_var(&lookup, "CONNECTIVITY_PROBE_INTERVAL_MS")?
                    .unwrap_or_else(default_probe_interval_ms),
            },
            redis: match lookup("REDIS_URL") {
                Some(url) => Some(RedisConfig {
                    url,
                    max_connections: parse_var(&lookup, "REDIS_MAX_CONNECTIONS")?
                        .unwrap_or_else(default_redis_max_connections),
                }),
                None => None,
            },
        })
    }

    /// Backend configuration, required by components that talk to the backend
    pub fn require_remote(&self) -> Result<&RemoteConfig, ConfigError> {
        self.remote.as_ref().ok_or(ConfigError::MissingVar("BACKEND_URL"))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_environment_is_production() {
        assert!(!Environment::Development.is_production());
        assert!(!Environment::Staging.is_production());
        assert!(Environment::Production.is_production());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("PRODUCTION".parse::<Environment>().unwrap(), Environment::Production);
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_defaults_without_env() {
        let config = load(&[]).unwrap();
        assert_eq!(config.app.name, "tour-sync");
        assert_eq!(config.app.env, Environment::Development);
        assert!(config.remote.is_none());
        assert!(config.redis.is_none());
        assert_eq!(config.offline.settle_delay(), Duration::from_millis(2000));
        assert_eq!(config.offline.max_concurrency, 4);
        assert!(config.offline.resolve_timeout().is_none());
        assert_eq!(config.typing.auto_stop(), Duration::from_millis(3000));
        assert_eq!(config.connectivity.probe_interval_ms, 5000);
        assert!(matches!(
            config.require_remote(),
            Err(ConfigError::MissingVar("BACKEND_URL"))
        ));
    }

    #[test]
    fn test_remote_and_overrides() {
        let config = load(&[
            ("BACKEND_URL", "https://backend.example.com/"),
            ("BACKEND_API_KEY", "anon"),
            ("DOCUMENTS_BUCKET", "vouchers"),
            ("SYNC_SETTLE_DELAY_MS", "500"),
            ("SYNC_RESOLVE_TIMEOUT_MS", "8000"),
            ("REDIS_URL", "redis://localhost:6380"),
            ("APP_ENV", "staging"),
        ])
        .unwrap();

        let remote = config.require_remote().unwrap();
        assert_eq!(remote.url, "https://backend.example.com");
        assert_eq!(remote.documents_table, "documents");
        assert_eq!(remote.documents_bucket, "vouchers");
        assert_eq!(remote.signed_url_expiry_secs, 3600);
        assert_eq!(config.offline.settle_delay_ms, 500);
        assert_eq!(config.offline.resolve_timeout(), Some(Duration::from_secs(8)));
        assert_eq!(config.redis.unwrap().max_connections, 10);
        assert_eq!(config.app.env, Environment::Staging);
    }

    #[test]
    fn test_missing_api_key() {
        let err = load(&[("BACKEND_URL", "https://backend.example.com")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("BACKEND_API_KEY")));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = load(&[("TYPING_AUTO_STOP_MS", "soon")]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for TYPING_AUTO_STOP_MS: soon");

        let err = load(&[("SYNC_MAX_CONCURRENCY", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("SYNC_MAX_CONCURRENCY", _)));
    }
}
