//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, ConfigError, ConnectivityConfig, Environment, OfflineConfig,
    RedisConfig, RemoteConfig, TypingConfig,
};
