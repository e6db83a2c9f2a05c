//! Layered application configuration

mod app_config;

pub use app_config::{
    AiConfig, AppConfig, LogFormat, LoggingConfig, QuotaConfig, ServerConfig, StorageBackend,
    StorageConfig,
};
