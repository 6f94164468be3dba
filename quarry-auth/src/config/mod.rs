pub(crate) use crate::config::cache::{CacheConfig, CacheStore};
pub use crate::config::throttle::ThrottleConfig;
pub use crate::config::token::TokenConfig;
use config::{Config as ConfigCrate, ConfigError};
use serde::Deserialize;

pub mod cache;
pub mod throttle;
pub mod token;

/// Main configuration structure for the auth core
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// Access token configuration
    #[serde(default)]
    pub token: TokenConfig,

    /// Login attempt throttle configuration
    #[serde(default)]
    pub throttle: ThrottleConfig,

    /// Authorization cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AuthConfig {
    /// Creates a new config instance from environment variables
    pub fn new() -> Result<Self, String> {
        ConfigCrate::builder()
            .add_source(
                config::Environment::with_prefix("QUARRY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e: ConfigError| e.to_string())?
            .try_deserialize()
            .map_err(|e: ConfigError| e.to_string())
    }
}
