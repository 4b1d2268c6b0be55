//! Service configuration.
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! TOML file, and `ORDERS_`-prefixed environment variables
//! (`ORDERS_BATCH_SIZE=5`).

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Name clients resolve to find the service's addresses.
    pub service_name: String,
    /// Addresses the service is reachable at.
    pub addresses: Vec<String>,
    /// Order ids per consolidation window.
    pub batch_size: usize,
    /// Mailbox capacity of the store actor.
    pub store_buffer: usize,
    /// Frames buffered per stream direction.
    pub stream_buffer: usize,
    /// Applied to calls whose options carry no timeout.
    pub default_timeout_ms: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "order-management".to_string(),
            addresses: vec!["localhost:50051".to_string(), "localhost:50052".to_string()],
            batch_size: 3,
            store_buffer: 32,
            stream_buffer: 16,
            default_timeout_ms: None,
        }
    }
}

impl ServiceConfig {
    /// Loads defaults, then `path` when given and present, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        Self::from_figment(figment.merge(Env::prefixed("ORDERS_")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".to_string()));
        }
        if self.store_buffer == 0 {
            return Err(ConfigError::Invalid("store_buffer must be at least 1".to_string()));
        }
        if self.service_name.is_empty() {
            return Err(ConfigError::Invalid("service_name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}
