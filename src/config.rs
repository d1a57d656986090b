// 7.0 config.rs: all settings in one place. engine rules, operator, logging.
// 7.1 Environment presets pick sane defaults per deployment; JSON files override them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::account::Identity;
use crate::engine::EngineConfig;

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> MarketplaceConfig {
        match self {
            Environment::Development => MarketplaceConfig::default(),
            Environment::Testnet => MarketplaceConfig::testnet(),
            Environment::Mainnet => MarketplaceConfig::mainnet(),
        }
    }
}

/** 7.2: the complete marketplace configuration */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    pub environment: Environment,
    pub engine: EngineConfig,
    // tracing EnvFilter directive used when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            engine: EngineConfig {
                max_events: 10_000,
                allow_free_energy: true, // handy for local experiments
                operator: None,
            },
            log_filter: "debug".to_string(),
        }
    }
}

impl MarketplaceConfig {
    pub fn testnet() -> Self {
        Self {
            environment: Environment::Testnet,
            engine: EngineConfig::default(),
            log_filter: "info".to_string(),
        }
    }

    // Mainnet needs an operator before validate() passes
    pub fn mainnet() -> Self {
        Self {
            environment: Environment::Mainnet,
            engine: EngineConfig {
                max_events: 100_000,
                allow_free_energy: false,
                operator: None,
            },
            log_filter: "info".to_string(),
        }
    }

    pub fn with_operator(mut self, operator: Identity) -> Self {
        self.engine.operator = Some(operator);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_events == 0 {
            return Err(ConfigError::InvalidEngine {
                reason: "max_events must be at least 1".to_string(),
            });
        }

        if let Some(operator) = self.engine.operator {
            if operator.is_zero() {
                return Err(ConfigError::InvalidEngine {
                    reason: "operator cannot be the zero address".to_string(),
                });
            }
        }

        if self.environment == Environment::Mainnet {
            if self.engine.operator.is_none() {
                return Err(ConfigError::MissingOperator);
            }
            if self.engine.allow_free_energy {
                return Err(ConfigError::InvalidEngine {
                    reason: "free energy offers are not allowed on mainnet".to_string(),
                });
            }
        }

        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::InvalidLogging {
                reason: "log_filter cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid engine config: {reason}")]
    InvalidEngine { reason: String },

    #[error("Mainnet requires an operator identity")]
    MissingOperator,

    #[error("Invalid logging config: {reason}")]
    InvalidLogging { reason: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },
}
