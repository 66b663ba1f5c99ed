//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading rule
//! configurations from YAML files.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};

use super::types::{AdmissionRules, PricingRules, RulesConfig};

/// Loads and provides access to the rule configuration.
///
/// # Directory Structure
///
/// ```text
/// config/logistics/
/// ├── admission.yaml   # Monthly quotas
/// └── pricing.yaml     # Valuable threshold, hazardous cargo, surcharges
/// ```
///
/// # Example
///
/// ```no_run
/// use fleet_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/logistics").unwrap();
/// println!("Truck limit: {}", loader.config().admission().truck_monthly_limit);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config: RulesConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Fails with `ConfigNotFound` if a file is missing and
    /// `ConfigParseError` if a file is not valid YAML for its type.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let admission = Self::load_yaml::<AdmissionRules>(&path.join("admission.yaml"))?;
        let pricing = Self::load_yaml::<PricingRules>(&path.join("pricing.yaml"))?;

        Ok(Self {
            config: RulesConfig::new(admission, pricing),
        })
    }

    /// Wraps an already-built configuration.
    pub fn from_config(config: RulesConfig) -> Self {
        Self { config }
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the underlying rule configuration.
    pub fn config(&self) -> &RulesConfig {
        &self.config
    }
}
