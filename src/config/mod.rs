//! Configuration loading and management for the fleet engine.
//!
//! Business-rule constants (quotas, threshold, surcharges) are loaded from
//! YAML files; process settings come from the environment.
//!
//! # Example
//!
//! ```no_run
//! use fleet_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/logistics").unwrap();
//! println!("Driver limit: {}", config.config().admission().driver_monthly_limit);
//! ```

mod loader;
mod settings;
mod types;

pub use loader::ConfigLoader;
pub use settings::ServerSettings;
pub use types::{AdmissionRules, PricingRules, RulesConfig};
