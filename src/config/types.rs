//! Configuration types for delivery admission and pricing.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::{CargoType, Destination};

/// Monthly quota configuration from admission.yaml.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AdmissionRules {
    /// Deliveries a truck may carry in one calendar month.
    pub truck_monthly_limit: u32,
    /// Deliveries a driver may be assigned in one calendar month.
    pub driver_monthly_limit: u32,
    /// Per-driver monthly caps for specific destinations.
    #[serde(default)]
    pub destination_monthly_limits: HashMap<Destination, u32>,
}

impl Default for AdmissionRules {
    fn default() -> Self {
        Self {
            truck_monthly_limit: 4,
            driver_monthly_limit: 2,
            destination_monthly_limits: HashMap::from([(Destination::Northeast, 1)]),
        }
    }
}

/// Pricing and flagging configuration from pricing.yaml.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PricingRules {
    /// Declared values strictly above this are flagged valuable.
    pub valuable_threshold: Decimal,
    /// Cargo categories always flagged dangerous.
    pub hazardous_cargo: Vec<CargoType>,
    /// Multipliers applied to the value by destination. Destinations not
    /// listed are charged at 1.
    #[serde(default)]
    pub surcharges: HashMap<Destination, Decimal>,
}

impl PricingRules {
    /// Returns the surcharge multiplier for a destination.
    pub fn surcharge_for(&self, destination: Destination) -> Decimal {
        self.surcharges
            .get(&destination)
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    /// Returns true if the cargo category is hazardous.
    pub fn is_hazardous(&self, cargo_type: CargoType) -> bool {
        self.hazardous_cargo.contains(&cargo_type)
    }
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            valuable_threshold: Decimal::new(30000, 0),
            hazardous_cargo: vec![CargoType::Fuel],
            surcharges: HashMap::from([
                (Destination::Northeast, Decimal::new(120, 2)),
                (Destination::Argentina, Decimal::new(140, 2)),
                (Destination::Amazon, Decimal::new(130, 2)),
            ]),
        }
    }
}

/// The complete rule configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RulesConfig {
    admission: AdmissionRules,
    pricing: PricingRules,
}

impl RulesConfig {
    /// Creates a new RulesConfig from its component parts.
    pub fn new(admission: AdmissionRules, pricing: PricingRules) -> Self {
        Self { admission, pricing }
    }

    /// Returns the admission rules.
    pub fn admission(&self) -> &AdmissionRules {
        &self.admission
    }

    /// Returns the pricing rules.
    pub fn pricing(&self) -> &PricingRules {
        &self.pricing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_default_surcharges() {
        let pricing = PricingRules::default();
        assert_eq!(
            pricing.surcharge_for(Destination::Northeast),
            Decimal::from_str("1.20").unwrap()
        );
        assert_eq!(
            pricing.surcharge_for(Destination::Argentina),
            Decimal::from_str("1.40").unwrap()
        );
        assert_eq!(
            pricing.surcharge_for(Destination::Amazon),
            Decimal::from_str("1.30").unwrap()
        );
        assert_eq!(pricing.surcharge_for(Destination::Other), Decimal::ONE);
    }

    #[test]
    fn test_only_fuel_is_hazardous_by_default() {
        let pricing = PricingRules::default();
        assert!(pricing.is_hazardous(CargoType::Fuel));
        assert!(!pricing.is_hazardous(CargoType::Standard));
        assert!(!pricing.is_hazardous(CargoType::Electronics));
    }

    #[test]
    fn test_admission_yaml_deserializes_destination_keys() {
        let yaml = r#"
truck_monthly_limit: 4
driver_monthly_limit: 2
destination_monthly_limits:
  northeast: 1
"#;
        let rules: AdmissionRules = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rules, AdmissionRules::default());
    }
}
