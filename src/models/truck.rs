//! Truck model and related types.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::Delivery;

/// Identifier of a truck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TruckId(pub i64);

impl std::fmt::Display for TruckId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A truck that can be loaded with deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truck {
    /// Unique identifier for the truck.
    pub id: TruckId,
    /// License plate, unique across the fleet (e.g. "ABC1234").
    pub license_plate: String,
    /// Optional model descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// A truck together with every delivery it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruckDetails {
    /// The truck itself.
    #[serde(flatten)]
    pub truck: Truck,
    /// Deliveries referencing the truck.
    pub deliveries: Vec<Delivery>,
}

/// Fields supplied when creating or replacing a truck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruckInput {
    /// License plate: three letters followed by four digits.
    pub license_plate: String,
    /// Optional model descriptor.
    #[serde(default)]
    pub model: Option<String>,
}

impl TruckInput {
    /// Checks the plate format.
    ///
    /// # Examples
    ///
    /// ```
    /// use fleet_engine::models::TruckInput;
    ///
    /// let input = TruckInput {
    ///     license_plate: "ABC1234".to_string(),
    ///     model: None,
    /// };
    /// assert!(input.validate().is_ok());
    /// ```
    pub fn validate(&self) -> EngineResult<()> {
        let plate = self.license_plate.as_bytes();
        let well_formed = plate.len() == 7
            && plate[..3].iter().all(u8::is_ascii_alphabetic)
            && plate[3..].iter().all(u8::is_ascii_digit);

        if !well_formed {
            return Err(EngineError::InvalidInput {
                field: "license_plate".to_string(),
                message: "must be 3 letters followed by 4 digits".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(plate: &str) -> TruckInput {
        TruckInput {
            license_plate: plate.to_string(),
            model: Some("Volvo FH".to_string()),
        }
    }

    #[test]
    fn test_valid_plate_accepted() {
        assert!(input("ABC1234").validate().is_ok());
        assert!(input("xyz0000").validate().is_ok());
    }

    #[test]
    fn test_short_plate_rejected() {
        let result = input("AB1234").validate();
        match result {
            Err(EngineError::InvalidInput { field, .. }) => assert_eq!(field, "license_plate"),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_digits_before_letters_rejected() {
        assert!(input("1234ABC").validate().is_err());
        assert!(input("ABCD123").validate().is_err());
    }

    #[test]
    fn test_non_ascii_plate_rejected() {
        assert!(input("ÁBC1234").validate().is_err());
    }

    #[test]
    fn test_truck_without_model_omits_field() {
        let truck = Truck {
            id: TruckId(3),
            license_plate: "ABC1234".to_string(),
            model: None,
        };
        let json = serde_json::to_value(&truck).unwrap();
        assert_eq!(json["id"], 3);
        assert!(json.get("model").is_none());
    }
}
