//! Driver model and related types.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::Delivery;

/// Length of a driver's identifying document number.
const LICENSE_LENGTH: usize = 11;

/// Identifier of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverId(pub i64);

impl std::fmt::Display for DriverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A driver who can be assigned deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    /// Unique identifier for the driver.
    pub id: DriverId,
    /// Full name.
    pub name: String,
    /// Identifying document number, unique across drivers.
    pub license: String,
}

/// A driver together with every delivery assigned to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverDetails {
    /// The driver itself.
    #[serde(flatten)]
    pub driver: Driver,
    /// Deliveries referencing the driver.
    pub deliveries: Vec<Delivery>,
}

/// Fields supplied when creating or replacing a driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInput {
    /// Full name, letters and spaces only.
    pub name: String,
    /// Identifying document, exactly 11 digits.
    pub license: String,
}

impl DriverInput {
    /// Checks the name and document formats.
    ///
    /// # Examples
    ///
    /// ```
    /// use fleet_engine::models::DriverInput;
    ///
    /// let input = DriverInput {
    ///     name: "Ana Souza".to_string(),
    ///     license: "12345678901".to_string(),
    /// };
    /// assert!(input.validate().is_ok());
    ///
    /// let bad = DriverInput {
    ///     name: "Al".to_string(),
    ///     license: "12345678901".to_string(),
    /// };
    /// assert!(bad.validate().is_err());
    /// ```
    pub fn validate(&self) -> EngineResult<()> {
        if self.name.chars().count() < 3 {
            return Err(EngineError::InvalidInput {
                field: "name".to_string(),
                message: "must have at least 3 characters".to_string(),
            });
        }

        if !self
            .name
            .chars()
            .all(|c| c.is_alphabetic() || c.is_whitespace())
        {
            return Err(EngineError::InvalidInput {
                field: "name".to_string(),
                message: "must contain only letters and spaces".to_string(),
            });
        }

        if self.license.len() != LICENSE_LENGTH
            || !self.license.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(EngineError::InvalidInput {
                field: "license".to_string(),
                message: format!("must be exactly {} digits", LICENSE_LENGTH),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, license: &str) -> DriverInput {
        DriverInput {
            name: name.to_string(),
            license: license.to_string(),
        }
    }

    fn rejected_field(input: DriverInput) -> String {
        match input.validate() {
            Err(EngineError::InvalidInput { field, .. }) => field,
            other => panic!("Expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_accented_name_accepted() {
        assert!(input("João Conceição", "98765432100").validate().is_ok());
    }

    #[test]
    fn test_short_name_rejected() {
        assert_eq!(rejected_field(input("Jo", "98765432100")), "name");
    }

    #[test]
    fn test_name_with_digits_rejected() {
        assert_eq!(rejected_field(input("Driver 7", "98765432100")), "name");
    }

    #[test]
    fn test_license_length_enforced() {
        assert_eq!(rejected_field(input("Maria", "1234567890")), "license");
        assert_eq!(rejected_field(input("Maria", "123456789012")), "license");
    }

    #[test]
    fn test_license_must_be_numeric() {
        assert_eq!(rejected_field(input("Maria", "1234567890a")), "license");
    }
}
