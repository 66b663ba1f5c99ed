//! Error types for the fleet engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the delivery, truck and driver operations can report.
//! None of these carry transport concerns; the API layer decides how each
//! one is rendered.

use thiserror::Error;

use crate::models::EntityKind;
use crate::rules::AdmissionViolation;

/// Why a reference between a delivery and a truck or driver is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceFailure {
    /// A delivery names a truck or driver that does not exist.
    Missing,
    /// A truck or driver cannot be removed while deliveries point at it.
    StillReferenced,
}

impl std::fmt::Display for ReferenceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceFailure::Missing => write!(f, "does not exist"),
            ReferenceFailure::StillReferenced => write!(f, "is still referenced by deliveries"),
        }
    }
}

/// The main error type for the fleet engine.
///
/// # Example
///
/// ```
/// use fleet_engine::error::EngineError;
/// use fleet_engine::models::EntityKind;
///
/// let error = EngineError::NotFound {
///     entity: EntityKind::Delivery,
///     id: 42,
/// };
/// assert_eq!(error.to_string(), "delivery 42 not found");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A field of an inbound truck, driver or delivery record is malformed.
    #[error("Invalid field '{field}': {message}")]
    InvalidInput {
        /// The offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// One or more monthly admission rules reject the delivery.
    #[error("Delivery rejected: {}", join_reasons(.violations))]
    AdmissionRejected {
        /// Every rule that was violated, in evaluation order. Never empty.
        violations: Vec<AdmissionViolation>,
    },

    /// A delivery/truck/driver reference is invalid.
    #[error("{entity} {id} {failure}")]
    ReferentialViolation {
        /// The referenced entity.
        entity: EntityKind,
        /// The referenced id.
        id: i64,
        /// Which direction the reference failed in.
        failure: ReferenceFailure,
    },

    /// The target of an operation does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// The kind of record looked up.
        entity: EntityKind,
        /// The id that was looked up.
        id: i64,
    },

    /// A unique field collides with an existing record.
    #[error("{entity} with {field} '{value}' already exists")]
    DuplicateEntry {
        /// The kind of record.
        entity: EntityKind,
        /// The unique field.
        field: String,
        /// The colliding value.
        value: String,
    },

    /// An unclassified store failure.
    #[error("Unknown failure: {message}")]
    UnknownFailure {
        /// The underlying error text.
        message: String,
    },
}

fn join_reasons(violations: &[AdmissionViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Destination, DriverId, TruckId};

    #[test]
    fn test_config_not_found_displays_path() {
        let error = EngineError::ConfigNotFound {
            path: "/missing/admission.yaml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found: /missing/admission.yaml"
        );
    }

    #[test]
    fn test_invalid_input_displays_field_and_message() {
        let error = EngineError::InvalidInput {
            field: "license_plate".to_string(),
            message: "must be 3 letters followed by 4 digits".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid field 'license_plate': must be 3 letters followed by 4 digits"
        );
    }

    #[test]
    fn test_admission_rejected_joins_every_reason() {
        let error = EngineError::AdmissionRejected {
            violations: vec![
                AdmissionViolation::TruckQuota {
                    truck_id: TruckId(1),
                    count: 4,
                    limit: 4,
                },
                AdmissionViolation::DestinationRepeat {
                    driver_id: DriverId(7),
                    destination: Destination::Northeast,
                    count: 1,
                    limit: 1,
                },
            ],
        };
        let text = error.to_string();
        assert!(text.starts_with("Delivery rejected: "));
        assert!(text.contains("truck 1"));
        assert!(text.contains(" | "));
        assert!(text.contains("northeast"));
    }

    #[test]
    fn test_referential_violation_displays_direction() {
        let missing = EngineError::ReferentialViolation {
            entity: EntityKind::Truck,
            id: 9,
            failure: ReferenceFailure::Missing,
        };
        assert_eq!(missing.to_string(), "truck 9 does not exist");

        let referenced = EngineError::ReferentialViolation {
            entity: EntityKind::Driver,
            id: 3,
            failure: ReferenceFailure::StillReferenced,
        };
        assert_eq!(
            referenced.to_string(),
            "driver 3 is still referenced by deliveries"
        );
    }

    #[test]
    fn test_duplicate_entry_displays_value() {
        let error = EngineError::DuplicateEntry {
            entity: EntityKind::Truck,
            field: "license_plate".to_string(),
            value: "ABC1234".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "truck with license_plate 'ABC1234' already exists"
        );
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_not_found() -> EngineResult<()> {
            Err(EngineError::NotFound {
                entity: EntityKind::Delivery,
                id: 1,
            })
        }

        fn propagates_error() -> EngineResult<()> {
            returns_not_found()?;
            Ok(())
        }

        assert!(propagates_error().is_err());
    }
}
