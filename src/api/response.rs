//! Response types for the fleet API.
//!
//! This module defines the error response structures and maps engine errors
//! to HTTP status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, ReferenceFailure};
use crate::rules::AdmissionViolation;

/// A single rejected admission rule in an error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationBody {
    /// Reason code, e.g. `truck_quota`.
    pub code: String,
    /// Human-readable reason.
    pub message: String,
}

impl From<&AdmissionViolation> for ViolationBody {
    fn from(violation: &AdmissionViolation) -> Self {
        Self {
            code: violation.code(),
            message: violation.to_string(),
        }
    }
}

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Every violated admission rule, on admission rejections only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<ViolationBody>>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            violations: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::new(code, message)
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
#[derive(Debug)]
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// A 400 response carrying `error`.
    pub fn bad_request(error: ApiError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let message = error.to_string();
        match error {
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                ApiErrorResponse {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: ApiError::with_details("CONFIG_ERROR", "Configuration error", message),
                }
            }
            EngineError::InvalidInput { field, .. } => ApiErrorResponse::bad_request(
                ApiError::with_details(
                    "VALIDATION_ERROR",
                    message,
                    format!("The field '{}' contains invalid information", field),
                ),
            ),
            EngineError::AdmissionRejected { violations } => ApiErrorResponse {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                error: ApiError {
                    violations: Some(violations.iter().map(ViolationBody::from).collect()),
                    ..ApiError::new("ADMISSION_REJECTED", message)
                },
            },
            EngineError::ReferentialViolation {
                failure: ReferenceFailure::Missing,
                ..
            } => ApiErrorResponse::bad_request(ApiError::with_details(
                "REFERENCE_NOT_FOUND",
                message,
                "The delivery names a truck or driver that does not exist",
            )),
            EngineError::ReferentialViolation {
                failure: ReferenceFailure::StillReferenced,
                ..
            } => ApiErrorResponse {
                status: StatusCode::CONFLICT,
                error: ApiError::with_details(
                    "STILL_REFERENCED",
                    message,
                    "Delete the deliveries that reference it first",
                ),
            },
            EngineError::NotFound { .. } => ApiErrorResponse {
                status: StatusCode::NOT_FOUND,
                error: ApiError::new("NOT_FOUND", message),
            },
            EngineError::DuplicateEntry { .. } => ApiErrorResponse {
                status: StatusCode::CONFLICT,
                error: ApiError::new("DUPLICATE_ENTRY", message),
            },
            EngineError::UnknownFailure { .. } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::new("UNKNOWN_FAILURE", "The request could not be completed"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Destination, DriverId, EntityKind, TruckId};

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"code\":\"TEST_ERROR\""));
        assert!(json.contains("\"message\":\"Test message\""));
        assert!(!json.contains("details"));
        assert!(!json.contains("violations"));
    }

    #[test]
    fn test_admission_rejection_is_422_with_every_reason() {
        let error = EngineError::AdmissionRejected {
            violations: vec![
                AdmissionViolation::TruckQuota {
                    truck_id: TruckId(1),
                    count: 4,
                    limit: 4,
                },
                AdmissionViolation::DestinationRepeat {
                    driver_id: DriverId(2),
                    destination: Destination::Northeast,
                    count: 1,
                    limit: 1,
                },
            ],
        };

        let response: ApiErrorResponse = error.into();
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
        let codes: Vec<_> = response
            .error
            .violations
            .unwrap()
            .into_iter()
            .map(|v| v.code)
            .collect();
        assert_eq!(codes, vec!["truck_quota", "northeast_repeat"]);
    }

    #[test]
    fn test_reference_failures_map_to_distinct_statuses() {
        let missing: ApiErrorResponse = EngineError::ReferentialViolation {
            entity: EntityKind::Truck,
            id: 9,
            failure: ReferenceFailure::Missing,
        }
        .into();
        assert_eq!(missing.status, StatusCode::BAD_REQUEST);
        assert_eq!(missing.error.code, "REFERENCE_NOT_FOUND");

        let blocked: ApiErrorResponse = EngineError::ReferentialViolation {
            entity: EntityKind::Driver,
            id: 3,
            failure: ReferenceFailure::StillReferenced,
        }
        .into();
        assert_eq!(blocked.status, StatusCode::CONFLICT);
        assert_eq!(blocked.error.code, "STILL_REFERENCED");
    }

    #[test]
    fn test_unknown_failure_hides_backend_message() {
        let response: ApiErrorResponse = EngineError::UnknownFailure {
            message: "password authentication failed".to_string(),
        }
        .into();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.error.message.contains("password"));
    }
}
