//! Request extraction for the fleet API.
//!
//! Bodies and path ids are extracted as `Result`s so malformed requests get
//! the same JSON error body as every other failure.

use axum::{
    Json,
    extract::{
        Path,
        rejection::{JsonRejection, PathRejection},
    },
};
use tracing::warn;
use uuid::Uuid;

use super::response::{ApiError, ApiErrorResponse};

/// Unwraps a JSON body or turns the rejection into a 400 response.
pub(crate) fn read_json<T>(
    payload: Result<Json<T>, JsonRejection>,
    correlation_id: Uuid,
) -> Result<T, ApiErrorResponse> {
    let rejection = match payload {
        Ok(Json(body)) => return Ok(body),
        Err(rejection) => rejection,
    };

    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            // The body text carries serde's field-level message
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") || body_text.contains("unknown variant") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };

    Err(ApiErrorResponse::bad_request(error))
}

/// Unwraps a numeric `:id` path segment.
pub(crate) fn read_id(
    path: Result<Path<i64>, PathRejection>,
    correlation_id: Uuid,
) -> Result<i64, ApiErrorResponse> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(rejection) => {
            warn!(
                correlation_id = %correlation_id,
                error = %rejection.body_text(),
                "Invalid path id"
            );
            Err(ApiErrorResponse::bad_request(ApiError::with_details(
                "INVALID_ID",
                "Path id must be an integer",
                rejection.body_text(),
            )))
        }
    }
}
