//! HTTP request handlers for the fleet API.
//!
//! This module contains the handler functions for all API endpoints. Every
//! request gets a correlation id that is attached to its log lines.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    DeliveryId, DeliveryInput, DriverId, DriverInput, EntityKind, TruckId, TruckInput,
};

use super::request::{read_id, read_json};
use super::response::ApiErrorResponse;
use super::state::AppState;

type JsonBody<T> = Result<Json<T>, JsonRejection>;
type IdPath = Result<Path<i64>, PathRejection>;

/// Creates the API router with all endpoints under `/api`.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/truck", post(create_truck))
        .route("/trucks", get(list_trucks))
        .route(
            "/truck/:id",
            get(get_truck).put(update_truck).delete(delete_truck),
        )
        .route("/driver", post(create_driver))
        .route("/drivers", get(list_drivers))
        .route(
            "/driver/:id",
            get(get_driver).put(update_driver).delete(delete_driver),
        )
        .route("/delivery", post(create_delivery))
        .route("/deliveries", get(list_deliveries))
        .route(
            "/delivery/:id",
            get(get_delivery).put(update_delivery).delete(delete_delivery),
        );

    Router::new().nest("/api", api).with_state(state)
}

/// Tracks one request from arrival to response.
struct RequestScope {
    correlation_id: Uuid,
    operation: &'static str,
    started: Instant,
}

impl RequestScope {
    fn begin(operation: &'static str) -> Self {
        let correlation_id = Uuid::new_v4();
        info!(correlation_id = %correlation_id, operation, "Processing request");
        Self {
            correlation_id,
            operation,
            started: Instant::now(),
        }
    }

    fn fail(&self, error: EngineError) -> Response {
        warn!(
            correlation_id = %self.correlation_id,
            operation = self.operation,
            error = %error,
            "Request failed"
        );
        ApiErrorResponse::from(error).into_response()
    }

    fn finish<T: Serialize>(&self, status: StatusCode, result: EngineResult<T>) -> Response {
        match result {
            Ok(body) => {
                info!(
                    correlation_id = %self.correlation_id,
                    operation = self.operation,
                    status = status.as_u16(),
                    duration_us = self.started.elapsed().as_micros(),
                    "Request completed"
                );
                (status, Json(body)).into_response()
            }
            Err(error) => self.fail(error),
        }
    }

    fn finish_found<T: Serialize>(
        &self,
        entity: EntityKind,
        id: i64,
        result: EngineResult<Option<T>>,
    ) -> Response {
        let result = result.and_then(|found| found.ok_or(EngineError::NotFound { entity, id }));
        self.finish(StatusCode::OK, result)
    }

    fn finish_deleted(&self, result: EngineResult<()>) -> Response {
        match result {
            Ok(()) => {
                info!(
                    correlation_id = %self.correlation_id,
                    operation = self.operation,
                    duration_us = self.started.elapsed().as_micros(),
                    "Request completed"
                );
                StatusCode::NO_CONTENT.into_response()
            }
            Err(error) => self.fail(error),
        }
    }
}

/// Handler for POST /api/truck.
async fn create_truck(State(state): State<AppState>, payload: JsonBody<TruckInput>) -> Response {
    let scope = RequestScope::begin("create_truck");
    let input = match read_json(payload, scope.correlation_id) {
        Ok(input) => input,
        Err(rejection) => return rejection.into_response(),
    };
    scope.finish(StatusCode::CREATED, state.trucks().create(input).await)
}

/// Handler for GET /api/trucks.
async fn list_trucks(State(state): State<AppState>) -> Response {
    let scope = RequestScope::begin("list_trucks");
    scope.finish(StatusCode::OK, state.trucks().read_all().await)
}

/// Handler for GET /api/truck/:id.
async fn get_truck(State(state): State<AppState>, path: IdPath) -> Response {
    let scope = RequestScope::begin("get_truck");
    let id = match read_id(path, scope.correlation_id) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };
    scope.finish_found(EntityKind::Truck, id, state.trucks().read(TruckId(id)).await)
}

/// Handler for PUT /api/truck/:id.
async fn update_truck(
    State(state): State<AppState>,
    path: IdPath,
    payload: JsonBody<TruckInput>,
) -> Response {
    let scope = RequestScope::begin("update_truck");
    let (id, input) = match read_id(path, scope.correlation_id)
        .and_then(|id| Ok((id, read_json(payload, scope.correlation_id)?)))
    {
        Ok(parts) => parts,
        Err(rejection) => return rejection.into_response(),
    };
    scope.finish(StatusCode::OK, state.trucks().update(TruckId(id), input).await)
}

/// Handler for DELETE /api/truck/:id.
async fn delete_truck(State(state): State<AppState>, path: IdPath) -> Response {
    let scope = RequestScope::begin("delete_truck");
    let id = match read_id(path, scope.correlation_id) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };
    scope.finish_deleted(state.trucks().delete(TruckId(id)).await)
}

/// Handler for POST /api/driver.
async fn create_driver(
    State(state): State<AppState>,
    payload: JsonBody<DriverInput>,
) -> Response {
    let scope = RequestScope::begin("create_driver");
    let input = match read_json(payload, scope.correlation_id) {
        Ok(input) => input,
        Err(rejection) => return rejection.into_response(),
    };
    scope.finish(StatusCode::CREATED, state.drivers().create(input).await)
}

/// Handler for GET /api/drivers.
async fn list_drivers(State(state): State<AppState>) -> Response {
    let scope = RequestScope::begin("list_drivers");
    scope.finish(StatusCode::OK, state.drivers().read_all().await)
}

/// Handler for GET /api/driver/:id.
async fn get_driver(State(state): State<AppState>, path: IdPath) -> Response {
    let scope = RequestScope::begin("get_driver");
    let id = match read_id(path, scope.correlation_id) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };
    scope.finish_found(EntityKind::Driver, id, state.drivers().read(DriverId(id)).await)
}

/// Handler for PUT /api/driver/:id.
async fn update_driver(
    State(state): State<AppState>,
    path: IdPath,
    payload: JsonBody<DriverInput>,
) -> Response {
    let scope = RequestScope::begin("update_driver");
    let (id, input) = match read_id(path, scope.correlation_id)
        .and_then(|id| Ok((id, read_json(payload, scope.correlation_id)?)))
    {
        Ok(parts) => parts,
        Err(rejection) => return rejection.into_response(),
    };
    scope.finish(StatusCode::OK, state.drivers().update(DriverId(id), input).await)
}

/// Handler for DELETE /api/driver/:id.
async fn delete_driver(State(state): State<AppState>, path: IdPath) -> Response {
    let scope = RequestScope::begin("delete_driver");
    let id = match read_id(path, scope.correlation_id) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };
    scope.finish_deleted(state.drivers().delete(DriverId(id)).await)
}

/// Handler for POST /api/delivery.
///
/// Runs the admission check and pricing before storing the delivery.
async fn create_delivery(
    State(state): State<AppState>,
    payload: JsonBody<DeliveryInput>,
) -> Response {
    let scope = RequestScope::begin("create_delivery");
    let input = match read_json(payload, scope.correlation_id) {
        Ok(input) => input,
        Err(rejection) => return rejection.into_response(),
    };
    scope.finish(StatusCode::CREATED, state.deliveries().create(input).await)
}

/// Handler for GET /api/deliveries.
async fn list_deliveries(State(state): State<AppState>) -> Response {
    let scope = RequestScope::begin("list_deliveries");
    scope.finish(StatusCode::OK, state.deliveries().read_all().await)
}

/// Handler for GET /api/delivery/:id.
async fn get_delivery(State(state): State<AppState>, path: IdPath) -> Response {
    let scope = RequestScope::begin("get_delivery");
    let id = match read_id(path, scope.correlation_id) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };
    scope.finish_found(
        EntityKind::Delivery,
        id,
        state.deliveries().read(DeliveryId(id)).await,
    )
}

/// Handler for PUT /api/delivery/:id.
async fn update_delivery(
    State(state): State<AppState>,
    path: IdPath,
    payload: JsonBody<DeliveryInput>,
) -> Response {
    let scope = RequestScope::begin("update_delivery");
    let (id, input) = match read_id(path, scope.correlation_id)
        .and_then(|id| Ok((id, read_json(payload, scope.correlation_id)?)))
    {
        Ok(parts) => parts,
        Err(rejection) => return rejection.into_response(),
    };
    scope.finish(
        StatusCode::OK,
        state.deliveries().update(DeliveryId(id), input).await,
    )
}

/// Handler for DELETE /api/delivery/:id.
async fn delete_delivery(State(state): State<AppState>, path: IdPath) -> Response {
    let scope = RequestScope::begin("delete_delivery");
    let id = match read_id(path, scope.correlation_id) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };
    scope.finish_deleted(state.deliveries().delete(DeliveryId(id)).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::config::ConfigLoader;
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_router() -> Router {
        create_router(AppState::new(
            ConfigLoader::default(),
            Arc::new(MemoryStore::new()),
        ))
    }

    async fn send(router: Router, method: &str, uri: &str, body: &str) -> Response {
        router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn error_body(response: Response) -> ApiError {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let response = send(create_test_router(), "POST", "/api/truck", "{invalid json").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_body(response).await.code, "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_missing_field_returns_validation_error() {
        let response = send(create_test_router(), "POST", "/api/driver", r#"{"name":"Ana"}"#).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = error_body(response).await;
        assert_eq!(error.code, "VALIDATION_ERROR");
        assert!(error.message.contains("license"));
    }

    #[tokio::test]
    async fn test_unknown_destination_returns_validation_error() {
        let body = r#"{
            "type": "standard",
            "value": 100,
            "destination": "antarctica",
            "delivery_time": "2026-10-05T10:00:00Z",
            "truck_id": 1,
            "driver_id": 1
        }"#;
        let response = send(create_test_router(), "POST", "/api/delivery", body).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_body(response).await.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_non_numeric_id_returns_400() {
        let response = send(create_test_router(), "GET", "/api/truck/abc", "").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_body(response).await.code, "INVALID_ID");
    }

    #[tokio::test]
    async fn test_missing_truck_returns_404() {
        let response = send(create_test_router(), "GET", "/api/truck/12", "").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error = error_body(response).await;
        assert_eq!(error.code, "NOT_FOUND");
        assert_eq!(error.message, "truck 12 not found");
    }

    #[tokio::test]
    async fn test_invalid_plate_returns_400() {
        let response = send(
            create_test_router(),
            "POST",
            "/api/truck",
            r#"{"license_plate":"1234ABC"}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_body(response).await.code, "VALIDATION_ERROR");
    }
}
