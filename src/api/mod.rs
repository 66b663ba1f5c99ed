//! HTTP API module for the fleet engine.
//!
//! This module provides the REST endpoints for managing trucks, drivers and
//! deliveries, all mounted under `/api`.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use response::{ApiError, ApiErrorResponse, ViolationBody};
pub use state::AppState;
