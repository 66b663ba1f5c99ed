//! Application state for the fleet API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::config::ConfigLoader;
use crate::service::{DeliveryService, DriverService, TruckService};
use crate::store::EntityStore;

/// Shared application state.
///
/// Holds the loaded business rules and the services, all built over the
/// same injected entity store.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ConfigLoader>,
    trucks: TruckService,
    drivers: DriverService,
    deliveries: DeliveryService,
}

impl AppState {
    /// Creates a new application state over `store` with the given rules.
    pub fn new(config: ConfigLoader, store: Arc<dyn EntityStore>) -> Self {
        let deliveries = DeliveryService::new(Arc::clone(&store), config.config().clone());
        Self {
            config: Arc::new(config),
            trucks: TruckService::new(Arc::clone(&store)),
            drivers: DriverService::new(Arc::clone(&store)),
            deliveries,
        }
    }

    /// Returns a reference to the configuration loader.
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }

    /// The truck service.
    pub fn trucks(&self) -> &TruckService {
        &self.trucks
    }

    /// The driver service.
    pub fn drivers(&self) -> &DriverService {
        &self.drivers
    }

    /// The delivery service.
    pub fn deliveries(&self) -> &DeliveryService {
        &self.deliveries
    }
}
