//! Driver management.

use std::sync::Arc;

use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::models::{Driver, DriverDetails, DriverId, DriverInput, EntityKind};
use crate::store::EntityStore;

/// Creates, reads, updates and deletes drivers.
#[derive(Clone)]
pub struct DriverService {
    store: Arc<dyn EntityStore>,
}

impl DriverService {
    /// Creates a service over `store`.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Registers a driver; the license must not be taken.
    pub async fn create(&self, input: DriverInput) -> EngineResult<Driver> {
        input.validate()?;
        self.ensure_license_free(&input.license, None).await?;

        let driver = self.store.create_driver(&input).await?;
        info!(driver_id = %driver.id, "Driver created");
        Ok(driver)
    }

    /// Fetches a driver with their deliveries; `None` when absent.
    pub async fn read(&self, id: DriverId) -> EngineResult<Option<DriverDetails>> {
        Ok(self.store.find_driver(id).await?)
    }

    /// Fetches every driver.
    pub async fn read_all(&self) -> EngineResult<Vec<Driver>> {
        Ok(self.store.list_drivers().await?)
    }

    /// Replaces a driver's fields.
    pub async fn update(&self, id: DriverId, input: DriverInput) -> EngineResult<Driver> {
        input.validate()?;
        self.ensure_license_free(&input.license, Some(id)).await?;

        let driver = self.store.update_driver(id, &input).await?;
        info!(driver_id = %driver.id, "Driver updated");
        Ok(driver)
    }

    /// Deletes a driver. Fails with `ReferentialViolation` while deliveries
    /// still reference them.
    pub async fn delete(&self, id: DriverId) -> EngineResult<()> {
        self.store.delete_driver(id).await?;
        info!(driver_id = %id, "Driver deleted");
        Ok(())
    }

    async fn ensure_license_free(
        &self,
        license: &str,
        owner: Option<DriverId>,
    ) -> EngineResult<()> {
        match self.store.find_driver_by_license(license).await? {
            Some(existing) if Some(existing.id) != owner => Err(EngineError::DuplicateEntry {
                entity: EntityKind::Driver,
                field: "license".to_string(),
                value: license.to_string(),
            }),
            _ => Ok(()),
        }
    }
}
