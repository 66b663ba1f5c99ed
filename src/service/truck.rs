//! Truck management.

use std::sync::Arc;

use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::models::{EntityKind, Truck, TruckDetails, TruckId, TruckInput};
use crate::store::EntityStore;

/// Creates, reads, updates and deletes trucks.
#[derive(Clone)]
pub struct TruckService {
    store: Arc<dyn EntityStore>,
}

impl TruckService {
    /// Creates a service over `store`.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Registers a truck; the plate must not be taken.
    pub async fn create(&self, input: TruckInput) -> EngineResult<Truck> {
        input.validate()?;
        self.ensure_plate_free(&input.license_plate, None).await?;

        let truck = self.store.create_truck(&input).await?;
        info!(truck_id = %truck.id, license_plate = %truck.license_plate, "Truck created");
        Ok(truck)
    }

    /// Fetches a truck with its deliveries; `None` when absent.
    pub async fn read(&self, id: TruckId) -> EngineResult<Option<TruckDetails>> {
        Ok(self.store.find_truck(id).await?)
    }

    /// Fetches every truck.
    pub async fn read_all(&self) -> EngineResult<Vec<Truck>> {
        Ok(self.store.list_trucks().await?)
    }

    /// Replaces a truck's fields.
    pub async fn update(&self, id: TruckId, input: TruckInput) -> EngineResult<Truck> {
        input.validate()?;
        self.ensure_plate_free(&input.license_plate, Some(id)).await?;

        let truck = self.store.update_truck(id, &input).await?;
        info!(truck_id = %truck.id, "Truck updated");
        Ok(truck)
    }

    /// Deletes a truck. Fails with `ReferentialViolation` while deliveries
    /// still reference it.
    pub async fn delete(&self, id: TruckId) -> EngineResult<()> {
        self.store.delete_truck(id).await?;
        info!(truck_id = %id, "Truck deleted");
        Ok(())
    }

    async fn ensure_plate_free(&self, plate: &str, owner: Option<TruckId>) -> EngineResult<()> {
        match self.store.find_truck_by_plate(plate).await? {
            Some(existing) if Some(existing.id) != owner => Err(EngineError::DuplicateEntry {
                entity: EntityKind::Truck,
                field: "license_plate".to_string(),
                value: plate.to_string(),
            }),
            _ => Ok(()),
        }
    }
}
