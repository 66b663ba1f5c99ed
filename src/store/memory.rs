//! In-memory entity store.
//!
//! All state sits behind one async mutex. A transaction holds the lock from
//! `begin` until it is committed or dropped, which serializes admission
//! checks the same way a serializable database transaction would. Writes are
//! staged and only applied on commit.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::{
    Delivery, DeliveryDetails, DeliveryId, Destination, Driver, DriverDetails, DriverId,
    DriverInput, EntityKind, NewDelivery, Truck, TruckDetails, TruckId, TruckInput,
};
use crate::rules::MonthWindow;

use super::{DeliveryQueries, EntityStore, StoreError, StoreResult, StoreTransaction};

#[derive(Debug, Default)]
struct MemoryState {
    last_truck_id: i64,
    last_driver_id: i64,
    last_delivery_id: i64,
    trucks: BTreeMap<TruckId, Truck>,
    drivers: BTreeMap<DriverId, Driver>,
    deliveries: BTreeMap<DeliveryId, Delivery>,
}

impl MemoryState {
    fn details(&self, delivery: &Delivery) -> StoreResult<DeliveryDetails> {
        let truck = self
            .trucks
            .get(&delivery.truck_id)
            .cloned()
            .ok_or(StoreError::ForeignKey {
                entity: EntityKind::Truck,
                id: delivery.truck_id.0,
            })?;
        let driver = self
            .drivers
            .get(&delivery.driver_id)
            .cloned()
            .ok_or(StoreError::ForeignKey {
                entity: EntityKind::Driver,
                id: delivery.driver_id.0,
            })?;

        Ok(DeliveryDetails {
            delivery: delivery.clone(),
            truck,
            driver,
        })
    }

    fn check_references(&self, truck_id: TruckId, driver_id: DriverId) -> StoreResult<()> {
        if !self.trucks.contains_key(&truck_id) {
            return Err(StoreError::ForeignKey {
                entity: EntityKind::Truck,
                id: truck_id.0,
            });
        }
        if !self.drivers.contains_key(&driver_id) {
            return Err(StoreError::ForeignKey {
                entity: EntityKind::Driver,
                id: driver_id.0,
            });
        }
        Ok(())
    }

    fn count_where<F>(&self, window: MonthWindow, exclude: Option<DeliveryId>, keep: F) -> u64
    where
        F: Fn(&Delivery) -> bool,
    {
        self.deliveries
            .values()
            .filter(|d| Some(d.id) != exclude)
            .filter(|d| window.contains(d.delivery_time))
            .filter(|d| keep(d))
            .count() as u64
    }

    fn plate_taken(&self, license_plate: &str, except: Option<TruckId>) -> bool {
        self.trucks
            .values()
            .any(|t| t.license_plate == license_plate && Some(t.id) != except)
    }

    fn license_taken(&self, license: &str, except: Option<DriverId>) -> bool {
        self.drivers
            .values()
            .any(|d| d.license == license && Some(d.id) != except)
    }
}

/// An entity store kept in process memory.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn create_truck(&self, input: &TruckInput) -> StoreResult<Truck> {
        let mut state = self.state.lock().await;
        if state.plate_taken(&input.license_plate, None) {
            return Err(StoreError::UniqueViolation {
                entity: EntityKind::Truck,
                field: "license_plate".to_string(),
                value: input.license_plate.clone(),
            });
        }

        state.last_truck_id += 1;
        let truck = Truck {
            id: TruckId(state.last_truck_id),
            license_plate: input.license_plate.clone(),
            model: input.model.clone(),
        };
        state.trucks.insert(truck.id, truck.clone());
        Ok(truck)
    }

    async fn find_truck(&self, id: TruckId) -> StoreResult<Option<TruckDetails>> {
        let state = self.state.lock().await;
        Ok(state.trucks.get(&id).map(|truck| TruckDetails {
            truck: truck.clone(),
            deliveries: state
                .deliveries
                .values()
                .filter(|d| d.truck_id == id)
                .cloned()
                .collect(),
        }))
    }

    async fn find_truck_by_plate(&self, license_plate: &str) -> StoreResult<Option<Truck>> {
        let state = self.state.lock().await;
        Ok(state
            .trucks
            .values()
            .find(|t| t.license_plate == license_plate)
            .cloned())
    }

    async fn list_trucks(&self) -> StoreResult<Vec<Truck>> {
        let state = self.state.lock().await;
        Ok(state.trucks.values().cloned().collect())
    }

    async fn update_truck(&self, id: TruckId, input: &TruckInput) -> StoreResult<Truck> {
        let mut state = self.state.lock().await;
        if !state.trucks.contains_key(&id) {
            return Err(StoreError::NotFound {
                entity: EntityKind::Truck,
                id: id.0,
            });
        }
        if state.plate_taken(&input.license_plate, Some(id)) {
            return Err(StoreError::UniqueViolation {
                entity: EntityKind::Truck,
                field: "license_plate".to_string(),
                value: input.license_plate.clone(),
            });
        }

        let truck = Truck {
            id,
            license_plate: input.license_plate.clone(),
            model: input.model.clone(),
        };
        state.trucks.insert(id, truck.clone());
        Ok(truck)
    }

    async fn delete_truck(&self, id: TruckId) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.trucks.contains_key(&id) {
            return Err(StoreError::NotFound {
                entity: EntityKind::Truck,
                id: id.0,
            });
        }
        if state.deliveries.values().any(|d| d.truck_id == id) {
            return Err(StoreError::StillReferenced {
                entity: EntityKind::Truck,
                id: id.0,
            });
        }
        state.trucks.remove(&id);
        Ok(())
    }

    async fn create_driver(&self, input: &DriverInput) -> StoreResult<Driver> {
        let mut state = self.state.lock().await;
        if state.license_taken(&input.license, None) {
            return Err(StoreError::UniqueViolation {
                entity: EntityKind::Driver,
                field: "license".to_string(),
                value: input.license.clone(),
            });
        }

        state.last_driver_id += 1;
        let driver = Driver {
            id: DriverId(state.last_driver_id),
            name: input.name.clone(),
            license: input.license.clone(),
        };
        state.drivers.insert(driver.id, driver.clone());
        Ok(driver)
    }

    async fn find_driver(&self, id: DriverId) -> StoreResult<Option<DriverDetails>> {
        let state = self.state.lock().await;
        Ok(state.drivers.get(&id).map(|driver| DriverDetails {
            driver: driver.clone(),
            deliveries: state
                .deliveries
                .values()
                .filter(|d| d.driver_id == id)
                .cloned()
                .collect(),
        }))
    }

    async fn find_driver_by_license(&self, license: &str) -> StoreResult<Option<Driver>> {
        let state = self.state.lock().await;
        Ok(state
            .drivers
            .values()
            .find(|d| d.license == license)
            .cloned())
    }

    async fn list_drivers(&self) -> StoreResult<Vec<Driver>> {
        let state = self.state.lock().await;
        Ok(state.drivers.values().cloned().collect())
    }

    async fn update_driver(&self, id: DriverId, input: &DriverInput) -> StoreResult<Driver> {
        let mut state = self.state.lock().await;
        if !state.drivers.contains_key(&id) {
            return Err(StoreError::NotFound {
                entity: EntityKind::Driver,
                id: id.0,
            });
        }
        if state.license_taken(&input.license, Some(id)) {
            return Err(StoreError::UniqueViolation {
                entity: EntityKind::Driver,
                field: "license".to_string(),
                value: input.license.clone(),
            });
        }

        let driver = Driver {
            id,
            name: input.name.clone(),
            license: input.license.clone(),
        };
        state.drivers.insert(id, driver.clone());
        Ok(driver)
    }

    async fn delete_driver(&self, id: DriverId) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if !state.drivers.contains_key(&id) {
            return Err(StoreError::NotFound {
                entity: EntityKind::Driver,
                id: id.0,
            });
        }
        if state.deliveries.values().any(|d| d.driver_id == id) {
            return Err(StoreError::StillReferenced {
                entity: EntityKind::Driver,
                id: id.0,
            });
        }
        state.drivers.remove(&id);
        Ok(())
    }

    async fn find_delivery(&self, id: DeliveryId) -> StoreResult<Option<DeliveryDetails>> {
        let state = self.state.lock().await;
        state
            .deliveries
            .get(&id)
            .map(|delivery| state.details(delivery))
            .transpose()
    }

    async fn list_deliveries(&self) -> StoreResult<Vec<DeliveryDetails>> {
        let state = self.state.lock().await;
        state
            .deliveries
            .values()
            .map(|delivery| state.details(delivery))
            .collect()
    }

    async fn delete_delivery(&self, id: DeliveryId) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        match state.deliveries.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                entity: EntityKind::Delivery,
                id: id.0,
            }),
        }
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            state: guard,
            staged: Vec::new(),
        }))
    }
}

/// A transaction over [`MemoryStore`]; holds the store lock while alive.
struct MemoryTransaction {
    state: OwnedMutexGuard<MemoryState>,
    staged: Vec<Delivery>,
}

#[async_trait]
impl DeliveryQueries for MemoryTransaction {
    async fn count_truck_deliveries(
        &mut self,
        truck_id: TruckId,
        window: MonthWindow,
        exclude: Option<DeliveryId>,
    ) -> StoreResult<u64> {
        Ok(self
            .state
            .count_where(window, exclude, |d| d.truck_id == truck_id))
    }

    async fn count_driver_deliveries(
        &mut self,
        driver_id: DriverId,
        window: MonthWindow,
        exclude: Option<DeliveryId>,
    ) -> StoreResult<u64> {
        Ok(self
            .state
            .count_where(window, exclude, |d| d.driver_id == driver_id))
    }

    async fn count_driver_destination_deliveries(
        &mut self,
        driver_id: DriverId,
        destination: Destination,
        window: MonthWindow,
        exclude: Option<DeliveryId>,
    ) -> StoreResult<u64> {
        Ok(self.state.count_where(window, exclude, |d| {
            d.driver_id == driver_id && d.destination == destination
        }))
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn lock_assignment(
        &mut self,
        truck_id: TruckId,
        driver_id: DriverId,
    ) -> StoreResult<()> {
        self.state.check_references(truck_id, driver_id)
    }

    async fn lock_delivery(&mut self, id: DeliveryId) -> StoreResult<Delivery> {
        let staged = self.staged.iter().rev().find(|d| d.id == id);
        staged
            .or_else(|| self.state.deliveries.get(&id))
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: EntityKind::Delivery,
                id: id.0,
            })
    }

    async fn insert_delivery(&mut self, delivery: NewDelivery) -> StoreResult<Delivery> {
        self.state
            .check_references(delivery.truck_id, delivery.driver_id)?;

        self.state.last_delivery_id += 1;
        let delivery = delivery.with_id(DeliveryId(self.state.last_delivery_id));
        self.staged.push(delivery.clone());
        Ok(delivery)
    }

    async fn update_delivery(
        &mut self,
        id: DeliveryId,
        delivery: NewDelivery,
    ) -> StoreResult<Delivery> {
        self.lock_delivery(id).await?;
        self.state
            .check_references(delivery.truck_id, delivery.driver_id)?;

        let delivery = delivery.with_id(id);
        self.staged.push(delivery.clone());
        Ok(delivery)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction { mut state, staged } = *self;
        for delivery in staged {
            state.deliveries.insert(delivery.id, delivery);
        }
        Ok(())
    }
}
