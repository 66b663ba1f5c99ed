//! Entity store collaborator.
//!
//! The services talk to persistence only through the traits defined here, so
//! the same orchestration runs against Postgres in production and against
//! [`MemoryStore`] in tests.
//!
//! Writes that depend on admission checks go through a [`StoreTransaction`]:
//! the quota reads and the insert/update share one transactional scope, and
//! dropping a transaction without calling [`StoreTransaction::commit`] rolls
//! it back.

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{EngineError, ReferenceFailure};
use crate::models::{
    Delivery, DeliveryDetails, DeliveryId, Destination, Driver, DriverDetails, DriverId,
    DriverInput, EntityKind, NewDelivery, Truck, TruckDetails, TruckId, TruckInput,
};
use crate::rules::MonthWindow;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Failures reported by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record addressed by the operation does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// The kind of record.
        entity: EntityKind,
        /// The missing id.
        id: i64,
    },

    /// A write names a truck or driver that does not exist.
    #[error("foreign key violation: {entity} {id} does not exist")]
    ForeignKey {
        /// The referenced kind of record.
        entity: EntityKind,
        /// The referenced id.
        id: i64,
    },

    /// A delete is blocked by records that still reference the target.
    #[error("{entity} {id} is still referenced")]
    StillReferenced {
        /// The kind of record being deleted.
        entity: EntityKind,
        /// Its id.
        id: i64,
    },

    /// A unique constraint would be broken.
    #[error("unique violation on {entity}.{field}: '{value}'")]
    UniqueViolation {
        /// The kind of record.
        entity: EntityKind,
        /// The unique field.
        field: String,
        /// The colliding value.
        value: String,
    },

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// A type alias for Results that return StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for EngineError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            StoreError::ForeignKey { entity, id } => EngineError::ReferentialViolation {
                entity,
                id,
                failure: ReferenceFailure::Missing,
            },
            StoreError::StillReferenced { entity, id } => EngineError::ReferentialViolation {
                entity,
                id,
                failure: ReferenceFailure::StillReferenced,
            },
            StoreError::UniqueViolation {
                entity,
                field,
                value,
            } => EngineError::DuplicateEntry {
                entity,
                field,
                value,
            },
            StoreError::Backend(message) => EngineError::UnknownFailure { message },
        }
    }
}

/// Read queries the admission checker runs over a calendar month.
///
/// Each count may leave out one delivery, so an update is not counted
/// against its own quota.
#[async_trait]
pub trait DeliveryQueries: Send {
    /// Counts deliveries loaded on `truck_id` inside `window`.
    async fn count_truck_deliveries(
        &mut self,
        truck_id: TruckId,
        window: MonthWindow,
        exclude: Option<DeliveryId>,
    ) -> StoreResult<u64>;

    /// Counts deliveries assigned to `driver_id` inside `window`.
    async fn count_driver_deliveries(
        &mut self,
        driver_id: DriverId,
        window: MonthWindow,
        exclude: Option<DeliveryId>,
    ) -> StoreResult<u64>;

    /// Counts deliveries assigned to `driver_id` for `destination` inside `window`.
    async fn count_driver_destination_deliveries(
        &mut self,
        driver_id: DriverId,
        destination: Destination,
        window: MonthWindow,
        exclude: Option<DeliveryId>,
    ) -> StoreResult<u64>;
}

/// A transactional unit covering admission reads and one delivery write.
#[async_trait]
pub trait StoreTransaction: DeliveryQueries {
    /// Locks the truck and driver rows for the rest of the transaction.
    ///
    /// Fails with [`StoreError::ForeignKey`] if either does not exist.
    async fn lock_assignment(
        &mut self,
        truck_id: TruckId,
        driver_id: DriverId,
    ) -> StoreResult<()>;

    /// Locks an existing delivery and returns it as currently stored.
    ///
    /// Fails with [`StoreError::NotFound`].
    async fn lock_delivery(&mut self, id: DeliveryId) -> StoreResult<Delivery>;

    /// Inserts a priced delivery and returns the row as stored.
    async fn insert_delivery(&mut self, delivery: NewDelivery) -> StoreResult<Delivery>;

    /// Replaces every field of an existing delivery.
    async fn update_delivery(
        &mut self,
        id: DeliveryId,
        delivery: NewDelivery,
    ) -> StoreResult<Delivery>;

    /// Makes the transaction's writes visible.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// CRUD and query operations over trucks, drivers and deliveries.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Creates a truck.
    async fn create_truck(&self, input: &TruckInput) -> StoreResult<Truck>;
    /// Fetches a truck with its deliveries.
    async fn find_truck(&self, id: TruckId) -> StoreResult<Option<TruckDetails>>;
    /// Fetches a truck by license plate.
    async fn find_truck_by_plate(&self, license_plate: &str) -> StoreResult<Option<Truck>>;
    /// Lists every truck.
    async fn list_trucks(&self) -> StoreResult<Vec<Truck>>;
    /// Replaces a truck's fields.
    async fn update_truck(&self, id: TruckId, input: &TruckInput) -> StoreResult<Truck>;
    /// Deletes a truck that no delivery references.
    async fn delete_truck(&self, id: TruckId) -> StoreResult<()>;

    /// Creates a driver.
    async fn create_driver(&self, input: &DriverInput) -> StoreResult<Driver>;
    /// Fetches a driver with their deliveries.
    async fn find_driver(&self, id: DriverId) -> StoreResult<Option<DriverDetails>>;
    /// Fetches a driver by identifying document.
    async fn find_driver_by_license(&self, license: &str) -> StoreResult<Option<Driver>>;
    /// Lists every driver.
    async fn list_drivers(&self) -> StoreResult<Vec<Driver>>;
    /// Replaces a driver's fields.
    async fn update_driver(&self, id: DriverId, input: &DriverInput) -> StoreResult<Driver>;
    /// Deletes a driver that no delivery references.
    async fn delete_driver(&self, id: DriverId) -> StoreResult<()>;

    /// Fetches a delivery with its truck and driver.
    async fn find_delivery(&self, id: DeliveryId) -> StoreResult<Option<DeliveryDetails>>;
    /// Lists every delivery with its truck and driver.
    async fn list_deliveries(&self) -> StoreResult<Vec<DeliveryDetails>>;
    /// Deletes a delivery.
    async fn delete_delivery(&self, id: DeliveryId) -> StoreResult<()>;

    /// Opens a transaction for an admission-checked write.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;
}
