//! Core data models for the fleet engine.
//!
//! This module contains the truck, driver and delivery records along with
//! the inbound shapes the services accept.

mod delivery;
mod driver;
mod truck;

pub use delivery::{
    CargoType, Delivery, DeliveryDetails, DeliveryId, DeliveryInput, Destination, NewDelivery,
    VALUE_SCALE, value_limit,
};
pub use driver::{Driver, DriverDetails, DriverId, DriverInput};
pub use truck::{Truck, TruckDetails, TruckId, TruckInput};

/// The kinds of record the engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A truck.
    Truck,
    /// A driver.
    Driver,
    /// A delivery.
    Delivery,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Truck => write!(f, "truck"),
            EntityKind::Driver => write!(f, "driver"),
            EntityKind::Delivery => write!(f, "delivery"),
        }
    }
}
