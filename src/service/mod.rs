//! Orchestration services.
//!
//! Each service owns an injected [`EntityStore`](crate::store::EntityStore)
//! handle and composes validation, the business rules and store calls into
//! the create/read/read-all/update/delete operations the API exposes.

mod delivery;
mod driver;
mod truck;

pub use delivery::DeliveryService;
pub use driver::DriverService;
pub use truck::TruckService;
