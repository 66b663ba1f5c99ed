//! Delivery model and related types.
//!
//! A delivery moves one cargo to one destination at a scheduled time, carried
//! by exactly one truck and driven by exactly one driver. The stored `value`
//! is always the post-surcharge amount.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

use super::{Driver, DriverId, Truck, TruckId};

/// Decimal places a stored value may carry.
pub const VALUE_SCALE: u32 = 2;

/// Integer digits a stored value may carry.
const VALUE_DIGITS: u32 = 14;

/// Exclusive upper bound on any stored value, declared or surcharged.
pub fn value_limit() -> Decimal {
    Decimal::from(10_i64.pow(VALUE_DIGITS))
}

/// Identifier of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryId(pub i64);

impl std::fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category of cargo carried by a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CargoType {
    /// General goods.
    Standard,
    /// Fuel; hazardous.
    Fuel,
    /// Electronic equipment.
    Electronics,
    /// Food and other perishables.
    Perishable,
}

impl CargoType {
    /// Wire and storage name of the cargo type.
    pub fn as_str(&self) -> &'static str {
        match self {
            CargoType::Standard => "standard",
            CargoType::Fuel => "fuel",
            CargoType::Electronics => "electronics",
            CargoType::Perishable => "perishable",
        }
    }
}

impl std::fmt::Display for CargoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CargoType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(CargoType::Standard),
            "fuel" => Ok(CargoType::Fuel),
            "electronics" => Ok(CargoType::Electronics),
            "perishable" => Ok(CargoType::Perishable),
            other => Err(EngineError::InvalidInput {
                field: "type".to_string(),
                message: format!("unknown cargo type '{}'", other),
            }),
        }
    }
}

/// Destination region of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// The Northeast region.
    Northeast,
    /// Cross-border to Argentina.
    Argentina,
    /// The Amazon region.
    Amazon,
    /// Any other destination.
    Other,
}

impl Destination {
    /// Wire and storage name of the destination.
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Northeast => "northeast",
            Destination::Argentina => "argentina",
            Destination::Amazon => "amazon",
            Destination::Other => "other",
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Destination {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "northeast" => Ok(Destination::Northeast),
            "argentina" => Ok(Destination::Argentina),
            "amazon" => Ok(Destination::Amazon),
            "other" => Ok(Destination::Other),
            other => Err(EngineError::InvalidInput {
                field: "destination".to_string(),
                message: format!("unknown destination '{}'", other),
            }),
        }
    }
}

/// A persisted delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    /// Unique identifier for the delivery.
    pub id: DeliveryId,
    /// Cargo category.
    #[serde(rename = "type")]
    pub cargo_type: CargoType,
    /// Charged value, after any destination surcharge.
    pub value: Decimal,
    /// Destination region.
    pub destination: Destination,
    /// Scheduled delivery time.
    pub delivery_time: DateTime<Utc>,
    /// The truck carrying the delivery.
    pub truck_id: TruckId,
    /// The driver assigned to the delivery.
    pub driver_id: DriverId,
    /// Whether the delivery is insured.
    pub insurance: bool,
    /// Whether the cargo is hazardous.
    pub dangerous: bool,
    /// Whether the declared value is above the valuable threshold.
    pub valuable: bool,
}

/// A delivery with its truck and driver resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    /// The delivery itself.
    #[serde(flatten)]
    pub delivery: Delivery,
    /// The truck carrying it.
    pub truck: Truck,
    /// The driver assigned to it.
    pub driver: Driver,
}

/// A priced delivery ready to be written; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDelivery {
    /// Cargo category.
    #[serde(rename = "type")]
    pub cargo_type: CargoType,
    /// Charged value, after any destination surcharge.
    pub value: Decimal,
    /// Destination region.
    pub destination: Destination,
    /// Scheduled delivery time.
    pub delivery_time: DateTime<Utc>,
    /// The truck carrying the delivery.
    pub truck_id: TruckId,
    /// The driver assigned to the delivery.
    pub driver_id: DriverId,
    /// Whether the delivery is insured.
    pub insurance: bool,
    /// Whether the cargo is hazardous.
    pub dangerous: bool,
    /// Whether the declared value is above the valuable threshold.
    pub valuable: bool,
}

impl NewDelivery {
    /// Attaches the store-assigned id.
    pub fn with_id(self, id: DeliveryId) -> Delivery {
        Delivery {
            id,
            cargo_type: self.cargo_type,
            value: self.value,
            destination: self.destination,
            delivery_time: self.delivery_time,
            truck_id: self.truck_id,
            driver_id: self.driver_id,
            insurance: self.insurance,
            dangerous: self.dangerous,
            valuable: self.valuable,
        }
    }
}

/// Raw delivery fields as submitted for creation or update.
///
/// The flags are optional; unset flags default to `false` before the
/// pricing rules run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInput {
    /// Cargo category.
    #[serde(rename = "type")]
    pub cargo_type: CargoType,
    /// Declared value. On creation this is the pre-surcharge amount.
    pub value: Decimal,
    /// Destination region.
    pub destination: Destination,
    /// Scheduled delivery time.
    pub delivery_time: DateTime<Utc>,
    /// The truck to load.
    pub truck_id: TruckId,
    /// The driver to assign.
    pub driver_id: DriverId,
    /// Requested insurance.
    #[serde(default)]
    pub insurance: Option<bool>,
    /// Caller-declared hazard flag.
    #[serde(default)]
    pub dangerous: Option<bool>,
    /// Caller-declared valuable flag.
    #[serde(default)]
    pub valuable: Option<bool>,
}

impl DeliveryInput {
    /// Checks that the declared value and references are usable.
    ///
    /// The value must be positive, below [`value_limit`] and carry at most
    /// [`VALUE_SCALE`] decimal places.
    pub fn validate(&self) -> EngineResult<()> {
        if self.value <= Decimal::ZERO {
            return Err(EngineError::InvalidInput {
                field: "value".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.value >= value_limit() {
            return Err(EngineError::InvalidInput {
                field: "value".to_string(),
                message: format!("must be below {}", value_limit()),
            });
        }
        if self.value.normalize().scale() > VALUE_SCALE {
            return Err(EngineError::InvalidInput {
                field: "value".to_string(),
                message: format!("must have at most {} decimal places", VALUE_SCALE),
            });
        }
        if self.truck_id.0 <= 0 {
            return Err(EngineError::InvalidInput {
                field: "truck_id".to_string(),
                message: "must be a positive id".to_string(),
            });
        }
        if self.driver_id.0 <= 0 {
            return Err(EngineError::InvalidInput {
                field: "driver_id".to_string(),
                message: "must be a positive id".to_string(),
            });
        }
        Ok(())
    }
}
