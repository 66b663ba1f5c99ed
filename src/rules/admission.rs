//! Delivery admission checks.
//!
//! Before a delivery is created or updated, the truck's and driver's load in
//! the delivery's calendar month is measured and compared against the
//! configured quotas. Every violated rule is collected so the caller gets all
//! reasons at once.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::AdmissionRules;
use crate::error::{EngineError, EngineResult};
use crate::models::{DeliveryId, DeliveryInput, Destination, DriverId, TruckId};
use crate::store::{DeliveryQueries, StoreResult};

use super::MonthWindow;

/// What an admission check is asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionRequest {
    /// The truck to load.
    pub truck_id: TruckId,
    /// The driver to assign.
    pub driver_id: DriverId,
    /// Destination of the delivery.
    pub destination: Destination,
    /// Timestamp whose calendar month the quotas are counted in.
    pub reference_time: DateTime<Utc>,
    /// A delivery left out of every count (the one being updated).
    pub exclude: Option<DeliveryId>,
}

impl AdmissionRequest {
    /// Builds a request for a delivery input, counted in the month of its
    /// scheduled time.
    pub fn for_input(input: &DeliveryInput) -> Self {
        Self {
            truck_id: input.truck_id,
            driver_id: input.driver_id,
            destination: input.destination,
            reference_time: input.delivery_time,
            exclude: None,
        }
    }

    /// Leaves `id` out of every count.
    pub fn excluding(mut self, id: DeliveryId) -> Self {
        self.exclude = Some(id);
        self
    }

    /// The month the quotas are counted in.
    pub fn window(&self) -> MonthWindow {
        MonthWindow::containing(self.reference_time)
    }
}

/// A single violated admission rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionViolation {
    /// The truck already carries its monthly quota.
    TruckQuota {
        /// The truck.
        truck_id: TruckId,
        /// Deliveries already loaded this month.
        count: u64,
        /// The monthly limit.
        limit: u32,
    },
    /// The driver already has their monthly quota.
    DriverQuota {
        /// The driver.
        driver_id: DriverId,
        /// Deliveries already assigned this month.
        count: u64,
        /// The monthly limit.
        limit: u32,
    },
    /// The driver already reached the monthly cap for a destination.
    DestinationRepeat {
        /// The driver.
        driver_id: DriverId,
        /// The capped destination.
        destination: Destination,
        /// Deliveries to that destination already assigned this month.
        count: u64,
        /// The monthly cap.
        limit: u32,
    },
}

impl AdmissionViolation {
    /// Machine-readable reason code, e.g. `truck_quota` or `northeast_repeat`.
    pub fn code(&self) -> String {
        match self {
            AdmissionViolation::TruckQuota { .. } => "truck_quota".to_string(),
            AdmissionViolation::DriverQuota { .. } => "driver_quota".to_string(),
            AdmissionViolation::DestinationRepeat { destination, .. } => {
                format!("{}_repeat", destination)
            }
        }
    }
}

impl std::fmt::Display for AdmissionViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionViolation::TruckQuota {
                truck_id, limit, ..
            } => write!(
                f,
                "truck {} already has {} deliveries this month and cannot take more",
                truck_id, limit
            ),
            AdmissionViolation::DriverQuota {
                driver_id, limit, ..
            } => write!(
                f,
                "driver {} already reached the limit of {} deliveries per month",
                driver_id, limit
            ),
            AdmissionViolation::DestinationRepeat {
                driver_id,
                destination,
                limit,
                ..
            } => write!(
                f,
                "driver {} already has {} {} delivery this month",
                driver_id, limit, destination
            ),
        }
    }
}

/// Current monthly load of the truck and driver named in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSnapshot {
    /// Deliveries on the truck this month.
    pub truck_deliveries: u64,
    /// Deliveries assigned to the driver this month.
    pub driver_deliveries: u64,
    /// Driver's deliveries to the requested destination this month. `None`
    /// when that destination has no cap.
    pub destination_deliveries: Option<u64>,
}

/// Reads the monthly load relevant to `request`.
pub async fn gather_load<Q>(
    queries: &mut Q,
    request: &AdmissionRequest,
    rules: &AdmissionRules,
) -> StoreResult<LoadSnapshot>
where
    Q: DeliveryQueries + ?Sized,
{
    let window = request.window();

    let truck_deliveries = queries
        .count_truck_deliveries(request.truck_id, window, request.exclude)
        .await?;

    let driver_deliveries = queries
        .count_driver_deliveries(request.driver_id, window, request.exclude)
        .await?;

    let destination_deliveries = if rules
        .destination_monthly_limits
        .contains_key(&request.destination)
    {
        Some(
            queries
                .count_driver_destination_deliveries(
                    request.driver_id,
                    request.destination,
                    window,
                    request.exclude,
                )
                .await?,
        )
    } else {
        None
    };

    Ok(LoadSnapshot {
        truck_deliveries,
        driver_deliveries,
        destination_deliveries,
    })
}

/// Evaluates every admission rule against a load snapshot.
///
/// Returns the violated rules in a fixed order (truck, driver, destination);
/// an empty list means the delivery is admitted.
///
/// # Example
///
/// ```
/// use fleet_engine::config::AdmissionRules;
/// use fleet_engine::models::{Destination, DriverId, TruckId};
/// use fleet_engine::rules::{evaluate_admission, AdmissionRequest, LoadSnapshot};
///
/// let request = AdmissionRequest {
///     truck_id: TruckId(1),
///     driver_id: DriverId(1),
///     destination: Destination::Other,
///     reference_time: "2026-10-05T10:00:00Z".parse().unwrap(),
///     exclude: None,
/// };
/// let load = LoadSnapshot {
///     truck_deliveries: 4,
///     driver_deliveries: 0,
///     destination_deliveries: None,
/// };
/// let violations = evaluate_admission(&request, &load, &AdmissionRules::default());
/// assert_eq!(violations.len(), 1);
/// assert_eq!(violations[0].code(), "truck_quota");
/// ```
pub fn evaluate_admission(
    request: &AdmissionRequest,
    load: &LoadSnapshot,
    rules: &AdmissionRules,
) -> Vec<AdmissionViolation> {
    let mut violations = Vec::new();

    if load.truck_deliveries >= u64::from(rules.truck_monthly_limit) {
        violations.push(AdmissionViolation::TruckQuota {
            truck_id: request.truck_id,
            count: load.truck_deliveries,
            limit: rules.truck_monthly_limit,
        });
    }

    if load.driver_deliveries >= u64::from(rules.driver_monthly_limit) {
        violations.push(AdmissionViolation::DriverQuota {
            driver_id: request.driver_id,
            count: load.driver_deliveries,
            limit: rules.driver_monthly_limit,
        });
    }

    if let (Some(&limit), Some(count)) = (
        rules.destination_monthly_limits.get(&request.destination),
        load.destination_deliveries,
    ) {
        if count >= u64::from(limit) {
            violations.push(AdmissionViolation::DestinationRepeat {
                driver_id: request.driver_id,
                destination: request.destination,
                count,
                limit,
            });
        }
    }

    violations
}

/// Runs the admission check, failing with `AdmissionRejected` carrying every
/// violated rule.
///
/// Only reads are issued through `queries`.
pub async fn check_admission<Q>(
    queries: &mut Q,
    request: &AdmissionRequest,
    rules: &AdmissionRules,
) -> EngineResult<()>
where
    Q: DeliveryQueries + ?Sized,
{
    let load = gather_load(queries, request, rules).await?;
    let violations = evaluate_admission(request, &load, rules);

    if violations.is_empty() {
        return Ok(());
    }

    warn!(
        truck_id = %request.truck_id,
        driver_id = %request.driver_id,
        destination = %request.destination,
        reasons = ?violations.iter().map(AdmissionViolation::code).collect::<Vec<_>>(),
        "Delivery admission rejected"
    );

    Err(EngineError::AdmissionRejected { violations })
}
