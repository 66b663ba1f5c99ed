//! Delivery pricing and risk flagging.
//!
//! Turns a raw delivery input into the record that gets stored: unset flags
//! default to `false`, the valuable and dangerous flags are forced on by the
//! value threshold and cargo type, and on creation the destination surcharge
//! is applied to the value exactly once.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::PricingRules;
use crate::error::{EngineError, EngineResult};
use crate::models::{DeliveryInput, NewDelivery, VALUE_SCALE, value_limit};

/// Whether the submitted value is declared or already stored.
///
/// The stored value is already surcharged, so an update never applies the
/// surcharge again and never compares it against the valuable threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingMode {
    /// A new delivery: the submitted value is the declared, pre-surcharge amount.
    Creation,
    /// An existing delivery: the submitted value is kept as is.
    Update {
        /// The valuable flag currently stored, carried onto the new record.
        stored_valuable: bool,
    },
}

/// A pricing rule that changed the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRule {
    /// Identifier of the rule.
    pub rule_id: &'static str,
    /// Human-readable explanation of what it did.
    pub reasoning: String,
}

/// The result of pricing a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingResult {
    /// The priced record, ready to be written.
    pub delivery: NewDelivery,
    /// Rules that changed the record, in application order.
    pub applied_rules: Vec<AppliedRule>,
}

/// Prices a delivery and resolves its flags.
///
/// On creation the valuable threshold is checked against the declared value
/// before any surcharge. On update the stored valuable flag is carried
/// instead. Flags are only ever forced on, never cleared.
///
/// # Errors
///
/// `InvalidInput` on `value` when the surcharged value reaches
/// [`value_limit`](crate::models::value_limit).
///
/// # Examples
///
/// ```
/// use fleet_engine::config::PricingRules;
/// use fleet_engine::models::{CargoType, DeliveryInput, Destination, DriverId, TruckId};
/// use fleet_engine::rules::{price_delivery, PricingMode};
/// use rust_decimal::Decimal;
///
/// let input = DeliveryInput {
///     cargo_type: CargoType::Fuel,
///     value: Decimal::new(40000, 0),
///     destination: Destination::Argentina,
///     delivery_time: "2026-10-05T14:00:00Z".parse().unwrap(),
///     truck_id: TruckId(1),
///     driver_id: DriverId(1),
///     insurance: None,
///     dangerous: None,
///     valuable: None,
/// };
///
/// let result = price_delivery(&input, PricingMode::Creation, &PricingRules::default()).unwrap();
/// assert_eq!(result.delivery.value, Decimal::new(56000, 0));
/// assert!(result.delivery.dangerous);
/// assert!(result.delivery.valuable);
/// ```
pub fn price_delivery(
    input: &DeliveryInput,
    mode: PricingMode,
    rules: &PricingRules,
) -> EngineResult<PricingResult> {
    let mut applied_rules = Vec::new();

    let insurance = input.insurance.unwrap_or(false);
    let mut dangerous = input.dangerous.unwrap_or(false);
    let mut valuable = input.valuable.unwrap_or(false);
    let mut value = input.value;

    match mode {
        PricingMode::Creation if input.value > rules.valuable_threshold => {
            valuable = true;
            applied_rules.push(AppliedRule {
                rule_id: "valuable_threshold",
                reasoning: format!(
                    "value {} exceeds {}, flagged valuable",
                    input.value, rules.valuable_threshold
                ),
            });
        }
        PricingMode::Update {
            stored_valuable: true,
        } if !valuable => {
            valuable = true;
            applied_rules.push(AppliedRule {
                rule_id: "valuable_kept",
                reasoning: "stored delivery is valuable, flag kept".to_string(),
            });
        }
        _ => {}
    }

    if rules.is_hazardous(input.cargo_type) {
        dangerous = true;
        applied_rules.push(AppliedRule {
            rule_id: "hazardous_cargo",
            reasoning: format!("{} cargo is always dangerous", input.cargo_type),
        });
    }

    if mode == PricingMode::Creation {
        let multiplier = rules.surcharge_for(input.destination);
        if multiplier != Decimal::ONE {
            value = apply_surcharge(input.value, multiplier)?;
            applied_rules.push(AppliedRule {
                rule_id: "destination_surcharge",
                reasoning: format!(
                    "{} x {} ({}) = {}",
                    input.value,
                    multiplier.normalize(),
                    input.destination,
                    value
                ),
            });
        }
    }

    Ok(PricingResult {
        delivery: NewDelivery {
            cargo_type: input.cargo_type,
            value,
            destination: input.destination,
            delivery_time: input.delivery_time,
            truck_id: input.truck_id,
            driver_id: input.driver_id,
            insurance,
            dangerous,
            valuable,
        },
        applied_rules,
    })
}

/// Multiplies a value by a surcharge, rounding half away from zero to cents.
///
/// Fails with `InvalidInput` on `value` when the product overflows or
/// reaches [`value_limit`](crate::models::value_limit).
pub fn apply_surcharge(value: Decimal, multiplier: Decimal) -> EngineResult<Decimal> {
    let surcharged = value
        .checked_mul(multiplier)
        .map(|v| v.round_dp_with_strategy(VALUE_SCALE, RoundingStrategy::MidpointAwayFromZero));

    match surcharged {
        Some(surcharged) if surcharged < value_limit() => Ok(surcharged),
        _ => Err(EngineError::InvalidInput {
            field: "value".to_string(),
            message: format!(
                "{} x {} exceeds the storable maximum",
                value,
                multiplier.normalize()
            ),
        }),
    }
}
