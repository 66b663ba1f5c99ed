//! Business rules for delivery admission and pricing.
//!
//! This module contains the monthly quota checks run before a delivery is
//! written, the pricing and flagging rules that resolve the stored record,
//! and the calendar month window both depend on.

mod admission;
mod month_window;
mod pricing;

pub use admission::{
    AdmissionRequest, AdmissionViolation, LoadSnapshot, check_admission, evaluate_admission,
    gather_load,
};
pub use month_window::MonthWindow;
pub use pricing::{AppliedRule, PricingMode, PricingResult, apply_surcharge, price_delivery};
