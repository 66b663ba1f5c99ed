//! Fleet engine: trucks, drivers and deliveries for a logistics back office.
//!
//! This crate admits deliveries against monthly truck, driver and destination
//! quotas, prices them with destination surcharges and risk flags, and
//! exposes truck, driver and delivery management over HTTP.

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod rules;
pub mod service;
pub mod store;
