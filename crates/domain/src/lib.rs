//! # safelabs-domain
//!
//! Pure domain model for the safelabs lab-monitoring system.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **telemetry snapshots** (the latest reading reported by a device)
//! - Define **actuator state** (the on/off state of a lab's climate control)
//! - Define **audit records** (append-only trail of every action taken)
//! - Define the **automation rules** and the per-device motion history they
//!   depend on
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod actuator;
pub mod audit;
pub mod automation;
pub mod telemetry;
