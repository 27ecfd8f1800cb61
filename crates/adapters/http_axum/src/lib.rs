//! # safelabs-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Expose manual actuator control (`POST /api/labs/{device_id}/ac`)
//! - Expose the per-device audit log (`GET /api/devices/{device_id}/events`)
//! - Map application results into JSON responses and errors into status codes
//!
//! ## Dependency rule
//! Depends on `safelabs-app` (for port traits and services) and `safelabs-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
