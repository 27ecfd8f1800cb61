//! # safelabs-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `TelemetryReader`: latest snapshot per device
//!   - `ActuatorStore`: read/write actuator state
//!   - `EventStore`: append & query audit events
//!   - `Clock`: current time, injectable for tests
//! - Define **driving/inbound** use-cases:
//!   - `AutomationEngine`: periodic evaluation of every monitored device
//!   - `ActuatorService`: manual actuator control and audit log queries
//! - Route every audit write through the `AuditEmitter`
//!
//! ## Dependency rule
//! Depends on `safelabs-domain` only (plus `tokio` for timers and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod audit;
pub mod automation_engine;
pub mod ports;
pub mod services;
