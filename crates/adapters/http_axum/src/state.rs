//! Shared application state for axum handlers.

use std::sync::Arc;

use safelabs_app::ports::{ActuatorStore, EventStore};
use safelabs_app::services::actuator_service::ActuatorService;

/// Application state shared across all axum handlers.
///
/// `Clone` is implemented manually so the underlying types themselves do not
/// need to be `Clone`: only the `Arc` wrapper is cloned.
pub struct AppState<A, ES> {
    /// Manual actuator control and audit-log queries.
    pub actuator_service: Arc<ActuatorService<A, ES>>,
}

impl<A, ES> Clone for AppState<A, ES> {
    fn clone(&self) -> Self {
        Self {
            actuator_service: Arc::clone(&self.actuator_service),
        }
    }
}

impl<A, ES> AppState<A, ES>
where
    A: ActuatorStore + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    /// Create a new application state from a service instance.
    pub fn new(actuator_service: ActuatorService<A, ES>) -> Self {
        Self {
            actuator_service: Arc::new(actuator_service),
        }
    }
}
