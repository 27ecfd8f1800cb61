//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod events;
#[allow(clippy::missing_errors_doc)]
pub mod labs;

use axum::Router;
use axum::routing::{get, post};

use safelabs_app::ports::{ActuatorStore, EventStore};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<A, ES>() -> Router<AppState<A, ES>>
where
    A: ActuatorStore + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    Router::new()
        .route("/labs/{device_id}/ac", post(labs::set_ac::<A, ES>))
        .route(
            "/devices/{device_id}/events",
            get(events::list_by_device::<A, ES>),
        )
}
