//! Axum router assembly.

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use safelabs_app::ports::{ActuatorStore, EventStore};

use crate::state::AppState;

/// Name reported by the health endpoint.
pub const SERVICE_NAME: &str = "safelabsd";

#[derive(Serialize)]
struct Health {
    status: &'static str,
    service: &'static str,
}

/// Build the top-level axum [`Router`].
///
/// Nests the API routes under `/api` and adds a [`TraceLayer`] that logs each
/// HTTP request/response at the `DEBUG` level using the `tracing` ecosystem.
pub fn build<A, ES>(state: AppState<A, ES>) -> Router
where
    A: ActuatorStore + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<Health> {
    Json(Health {
        status: "ok",
        service: SERVICE_NAME,
    })
}
