//! JSON REST handlers for the audit log.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use safelabs_app::ports::{ActuatorStore, EventStore};
use safelabs_domain::audit::AuditEvent;
use safelabs_domain::id::DeviceId;

use crate::error::ApiError;
use crate::state::AppState;

/// Number of events returned when the caller does not ask for a positive count.
pub const DEFAULT_LIMIT: usize = 50;

/// Query string for the list endpoint.
#[derive(Deserialize)]
pub struct ListQuery {
    /// Kept as text so that malformed values fall back to the default.
    pub limit: Option<String>,
}

impl ListQuery {
    fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_LIMIT)
    }
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<AuditEvent>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/devices/{device_id}/events?limit=N`: most recent events, oldest first.
pub async fn list_by_device<A, ES>(
    State(state): State<AppState<A, ES>>,
    Path(device_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<ListResponse, ApiError>
where
    A: ActuatorStore + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    let device_id = DeviceId::new(device_id)?;
    let events = state
        .actuator_service
        .recent_events(&device_id, query.limit())
        .await?;
    Ok(ListResponse::Ok(Json(events)))
}
