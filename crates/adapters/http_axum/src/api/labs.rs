//! JSON REST handlers for lab actuators.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use safelabs_app::ports::{ActuatorStore, EventStore};
use safelabs_domain::actuator::ActuatorState;
use safelabs_domain::id::DeviceId;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for switching a lab's air conditioning.
///
/// `status` must be a JSON boolean; anything else is a 400.
#[derive(Deserialize)]
pub struct SetAcRequest {
    pub status: bool,
    /// Who asked for the change (`dashboard`, `api`, …). Defaults to `API`.
    #[serde(default)]
    pub source: Option<String>,
}

/// Body returned once the change is applied and audited.
#[derive(Debug, Serialize)]
pub struct SetAcBody {
    pub success: bool,
    pub state: bool,
}

/// Possible responses from the set endpoint.
pub enum SetAcResponse {
    Ok(Json<SetAcBody>),
}

impl IntoResponse for SetAcResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `POST /api/labs/{device_id}/ac`: switch the actuator and record an `ACTION` event.
pub async fn set_ac<A, ES>(
    State(state): State<AppState<A, ES>>,
    Path(device_id): Path<String>,
    body: Result<Json<SetAcRequest>, JsonRejection>,
) -> Result<SetAcResponse, ApiError>
where
    A: ActuatorStore + Send + Sync + 'static,
    ES: EventStore + Send + Sync + 'static,
{
    let device_id = DeviceId::new(device_id)?;
    let Json(req) = body?;
    let target = ActuatorState::from(req.status);
    state
        .actuator_service
        .set_actuator(&device_id, target, req.source.as_deref())
        .await?;
    Ok(SetAcResponse::Ok(Json(SetAcBody {
        success: true,
        state: target.is_on(),
    })))
}
