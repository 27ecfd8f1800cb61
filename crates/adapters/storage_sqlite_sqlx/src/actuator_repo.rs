//! [`ActuatorStore`] over the node tree. The state is stored as a bare JSON boolean.

use safelabs_app::ports::ActuatorStore;
use safelabs_domain::actuator::ActuatorState;
use safelabs_domain::error::SafeLabsError;
use safelabs_domain::id::DeviceId;

use crate::error::StorageError;
use crate::nodes::{SqliteNodeStore, actuator_path};

impl ActuatorStore for SqliteNodeStore {
    async fn get_state(&self, device_id: &DeviceId) -> Result<ActuatorState, SafeLabsError> {
        let path = actuator_path(device_id);
        match self.get(&path).await? {
            None => Ok(ActuatorState::Off),
            Some(serde_json::Value::Bool(on)) => Ok(ActuatorState::from(on)),
            Some(other) => Err(StorageError::UnexpectedValue {
                path,
                found: other.to_string(),
            }
            .into()),
        }
    }

    async fn set_state(
        &self,
        device_id: &DeviceId,
        state: ActuatorState,
    ) -> Result<(), SafeLabsError> {
        self.set(
            &actuator_path(device_id),
            &serde_json::Value::Bool(state.is_on()),
        )
        .await?;
        Ok(())
    }
}
