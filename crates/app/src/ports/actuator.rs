//! Actuator port: read and command a lab's climate control.

use std::future::Future;
use std::sync::Arc;

use safelabs_domain::actuator::ActuatorState;
use safelabs_domain::error::SafeLabsError;
use safelabs_domain::id::DeviceId;

/// Persistent actuator state, shared with manual controls.
///
/// Writes are last-write-wins: the store does no locking between the
/// automation engine and manual callers.
pub trait ActuatorStore {
    /// Current state; a device with no stored value is [`ActuatorState::Off`].
    fn get_state(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<ActuatorState, SafeLabsError>> + Send;

    /// Overwrite the stored state.
    fn set_state(
        &self,
        device_id: &DeviceId,
        state: ActuatorState,
    ) -> impl Future<Output = Result<(), SafeLabsError>> + Send;
}

impl<T: ActuatorStore + Send + Sync> ActuatorStore for Arc<T> {
    fn get_state(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<ActuatorState, SafeLabsError>> + Send {
        (**self).get_state(device_id)
    }

    fn set_state(
        &self,
        device_id: &DeviceId,
        state: ActuatorState,
    ) -> impl Future<Output = Result<(), SafeLabsError>> + Send {
        (**self).set_state(device_id, state)
    }
}
