//! Actuator service: manual control and audit-log queries.

use safelabs_domain::actuator::ActuatorState;
use safelabs_domain::audit::{AuditEvent, AuditRecord};
use safelabs_domain::error::SafeLabsError;
use safelabs_domain::id::DeviceId;

use crate::audit::AuditEmitter;
use crate::ports::{ActuatorStore, EventStore};

/// Upper bound on the number of events returned by one query.
pub const MAX_EVENT_LIMIT: usize = 1000;

/// Application service for manual actuator changes.
pub struct ActuatorService<A, S> {
    actuators: A,
    audit: AuditEmitter<S>,
}

impl<A: ActuatorStore, S: EventStore> ActuatorService<A, S> {
    /// Create a new service backed by the given stores.
    pub fn new(actuators: A, audit: AuditEmitter<S>) -> Self {
        Self { actuators, audit }
    }

    /// Switch a device's actuator and record the change.
    ///
    /// The actuator is written first; the `ACTION` record is appended only
    /// once the write succeeded.
    ///
    /// # Errors
    ///
    /// Returns a storage error from either store. If the audit append fails
    /// the actuator has already been switched.
    #[tracing::instrument(skip(self))]
    pub async fn set_actuator(
        &self,
        device_id: &DeviceId,
        state: ActuatorState,
        source: Option<&str>,
    ) -> Result<AuditEvent, SafeLabsError> {
        self.actuators.set_state(device_id, state).await?;
        self.audit
            .append(device_id, AuditRecord::manual(state, source))
            .await
            .inspect_err(|err| {
                tracing::error!(
                    device = %device_id,
                    %state,
                    error = %err,
                    "actuator changed without an audit record"
                );
            })
    }

    /// The most recent events for a device, oldest first.
    ///
    /// `limit` is clamped to `1..=MAX_EVENT_LIMIT`.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the event store.
    #[tracing::instrument(skip(self))]
    pub async fn recent_events(
        &self,
        device_id: &DeviceId,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, SafeLabsError> {
        self.audit
            .recent(device_id, limit.clamp(1, MAX_EVENT_LIMIT))
            .await
    }
}
