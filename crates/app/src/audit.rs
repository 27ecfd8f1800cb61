//! Audit emitter: the single path through which audit records are written.
//!
//! Both the automation engine and manual actuator control append through
//! here, so every action is logged the same way. A failed append is always
//! returned to the caller; a missing audit record is itself a defect.

use safelabs_domain::audit::{AuditEvent, AuditRecord};
use safelabs_domain::error::SafeLabsError;
use safelabs_domain::id::DeviceId;

use crate::ports::EventStore;

/// Appends audit records to a device's event log.
pub struct AuditEmitter<S> {
    store: S,
}

impl<S: EventStore> AuditEmitter<S> {
    /// Create an emitter writing to `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying event store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Append one immutable record to the device's log.
    ///
    /// # Errors
    ///
    /// Returns the store's error unchanged.
    pub async fn append(
        &self,
        device_id: &DeviceId,
        record: AuditRecord,
    ) -> Result<AuditEvent, SafeLabsError> {
        let event_type = record.event_type;
        match self.store.append(device_id, record).await {
            Ok(event) => {
                tracing::info!(
                    device = %device_id,
                    %event_type,
                    event_id = %event.id,
                    message = %event.record.message,
                    "audit event recorded"
                );
                Ok(event)
            }
            Err(err) => {
                tracing::warn!(device = %device_id, %event_type, error = %err, "failed to record audit event");
                Err(err)
            }
        }
    }

    /// The most recent `limit` events for a device, oldest first.
    ///
    /// # Errors
    ///
    /// Returns the store's error unchanged.
    pub async fn recent(
        &self,
        device_id: &DeviceId,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, SafeLabsError> {
        self.store.find_by_device(device_id, limit).await
    }
}
