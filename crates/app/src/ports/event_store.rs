//! Event store port: append-only persistence for audit events.

use std::future::Future;
use std::sync::Arc;

use safelabs_domain::audit::{AuditEvent, AuditRecord};
use safelabs_domain::error::SafeLabsError;
use safelabs_domain::id::DeviceId;

/// Append-only log of [`AuditEvent`]s, one log per device.
pub trait EventStore {
    /// Append a record to the device's log.
    ///
    /// The store assigns the id and a timestamp that never goes backwards
    /// within one device's log.
    fn append(
        &self,
        device_id: &DeviceId,
        record: AuditRecord,
    ) -> impl Future<Output = Result<AuditEvent, SafeLabsError>> + Send;

    /// The most recent `limit` events for a device, oldest first.
    fn find_by_device(
        &self,
        device_id: &DeviceId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<AuditEvent>, SafeLabsError>> + Send;
}

impl<T: EventStore + Send + Sync> EventStore for Arc<T> {
    fn append(
        &self,
        device_id: &DeviceId,
        record: AuditRecord,
    ) -> impl Future<Output = Result<AuditEvent, SafeLabsError>> + Send {
        (**self).append(device_id, record)
    }

    fn find_by_device(
        &self,
        device_id: &DeviceId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<AuditEvent>, SafeLabsError>> + Send {
        (**self).find_by_device(device_id, limit)
    }
}
