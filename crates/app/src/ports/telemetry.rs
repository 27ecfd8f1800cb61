//! Telemetry port: read access to the latest snapshot per device.

use std::future::Future;
use std::sync::Arc;

use safelabs_domain::error::SafeLabsError;
use safelabs_domain::id::DeviceId;
use safelabs_domain::telemetry::DeviceSnapshot;

/// Reads the most recent telemetry a device has reported.
pub trait TelemetryReader {
    /// Fetch the latest snapshot, or `None` if the device never reported.
    fn get_snapshot(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<DeviceSnapshot>, SafeLabsError>> + Send;
}

impl<T: TelemetryReader + Send + Sync> TelemetryReader for Arc<T> {
    fn get_snapshot(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<DeviceSnapshot>, SafeLabsError>> + Send {
        (**self).get_snapshot(device_id)
    }
}
