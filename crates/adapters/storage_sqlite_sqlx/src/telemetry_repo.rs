//! [`TelemetryReader`] over the node tree.

use safelabs_app::ports::TelemetryReader;
use safelabs_domain::error::SafeLabsError;
use safelabs_domain::id::DeviceId;
use safelabs_domain::telemetry::DeviceSnapshot;

use crate::error::StorageError;
use crate::nodes::{SqliteNodeStore, telemetry_path};

impl TelemetryReader for SqliteNodeStore {
    async fn get_snapshot(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<DeviceSnapshot>, SafeLabsError> {
        let Some(value) = self.get(&telemetry_path(device_id)).await? else {
            return Ok(None);
        };
        let snapshot = serde_json::from_value(value).map_err(StorageError::from)?;
        Ok(Some(snapshot))
    }
}
