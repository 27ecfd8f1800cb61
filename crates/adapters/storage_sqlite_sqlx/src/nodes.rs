//! Hierarchical value tree stored as one JSON document per path.
//!
//! Paths are slash-separated, e.g. `devices/sensor_node_01/latest`. A path
//! holds a single JSON value; writing a path replaces its value wholesale.

use sqlx::SqlitePool;

use safelabs_domain::id::DeviceId;
use safelabs_domain::time;

use crate::error::StorageError;

/// Path of the latest telemetry reported by a device.
#[must_use]
pub fn telemetry_path(device_id: &DeviceId) -> String {
    format!("devices/{device_id}/latest")
}

/// Path of a lab's actuator (air conditioning) state.
#[must_use]
pub fn actuator_path(device_id: &DeviceId) -> String {
    format!("labs/{device_id}/ac")
}

const SELECT_VALUE: &str = "SELECT value FROM nodes WHERE path = ?";
const UPSERT: &str = r"
    INSERT INTO nodes (path, value, updated_at)
    VALUES (?, ?, ?)
    ON CONFLICT (path) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
";

/// `SQLite`-backed value tree.
///
/// Cheap to clone; all clones share the same pool.
#[derive(Clone)]
pub struct SqliteNodeStore {
    pool: SqlitePool,
}

impl SqliteNodeStore {
    /// Create a new node store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read the value at `path`. A missing node and a stored `null` both
    /// read as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the query fails or the stored text is not JSON.
    pub async fn get(&self, path: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let row: Option<(String,)> = sqlx::query_as(SELECT_VALUE)
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            None => Ok(None),
            Some((text,)) => match serde_json::from_str(&text)? {
                serde_json::Value::Null => Ok(None),
                value => Ok(Some(value)),
            },
        }
    }

    /// Replace the value at `path`, stamping the write time.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the value cannot be encoded or the write fails.
    pub async fn set(&self, path: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        let text = serde_json::to_string(value)?;
        sqlx::query(UPSERT)
            .bind(path)
            .bind(text)
            .bind(time::now().timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
