//! `SQLite` implementation of [`EventStore`].
//!
//! The store assigns each event's timestamp inside the insert statement as
//! `max(now, latest timestamp for the device)`, so a device's log never goes
//! back in time even if the host clock does. Equal timestamps are ordered by
//! insertion sequence.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use safelabs_app::ports::EventStore;
use safelabs_domain::audit::{AuditEvent, AuditEventType, AuditRecord};
use safelabs_domain::error::SafeLabsError;
use safelabs_domain::id::{DeviceId, EventId};
use safelabs_domain::time;

use crate::error::StorageError;

struct Wrapper(AuditEvent);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let device_id: String = row.try_get("device_id")?;
        let event_type: String = row.try_get("event_type")?;
        let message: String = row.try_get("message")?;
        let details: Option<String> = row.try_get("details")?;
        let source: Option<String> = row.try_get("source")?;
        let timestamp: i64 = row.try_get("timestamp")?;

        let device_id =
            DeviceId::new(device_id).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let event_type: AuditEventType = event_type
            .parse()
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let timestamp = time::from_millis(timestamp).ok_or_else(|| {
            sqlx::Error::Decode(format!("timestamp out of range: {timestamp}").into())
        })?;

        Ok(Self(AuditEvent {
            id: EventId::from_uuid(id),
            device_id,
            record: AuditRecord {
                event_type,
                message,
                details,
                source,
            },
            timestamp,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO events (id, device_id, event_type, message, details, source, timestamp)
    VALUES (?, ?, ?, ?, ?, ?, MAX(?, COALESCE((SELECT MAX(timestamp) FROM events WHERE device_id = ?), 0)))
    RETURNING timestamp
";

const SELECT_RECENT_BY_DEVICE: &str = r"
    SELECT * FROM (
        SELECT * FROM events WHERE device_id = ? ORDER BY timestamp DESC, seq DESC LIMIT ?
    ) ORDER BY timestamp ASC, seq ASC
";

/// `SQLite`-backed append-only audit log.
#[derive(Clone)]
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Create a new event store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl EventStore for SqliteEventStore {
    async fn append(
        &self,
        device_id: &DeviceId,
        record: AuditRecord,
    ) -> Result<AuditEvent, SafeLabsError> {
        let id = EventId::new();
        let (timestamp,): (i64,) = sqlx::query_as(INSERT)
            .bind(id.as_uuid())
            .bind(device_id.as_str())
            .bind(record.event_type.as_str())
            .bind(&record.message)
            .bind(&record.details)
            .bind(&record.source)
            .bind(time::now().timestamp_millis())
            .bind(device_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::from)?;

        let timestamp =
            time::from_millis(timestamp).ok_or_else(|| StorageError::UnexpectedValue {
                path: format!("events/{device_id}"),
                found: timestamp.to_string(),
            })?;

        Ok(AuditEvent {
            id,
            device_id: device_id.clone(),
            record,
            timestamp,
        })
    }

    async fn find_by_device(
        &self,
        device_id: &DeviceId,
        limit: usize,
    ) -> Result<Vec<AuditEvent>, SafeLabsError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RECENT_BY_DEVICE)
            .bind(device_id.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}
