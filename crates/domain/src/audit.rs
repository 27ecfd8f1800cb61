//! Audit trail: immutable records of every action taken on a lab.
//!
//! An [`AuditRecord`] is what callers hand to the store; the store assigns
//! the id and timestamp and hands back an [`AuditEvent`]. Records are only
//! ever appended, never edited or removed.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::actuator::ActuatorState;
use crate::id::{DeviceId, EventId};
use crate::time::Timestamp;

/// Source recorded for manual actions whose caller did not name one.
pub const DEFAULT_SOURCE: &str = "API";

/// Kind of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    /// A manual actuator change.
    Action,
    /// An actuator change made by the automation engine.
    AutoAction,
    /// An unsafe temperature reading.
    CriticalAlert,
}

impl AuditEventType {
    /// Wire/storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Action => "ACTION",
            Self::AutoAction => "AUTO_ACTION",
            Self::CriticalAlert => "CRITICAL_ALERT",
        }
    }
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditEventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTION" => Ok(Self::Action),
            "AUTO_ACTION" => Ok(Self::AutoAction),
            "CRITICAL_ALERT" => Ok(Self::CriticalAlert),
            other => Err(UnknownEventType(other.to_string())),
        }
    }
}

/// Returned when parsing an unrecognised event type string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown audit event type {0:?}")]
pub struct UnknownEventType(pub String);

/// An audit entry that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde(rename = "type")]
    pub event_type: AuditEventType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl AuditRecord {
    /// Record of a manual actuator change.
    ///
    /// An absent or blank `source` is recorded as [`DEFAULT_SOURCE`].
    #[must_use]
    pub fn manual(state: ActuatorState, source: Option<&str>) -> Self {
        let source = source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SOURCE);
        Self {
            event_type: AuditEventType::Action,
            message: format!("AC turned {}", on_off(state)),
            details: None,
            source: Some(source.to_string()),
        }
    }

    /// Record of the engine switching the actuator off after `inactivity`
    /// without motion. The duration is floored to whole seconds.
    #[must_use]
    pub fn auto_off(inactivity: TimeDelta) -> Self {
        Self {
            event_type: AuditEventType::AutoAction,
            message: "AC turned OFF due to inactivity".to_string(),
            details: Some(format!("{}s without motion", inactivity.num_seconds())),
            source: None,
        }
    }

    /// Record of a temperature reading above the critical threshold.
    #[must_use]
    pub fn critical_temperature(temperature: f64) -> Self {
        Self {
            event_type: AuditEventType::CriticalAlert,
            message: format!("Critical Temperature: {temperature}°C"),
            details: None,
            source: None,
        }
    }
}

fn on_off(state: ActuatorState) -> &'static str {
    match state {
        ActuatorState::On => "ON",
        ActuatorState::Off => "OFF",
    }
}

/// A persisted audit entry with its store-assigned id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: EventId,
    pub device_id: DeviceId,
    #[serde(flatten)]
    pub record: AuditRecord,
    pub timestamp: Timestamp,
}

impl AuditEvent {
    /// Kind of this event.
    #[must_use]
    pub fn event_type(&self) -> AuditEventType {
        self.record.event_type
    }
}
