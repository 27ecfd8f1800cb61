//! Telemetry: the latest reading a sensor node has reported.

use serde::{Deserialize, Serialize};

/// Most recent telemetry for one device, read fresh every tick.
///
/// Only `temperature` and `motion_detected` drive the automation rules.
/// Every other field the node reports (humidity, gas levels, …) is kept
/// untouched in [`extra`](Self::extra).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Temperature in °C; `None` when the node did not report a number.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub motion_detected: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DeviceSnapshot {
    /// Build a snapshot carrying only the rule-relevant fields.
    #[must_use]
    pub fn new(temperature: f64, motion_detected: bool) -> Self {
        Self {
            temperature: Some(temperature),
            motion_detected,
            extra: serde_json::Map::new(),
        }
    }
}

/// Accept any JSON value for the temperature, keeping it only when numeric.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}
