//! Per-device motion history kept across polling ticks.

use std::collections::HashMap;

use chrono::TimeDelta;

use crate::id::DeviceId;
use crate::telemetry::DeviceSnapshot;
use crate::time::{Timestamp, elapsed};

/// What the engine remembers about one device between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceHistory {
    /// Last time motion was reported, or when the device was first seen.
    pub last_motion_at: Timestamp,
    /// Last time a critical-temperature alert was emitted.
    pub last_alert_at: Option<Timestamp>,
}

/// In-memory motion history for every device the engine has observed.
///
/// Never persisted: a restart starts from an empty tracker. Entries are
/// created lazily on first observation and never removed.
#[derive(Debug, Default)]
pub struct MotionTracker {
    devices: HashMap<DeviceId, DeviceHistory>,
}

impl MotionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a snapshot into the device's history and return how long the
    /// device has been without motion as of `now`.
    ///
    /// A device seen for the first time counts as just active, so startup
    /// never causes an immediate shutdown. `last_motion_at` never moves
    /// backwards, even if the clock does.
    pub fn observe(
        &mut self,
        device_id: &DeviceId,
        snapshot: &DeviceSnapshot,
        now: Timestamp,
    ) -> TimeDelta {
        let history = self
            .devices
            .entry(device_id.clone())
            .or_insert(DeviceHistory {
                last_motion_at: now,
                last_alert_at: None,
            });
        if snapshot.motion_detected {
            history.last_motion_at = history.last_motion_at.max(now);
        }
        elapsed(history.last_motion_at, now)
    }

    /// When the last alert for this device was emitted, if ever.
    #[must_use]
    pub fn last_alert_at(&self, device_id: &DeviceId) -> Option<Timestamp> {
        self.devices.get(device_id).and_then(|h| h.last_alert_at)
    }

    /// Note that an alert for this device was emitted at `at`.
    ///
    /// Has no effect on devices that were never observed.
    pub fn record_alert(&mut self, device_id: &DeviceId, at: Timestamp) {
        if let Some(history) = self.devices.get_mut(device_id) {
            history.last_alert_at = Some(at);
        }
    }

    /// History for a device, if it has been observed.
    #[must_use]
    pub fn history(&self, device_id: &DeviceId) -> Option<&DeviceHistory> {
        self.devices.get(device_id)
    }
}
