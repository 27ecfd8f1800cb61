//! Automation: the two rules the engine enforces on every tick.
//!
//! - **Auto-off on inactivity** (level-triggered): while the actuator is on
//!   and the room has been without motion for longer than the inactivity
//!   threshold, switch it off. Once off, the `actuator is on` guard keeps
//!   the rule from firing again.
//! - **Critical-temperature alert** (edge-suppressed): when the reading is
//!   above the critical threshold and the last alert is older than the
//!   cooldown, emit an alert. The cooldown restarts from each alert.
//!
//! All comparisons are strict: a value exactly at a threshold does not fire.

mod action;
mod history;

pub use action::Action;
pub use history::{DeviceHistory, MotionTracker};

use chrono::TimeDelta;

use crate::actuator::ActuatorState;
use crate::audit::AuditRecord;
use crate::telemetry::DeviceSnapshot;
use crate::time::{Timestamp, elapsed};

/// Tunable limits for the automation rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleThresholds {
    /// Time without motion after which a running actuator is switched off.
    pub inactivity_threshold: TimeDelta,
    /// Temperature (°C) above which a reading is critical.
    pub critical_temperature: f64,
    /// Minimum spacing between two critical alerts for the same device.
    pub alert_cooldown: TimeDelta,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            inactivity_threshold: TimeDelta::seconds(30),
            critical_temperature: 30.0,
            alert_cooldown: TimeDelta::milliseconds(300_000),
        }
    }
}

/// Everything the rules look at for one device on one tick.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub snapshot: &'a DeviceSnapshot,
    pub actuator: ActuatorState,
    pub inactivity: TimeDelta,
    pub last_alert_at: Option<Timestamp>,
    pub now: Timestamp,
}

/// Evaluate both rules, auto-off first, and return the actions to apply.
///
/// Pure: no state is changed here. The caller is responsible for recording
/// an emitted alert so the cooldown restarts.
#[must_use]
pub fn evaluate(thresholds: &RuleThresholds, input: &RuleInput<'_>) -> Vec<Action> {
    let mut actions = Vec::new();

    if input.actuator.is_on() && input.inactivity > thresholds.inactivity_threshold {
        actions.push(Action::SetActuator {
            state: ActuatorState::Off,
            audit: AuditRecord::auto_off(input.inactivity),
        });
    }

    if let Some(temperature) = input.snapshot.temperature {
        let cooled_down = input
            .last_alert_at
            .is_none_or(|last| elapsed(last, input.now) > thresholds.alert_cooldown);
        if temperature > thresholds.critical_temperature && cooled_down {
            actions.push(Action::Alert {
                audit: AuditRecord::critical_temperature(temperature),
            });
        }
    }

    actions
}
