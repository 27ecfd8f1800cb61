//! Actuator state: whether a lab's climate control is running.

use serde::{Deserialize, Serialize};

/// On/off state of a lab's air conditioning.
///
/// Stored externally as a plain boolean; an absent value reads as
/// [`Off`](Self::Off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum ActuatorState {
    On,
    #[default]
    Off,
}

impl ActuatorState {
    /// Whether the actuator is running.
    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<bool> for ActuatorState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl From<ActuatorState> for bool {
    fn from(value: ActuatorState) -> Self {
        value.is_on()
    }
}

impl std::fmt::Display for ActuatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
        }
    }
}
