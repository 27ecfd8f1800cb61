//! Actions produced by rule evaluation.

use crate::actuator::ActuatorState;
use crate::audit::AuditRecord;

/// Something the engine must apply to the store after evaluating a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Command the actuator, then append `audit` describing why.
    ///
    /// The actuator write always lands before its audit record.
    SetActuator {
        state: ActuatorState,
        audit: AuditRecord,
    },
    /// Append `audit` without touching the actuator.
    Alert { audit: AuditRecord },
}

impl Action {
    /// The audit record this action emits.
    #[must_use]
    pub fn audit(&self) -> &AuditRecord {
        match self {
            Self::SetActuator { audit, .. } | Self::Alert { audit } => audit,
        }
    }
}
