//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`SafeLabsError`] at port boundaries.

/// Top-level error crossing port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum SafeLabsError {
    /// A domain invariant was violated by the caller's input.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The backing store failed (network, timeout, decode, …).
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A device id was empty.
    #[error("device id must not be empty")]
    EmptyDeviceId,

    /// A device id contained a character that cannot appear in a store path.
    #[error("device id {id:?} contains forbidden character {found:?}")]
    InvalidDeviceId {
        /// The rejected id.
        id: String,
        /// The first forbidden character found.
        found: char,
    },
}
