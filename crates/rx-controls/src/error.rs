//! Error types for control layer operations.

use thiserror::Error;

/// Result type for control layer operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur in control layer operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Signal reference not found or invalid.
    #[error("Invalid signal reference: {what}")]
    InvalidReference { what: String },

    /// A signal evaluated to NaN or infinity.
    #[error("Signal '{signal}' evaluated to a non-finite value at t={t}")]
    NonFinite { signal: String, t: f64 },
}
