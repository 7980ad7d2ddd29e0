//! Error types for subsystem models.

use thiserror::Error;

/// Errors raised by subsystem construction and derivative evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Non-physical {what} in {location}: {value}")]
    NonPhysical {
        location: String,
        what: &'static str,
        value: f64,
    },

    #[error("State length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Control error: {0}")]
    Control(#[from] rx_controls::ControlError),
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;

impl From<rx_core::RxError> for PhysicsError {
    fn from(e: rx_core::RxError) -> Self {
        PhysicsError::InvalidArg {
            what: e.to_string(),
        }
    }
}

/// Check that a state slice has the length a subsystem declared.
pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> PhysicsResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(PhysicsError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}

/// Absolute temperatures must be finite and strictly positive.
pub(crate) fn check_temperature(value: f64, location: impl FnOnce() -> String) -> PhysicsResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(PhysicsError::NonPhysical {
            location: location(),
            what: "temperature",
            value,
        })
    }
}
