//! Error types for simulation runs.

use thiserror::Error;

/// Errors encountered while assembling or integrating the coupled system.
///
/// `Config` errors are raised before the first solver step. `Domain` and
/// `Numerical` errors abort a running integration; they are never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Configuration error: {what}")]
    Config { what: String },

    #[error("Domain error in {subsystem} at t = {t:e} s: {what}")]
    Domain {
        subsystem: String,
        t: f64,
        what: String,
    },

    #[error("Numerical failure at t = {t:e} s: {what}")]
    Numerical { t: f64, what: String },

    #[error("Output error: {message}")]
    Io { message: String },

    #[error("Run cancelled at t = {t:e} s")]
    Cancelled { t: f64 },
}

pub type SimResult<T> = Result<T, SimError>;

impl From<rx_physics::PhysicsError> for SimError {
    fn from(e: rx_physics::PhysicsError) -> Self {
        SimError::Config {
            what: e.to_string(),
        }
    }
}

impl From<rx_controls::ControlError> for SimError {
    fn from(e: rx_controls::ControlError) -> Self {
        SimError::Config {
            what: e.to_string(),
        }
    }
}

impl From<rx_results::ResultsError> for SimError {
    fn from(e: rx_results::ResultsError) -> Self {
        SimError::Io {
            message: e.to_string(),
        }
    }
}
