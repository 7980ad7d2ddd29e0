//! Uniform calculation contract shared by all state-carrying models.

use rx_project::SubsystemKind;

use crate::coupling::Coupling;
use crate::error::PhysicsResult;

/// A model that contributes a block of unknowns to the global state vector.
pub trait Subsystem {
    /// Which block of the state vector this model owns.
    fn kind(&self) -> SubsystemKind;

    /// Number of scalars contributed.
    fn state_length(&self) -> usize;

    /// One label per contributed scalar, in state order.
    fn state_labels(&self) -> Vec<String>;

    /// Current state flattened in state order.
    fn read_state(&self) -> Vec<f64>;

    /// Overwrite internal state from a slice of length `state_length()`.
    fn write_state(&mut self, y: &[f64]) -> PhysicsResult<()>;

    /// Time derivative of the contributed scalars, written into `out`
    /// (length `state_length()`).
    fn compute_rhs(&self, t: f64, coupling: &Coupling<'_>, out: &mut [f64]) -> PhysicsResult<()>;
}
