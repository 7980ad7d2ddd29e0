//! The set of subsystems integrated together.

use rx_physics::Subsystem;
use rx_project::SubsystemKind;
use rx_results::StreamSpec;

use crate::error::SimResult;

/// A coupled plant as seen by the assembler, dispatcher and driver.
///
/// Implementations own every subsystem and the control layer. The active set
/// is fixed after construction.
pub trait Plant {
    /// Active subsystems in canonical order (ascending [`SubsystemKind`]).
    fn active(&self) -> &[SubsystemKind];

    fn subsystem(&self, kind: SubsystemKind) -> &dyn Subsystem;

    fn subsystem_mut(&mut self, kind: SubsystemKind) -> &mut dyn Subsystem;

    /// Evaluate the control layer at `t` against the current subsystem state.
    fn refresh_boundary_conditions(&mut self, t: f64) -> SimResult<()>;

    /// Derivative of one active subsystem's block, using the boundary values
    /// from the last refresh.
    fn compute_derivatives(&self, kind: SubsystemKind, t: f64, out: &mut [f64]) -> SimResult<()>;

    /// Output streams, in the order [`Plant::sample`] fills them.
    fn streams(&self) -> Vec<StreamSpec>;

    /// One row per stream from the current native state.
    fn sample(&self) -> Vec<Vec<f64>>;
}
