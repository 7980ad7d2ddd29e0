//! Control layer: boundary conditions and feedback signals for the reactor plant.
//!
//! The control layer is an ordered list of scalar signals. Each evaluation walks
//! the list once, so a signal may only read signals declared before it. Measured
//! signals read the plant through [`PlantReadout`], which keeps this crate
//! independent of the physics models.
//!
//! The result of an evaluation is a [`Boundary`]: the value of every signal at
//! one time, which the physics models consume through resolved [`SignalId`]s.

pub mod control;
pub mod error;
pub mod readout;
pub mod signal;
pub mod table;

pub use control::Control;
pub use error::{ControlError, ControlResult};
pub use readout::PlantReadout;
pub use signal::{Boundary, SignalId};
pub use table::LookupTable;
