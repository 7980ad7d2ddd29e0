//! Coupled transient integration of the reactor plant.
//!
//! Provides:
//! - A single state vector layout shared by packing and unpacking ([`StateSchema`])
//! - A two-phase right-hand side over an exclusively borrowed plant ([`Dispatcher`])
//! - Adaptive explicit, stiff implicit and fixed-step solvers ([`Solver`])
//! - The segment/sample driver with a run state machine ([`Driver`])
//! - The reactor plant assembled from a case definition ([`Reactor`])

pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod plant;
pub mod reactor;
pub mod schema;
pub mod solver;

pub use dispatcher::{DerivativePhase, Dispatcher};
pub use driver::{Driver, RunState, RunSummary, SampleSink};
pub use error::{SimError, SimResult};
pub use plant::Plant;
pub use reactor::Reactor;
pub use schema::{Segment, StateSchema};
pub use solver::{DormandPrince, OdeSolver, OdeSystem, Rk4, Sdirk2, Solver, SolverOptions, SolverStats};
