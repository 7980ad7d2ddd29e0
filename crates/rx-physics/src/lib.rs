//! rx-physics: subsystem models of the reactor plant.
//!
//! Provides:
//! - Fuel rods with radial conduction in fuel and cladding ([`Solid`])
//! - Junction flow rates with lumped momentum balance ([`Fluid`])
//! - Point kinetics with delayed neutron precursors ([`PointKinetics`])
//!
//! Every model implements [`Subsystem`]: it contributes an ordered block of
//! scalar unknowns, can be overwritten from a flat slice, and computes the time
//! derivative of its block from a [`Coupling`] view of the whole plant.

pub mod coupling;
pub mod error;
pub mod fluid;
pub mod material;
pub mod neutron;
pub mod solid;
pub mod subsystem;

pub use coupling::{Coupling, PlantView};
pub use error::{PhysicsError, PhysicsResult};
pub use fluid::{Fluid, Junction};
pub use material::Material;
pub use neutron::{DnpGroup, PointKinetics};
pub use solid::{FuelRod, RadialMesh, Solid};
pub use subsystem::Subsystem;
