//! Read-only views of the plant handed to control and derivative evaluation.

use rx_controls::{Boundary, PlantReadout, SignalId};

use crate::fluid::Fluid;
use crate::neutron::PointKinetics;
use crate::solid::Solid;

/// Borrowed snapshot of every subsystem's current state.
#[derive(Clone, Copy)]
pub struct PlantView<'a> {
    pub solid: &'a Solid,
    pub fluid: &'a Fluid,
    pub neutron: &'a PointKinetics,
}

impl PlantReadout for PlantView<'_> {
    fn reactor_power(&self) -> f64 {
        self.neutron.power()
    }

    fn fuel_temperature_average(&self, rod: Option<usize>) -> f64 {
        match rod {
            Some(i) => self
                .solid
                .rods()
                .get(i)
                .map_or(f64::NAN, |r| r.fuel_temperature_average()),
            None => self.solid.fuel_temperature_average(),
        }
    }

    fn junction_flow(&self, junction: usize) -> f64 {
        // Dependent junctions have no state; validation keeps them out of here.
        self.fluid.state_flow(junction).unwrap_or(f64::NAN)
    }
}

/// Everything a subsystem may read while computing its derivative.
pub struct Coupling<'a> {
    pub plant: PlantView<'a>,
    /// Control signals evaluated for this trial point.
    pub boundary: &'a Boundary,
    /// Whether point kinetics is integrated in this run.
    pub kinetics_solved: bool,
    /// Signal standing in for reactor power when kinetics is not solved.
    pub power_signal: Option<SignalId>,
}

impl Coupling<'_> {
    /// Normalized power driving the fuel heat source.
    pub fn reactor_power(&self) -> f64 {
        match (self.kinetics_solved, self.power_signal) {
            (false, Some(id)) => self.boundary.get(id),
            _ => self.plant.neutron.power(),
        }
    }
}
