//! Read-only view of plant state for measured signals.

/// Plant quantities that measured signals may observe.
///
/// Indices are positions in the case file's `fuelrods` and `fluid.junctions`
/// lists, resolved once when the control layer is compiled.
pub trait PlantReadout {
    /// Normalized reactor power.
    fn reactor_power(&self) -> f64;

    /// Volume-averaged fuel temperature (K) of one rod, or of all rods when `None`.
    fn fuel_temperature_average(&self, rod: Option<usize>) -> f64;

    /// Mass flow rate (kg/s) through a junction.
    fn junction_flow(&self, junction: usize) -> f64;
}
