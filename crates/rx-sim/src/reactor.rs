//! The reactor plant: control layer plus fuel rods, coolant flows and point
//! kinetics, built from a case definition.

use rx_controls::{Boundary, Control};
use rx_physics::{Coupling, Fluid, PlantView, PointKinetics, Solid, Subsystem};
use rx_project::{CaseDef, SubsystemKind};
use rx_results::StreamSpec;

use crate::error::{SimError, SimResult};
use crate::plant::Plant;

#[derive(Debug, Clone)]
pub struct Reactor {
    active: Vec<SubsystemKind>,
    control: Control,
    solid: Solid,
    fluid: Fluid,
    neutron: PointKinetics,
    /// Control signal values from the last refresh.
    boundary: Boundary,
}

impl Reactor {
    /// Build every solved subsystem. Subsystems not in the solve set stay
    /// empty and contribute nothing to the state vector.
    pub fn from_case(case: &CaseDef) -> SimResult<Self> {
        let mut active = case.solve.clone();
        active.sort();
        active.dedup();
        let solves = |kind| active.contains(&kind);

        let rod_ids: Vec<String> = if solves(SubsystemKind::Fuelrod) {
            case.fuelrods.iter().map(|r| r.id.clone()).collect()
        } else {
            Vec::new()
        };
        let fluid_def = case.fluid.as_ref().filter(|_| solves(SubsystemKind::Fluid));
        let junction_ids: Vec<String> = fluid_def
            .map(|f| f.junctions.iter().map(|j| j.id()).collect())
            .unwrap_or_default();

        let control = Control::compile(&case.control, &rod_ids, &junction_ids)?;

        let solid = if solves(SubsystemKind::Fuelrod) {
            Solid::from_defs(&case.fuelrods, &case.materials, &control, &junction_ids)?
        } else {
            Solid::default()
        };
        let fluid = match fluid_def {
            Some(def) => Fluid::from_def(def, &control)?,
            None => Fluid::default(),
        };
        let neutron = match case.pointkinetics.as_ref() {
            Some(def) if solves(SubsystemKind::Pointkinetics) => PointKinetics::from_def(def, &control)?,
            _ => PointKinetics::fixed_power(1.0),
        };
        for kind in &active {
            let missing = match kind {
                SubsystemKind::Fluid => fluid_def.is_none(),
                SubsystemKind::Pointkinetics => case.pointkinetics.is_none(),
                SubsystemKind::Fuelrod => false,
            };
            if missing {
                return Err(SimError::Config {
                    what: format!("'{kind}' is solved but the case has no {kind} section"),
                });
            }
        }

        Ok(Self {
            active,
            control,
            solid,
            fluid,
            neutron,
            boundary: Boundary::default(),
        })
    }

    pub fn control(&self) -> &Control {
        &self.control
    }

    pub fn solid(&self) -> &Solid {
        &self.solid
    }

    pub fn fluid(&self) -> &Fluid {
        &self.fluid
    }

    pub fn neutron(&self) -> &PointKinetics {
        &self.neutron
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    fn solves(&self, kind: SubsystemKind) -> bool {
        self.active.contains(&kind)
    }

    fn view(&self) -> PlantView<'_> {
        PlantView {
            solid: &self.solid,
            fluid: &self.fluid,
            neutron: &self.neutron,
        }
    }
}

impl Plant for Reactor {
    fn active(&self) -> &[SubsystemKind] {
        &self.active
    }

    fn subsystem(&self, kind: SubsystemKind) -> &dyn Subsystem {
        match kind {
            SubsystemKind::Fuelrod => &self.solid,
            SubsystemKind::Fluid => &self.fluid,
            SubsystemKind::Pointkinetics => &self.neutron,
        }
    }

    fn subsystem_mut(&mut self, kind: SubsystemKind) -> &mut dyn Subsystem {
        match kind {
            SubsystemKind::Fuelrod => &mut self.solid,
            SubsystemKind::Fluid => &mut self.fluid,
            SubsystemKind::Pointkinetics => &mut self.neutron,
        }
    }

    fn refresh_boundary_conditions(&mut self, t: f64) -> SimResult<()> {
        let boundary = self
            .control
            .evaluate(t, &self.view())
            .map_err(|e| SimError::Domain {
                subsystem: "control".to_string(),
                t,
                what: e.to_string(),
            })?;
        self.boundary = boundary;
        Ok(())
    }

    fn compute_derivatives(&self, kind: SubsystemKind, t: f64, out: &mut [f64]) -> SimResult<()> {
        let coupling = Coupling {
            plant: self.view(),
            boundary: &self.boundary,
            kinetics_solved: self.solves(SubsystemKind::Pointkinetics),
            power_signal: self.control.reactor_power_signal(),
        };
        self.subsystem(kind)
            .compute_rhs(t, &coupling, out)
            .map_err(|e| SimError::Domain {
                subsystem: kind.to_string(),
                t,
                what: e.to_string(),
            })
    }

    fn streams(&self) -> Vec<StreamSpec> {
        let mut specs = Vec::new();
        for kind in &self.active {
            match kind {
                SubsystemKind::Fuelrod => {
                    for rod in self.solid.rods() {
                        let columns: Vec<String> = (0..rod.fuel_mesh().nr())
                            .map(|i| format!("tempf-{i:03}(K)"))
                            .chain((0..rod.clad_mesh().nr()).map(|i| format!("tempc-{i:03}(K)")))
                            .collect();
                        for j in 0..rod.nz() {
                            specs.push(StreamSpec::new(
                                format!("temp-fuelrod-{}-{j:03}.dat", rod.id()),
                                columns.clone(),
                            ));
                        }
                    }
                }
                SubsystemKind::Fluid => {
                    let junctions = self.fluid.junctions();
                    let columns = self
                        .fluid
                        .report_order()
                        .into_iter()
                        .map(|i| junctions[i].id())
                        .collect();
                    specs.push(StreamSpec::new("mdot.dat", columns));
                }
                SubsystemKind::Pointkinetics => {
                    let columns = std::iter::once("power(-)".to_string())
                        .chain((0..self.neutron.cdnp().len()).map(|i| format!("cdnp-{i:03}(-)")))
                        .collect();
                    specs.push(StreamSpec::new("power.dat", columns));
                }
            }
        }
        specs
    }

    fn sample(&self) -> Vec<Vec<f64>> {
        let mut rows = Vec::new();
        for kind in &self.active {
            match kind {
                SubsystemKind::Fuelrod => {
                    for rod in self.solid.rods() {
                        for j in 0..rod.nz() {
                            let mut row = rod.fuel_temperatures(j).to_vec();
                            row.extend_from_slice(rod.clad_temperatures(j));
                            rows.push(row);
                        }
                    }
                }
                SubsystemKind::Fluid => rows.push(self.fluid.flows(&self.boundary)),
                SubsystemKind::Pointkinetics => {
                    let mut row = vec![self.neutron.power()];
                    row.extend_from_slice(self.neutron.cdnp());
                    rows.push(row);
                }
            }
        }
        rows
    }
}
