//! Junction flow rates in the coolant network.
//!
//! Independent junctions carry their mass flow rate as an unknown governed by
//! a lumped momentum balance:
//!
//! d(mdot)/dt = (dp_pump - K * mdot * |mdot| / (2 * rho * A²)) / (L / A)
//!
//! Dependent junctions take their flow rate from a control signal.

use rx_controls::{Boundary, Control, SignalId};
use rx_project::{FluidDef, JunctionKindDef, SubsystemKind};

use crate::coupling::Coupling;
use crate::error::{PhysicsError, PhysicsResult, check_len};
use crate::subsystem::Subsystem;

#[derive(Debug, Clone, PartialEq)]
enum JunctionKind {
    Independent {
        /// Position of this junction's flow in the state block.
        state_index: usize,
        l_over_a: f64,
        loss_coefficient: f64,
        flow_area: f64,
        density: f64,
        pump_head: Option<SignalId>,
    },
    Dependent {
        flow: SignalId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    pub from: String,
    pub to: String,
    kind: JunctionKind,
}

impl Junction {
    pub fn id(&self) -> String {
        format!("{}-{}", self.from, self.to)
    }

    pub fn is_independent(&self) -> bool {
        matches!(self.kind, JunctionKind::Independent { .. })
    }
}

/// Coolant network flows.
#[derive(Debug, Clone, Default)]
pub struct Fluid {
    junctions: Vec<Junction>,
    /// Flow rates of independent junctions (kg/s), in junction order.
    mdoti: Vec<f64>,
}

impl Fluid {
    pub fn from_def(def: &FluidDef, control: &Control) -> PhysicsResult<Self> {
        let mut junctions = Vec::with_capacity(def.junctions.len());
        let mut mdoti = Vec::new();
        for j in &def.junctions {
            let kind = match &j.kind {
                JunctionKindDef::Independent {
                    initial_mdot_kg_s,
                    inertia_l_over_a_per_m,
                    loss_coefficient,
                    flow_area_m2,
                    density_kg_m3,
                    pump_head_signal,
                } => {
                    if !(*inertia_l_over_a_per_m > 0.0 && *flow_area_m2 > 0.0 && *density_kg_m3 > 0.0) {
                        return Err(PhysicsError::InvalidArg {
                            what: format!("junction '{}' needs positive inertia, area and density", j.id()),
                        });
                    }
                    let pump_head = pump_head_signal
                        .as_deref()
                        .map(|s| control.signal_id(s))
                        .transpose()?;
                    mdoti.push(*initial_mdot_kg_s);
                    JunctionKind::Independent {
                        state_index: mdoti.len() - 1,
                        l_over_a: *inertia_l_over_a_per_m,
                        loss_coefficient: *loss_coefficient,
                        flow_area: *flow_area_m2,
                        density: *density_kg_m3,
                        pump_head,
                    }
                }
                JunctionKindDef::Dependent { flow_signal } => JunctionKind::Dependent {
                    flow: control.signal_id(flow_signal)?,
                },
            };
            junctions.push(Junction {
                from: j.from.clone(),
                to: j.to.clone(),
                kind,
            });
        }
        Ok(Self { junctions, mdoti })
    }

    pub fn junctions(&self) -> &[Junction] {
        &self.junctions
    }

    pub fn independent_count(&self) -> usize {
        self.mdoti.len()
    }

    /// Flow of a state-carrying junction, `None` for dependent junctions.
    pub fn state_flow(&self, junction: usize) -> Option<f64> {
        match self.junctions.get(junction)?.kind {
            JunctionKind::Independent { state_index, .. } => Some(self.mdoti[state_index]),
            JunctionKind::Dependent { .. } => None,
        }
    }

    /// Flow of any junction (kg/s) given the current boundary values.
    pub fn flow(&self, junction: usize, boundary: &Boundary) -> f64 {
        match self.junctions.get(junction).map(|j| &j.kind) {
            Some(JunctionKind::Independent { state_index, .. }) => self.mdoti[*state_index],
            Some(JunctionKind::Dependent { flow }) => boundary.get(*flow),
            None => f64::NAN,
        }
    }

    /// Junction indices in reporting order: independent first, then dependent.
    pub fn report_order(&self) -> Vec<usize> {
        let (mut independent, dependent): (Vec<usize>, Vec<usize>) =
            (0..self.junctions.len()).partition(|&i| self.junctions[i].is_independent());
        independent.extend(dependent);
        independent
    }

    /// All junction flows in reporting order.
    pub fn flows(&self, boundary: &Boundary) -> Vec<f64> {
        self.report_order()
            .into_iter()
            .map(|i| self.flow(i, boundary))
            .collect()
    }
}

impl Subsystem for Fluid {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Fluid
    }

    fn state_length(&self) -> usize {
        self.mdoti.len()
    }

    fn state_labels(&self) -> Vec<String> {
        self.junctions
            .iter()
            .filter(|j| j.is_independent())
            .map(|j| format!("mdot/{}", j.id()))
            .collect()
    }

    fn read_state(&self) -> Vec<f64> {
        self.mdoti.clone()
    }

    fn write_state(&mut self, y: &[f64]) -> PhysicsResult<()> {
        check_len("junction flows", self.mdoti.len(), y.len())?;
        self.mdoti.copy_from_slice(y);
        Ok(())
    }

    fn compute_rhs(&self, _t: f64, coupling: &Coupling<'_>, out: &mut [f64]) -> PhysicsResult<()> {
        check_len("junction flow derivatives", self.mdoti.len(), out.len())?;
        for junction in &self.junctions {
            if let JunctionKind::Independent {
                state_index,
                l_over_a,
                loss_coefficient,
                flow_area,
                density,
                pump_head,
            } = &junction.kind
            {
                let mdot = self.mdoti[*state_index];
                if !mdot.is_finite() {
                    return Err(PhysicsError::NonPhysical {
                        location: format!("junction '{}'", junction.id()),
                        what: "mass flow rate",
                        value: mdot,
                    });
                }
                let dp_pump = pump_head.map_or(0.0, |id| coupling.boundary.get(id));
                let dp_loss = loss_coefficient * mdot * mdot.abs() / (2.0 * density * flow_area * flow_area);
                out[*state_index] = (dp_pump - dp_loss) / l_over_a;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupling::PlantView;
    use crate::neutron::PointKinetics;
    use crate::solid::Solid;
    use rx_project::{ControlDef, JunctionDef, SignalDef, SignalKindDef};

    fn control() -> Control {
        let def = ControlDef {
            signals: vec![
                SignalDef {
                    id: "dp".to_string(),
                    kind: SignalKindDef::Constant { value: 1125.0 },
                },
                SignalDef {
                    id: "out".to_string(),
                    kind: SignalKindDef::Constant { value: 0.25 },
                },
            ],
            reactor_power: None,
        };
        Control::compile(&def, &[], &[]).unwrap()
    }

    fn fluid_def(initial: f64) -> FluidDef {
        FluidDef {
            junctions: vec![
                JunctionDef {
                    from: "hot".to_string(),
                    to: "cold".to_string(),
                    kind: JunctionKindDef::Dependent {
                        flow_signal: "out".to_string(),
                    },
                },
                JunctionDef {
                    from: "core".to_string(),
                    to: "hot".to_string(),
                    kind: JunctionKindDef::Independent {
                        initial_mdot_kg_s: initial,
                        inertia_l_over_a_per_m: 1000.0,
                        loss_coefficient: 10.0,
                        flow_area_m2: 1e-4,
                        density_kg_m3: 750.0,
                        pump_head_signal: Some("dp".to_string()),
                    },
                },
            ],
        }
    }

    fn rate(fluid: &Fluid, boundary: &Boundary) -> Vec<f64> {
        let solid = Solid::default();
        let neutron = PointKinetics::fixed_power(1.0);
        let coupling = Coupling {
            plant: PlantView {
                solid: &solid,
                fluid,
                neutron: &neutron,
            },
            boundary,
            kinetics_solved: false,
            power_signal: None,
        };
        let mut out = vec![0.0; fluid.state_length()];
        fluid.compute_rhs(0.0, &coupling, &mut out).unwrap();
        out
    }

    #[test]
    fn pump_head_balances_losses_at_design_flow() {
        let control = control();
        let fluid = Fluid::from_def(&fluid_def(0.3), &control).unwrap();
        let boundary = Boundary::new(0.0, vec![10.0 * 0.09 / (2.0 * 750.0 * 1e-8), 0.25]);
        let out = rate(&fluid, &boundary);
        assert!(out[0].abs() < 1e-9);
    }

    #[test]
    fn flow_accelerates_below_design_point() {
        let control = control();
        let fluid = Fluid::from_def(&fluid_def(0.0), &control).unwrap();
        let boundary = Boundary::new(0.0, vec![1125.0, 0.25]);
        let out = rate(&fluid, &boundary);
        assert!((out[0] - 1.125).abs() < 1e-12);
    }

    #[test]
    fn reports_independent_then_dependent() {
        let control = control();
        let fluid = Fluid::from_def(&fluid_def(0.3), &control).unwrap();
        let boundary = Boundary::new(0.0, vec![1125.0, 0.25]);
        assert_eq!(fluid.report_order(), vec![1, 0]);
        assert_eq!(fluid.flows(&boundary), vec![0.3, 0.25]);
        assert_eq!(fluid.state_labels(), vec!["mdot/core-hot".to_string()]);
        assert_eq!(fluid.state_flow(0), None);
        assert_eq!(fluid.state_flow(1), Some(0.3));
    }
}
