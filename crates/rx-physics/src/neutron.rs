//! Point kinetics with delayed neutron precursor groups.
//!
//! Power is normalized (1.0 at nominal). Precursor concentrations are scaled
//! so that the initial state is critical:
//!
//! C_i(0) = beta_i * P0 / (lambda_i * Lambda)

use rx_controls::{Control, SignalId};
use rx_project::{PointKineticsDef, SubsystemKind};

use crate::coupling::Coupling;
use crate::error::{PhysicsError, PhysicsResult, check_len};
use crate::subsystem::Subsystem;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DnpGroup {
    pub beta: f64,
    /// Decay constant (1/s).
    pub lambda: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Doppler {
    coefficient: f64,
    reference_temperature: f64,
}

#[derive(Debug, Clone)]
pub struct PointKinetics {
    prompt_generation_time: f64,
    groups: Vec<DnpGroup>,
    reactivity: Option<SignalId>,
    doppler: Option<Doppler>,
    power: f64,
    cdnp: Vec<f64>,
}

impl PointKinetics {
    pub fn from_def(def: &PointKineticsDef, control: &Control) -> PhysicsResult<Self> {
        if !(def.prompt_generation_time_s > 0.0) {
            return Err(PhysicsError::InvalidArg {
                what: format!(
                    "prompt generation time must be positive, got {}",
                    def.prompt_generation_time_s
                ),
            });
        }
        if !def.initial_power.is_finite() || def.initial_power < 0.0 {
            return Err(PhysicsError::InvalidArg {
                what: format!("initial power must be finite and non-negative, got {}", def.initial_power),
            });
        }
        let mut groups = Vec::with_capacity(def.groups.len());
        for (i, g) in def.groups.iter().enumerate() {
            if !(g.beta >= 0.0 && g.lambda_per_s > 0.0) {
                return Err(PhysicsError::InvalidArg {
                    what: format!("delayed neutron group {i} needs beta >= 0 and lambda > 0"),
                });
            }
            groups.push(DnpGroup {
                beta: g.beta,
                lambda: g.lambda_per_s,
            });
        }
        let reactivity = def
            .reactivity_signal
            .as_deref()
            .map(|s| control.signal_id(s))
            .transpose()?;
        let lambda = def.prompt_generation_time_s;
        let p0 = def.initial_power;
        let cdnp = groups.iter().map(|g| g.beta * p0 / (g.lambda * lambda)).collect();
        Ok(Self {
            prompt_generation_time: lambda,
            groups,
            reactivity,
            doppler: def.doppler.map(|d| Doppler {
                coefficient: d.coefficient_per_k,
                reference_temperature: d.reference_temperature_k,
            }),
            power: p0,
            cdnp,
        })
    }

    /// Kinetics stand-in for runs that do not solve it: constant power and
    /// no precursors.
    pub fn fixed_power(power: f64) -> Self {
        Self {
            prompt_generation_time: 1.0,
            groups: Vec::new(),
            reactivity: None,
            doppler: None,
            power,
            cdnp: Vec::new(),
        }
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn cdnp(&self) -> &[f64] {
        &self.cdnp
    }

    pub fn groups(&self) -> &[DnpGroup] {
        &self.groups
    }

    pub fn beta_total(&self) -> f64 {
        self.groups.iter().map(|g| g.beta).sum()
    }

    /// Total reactivity: the external signal plus fuel temperature feedback.
    pub fn reactivity(&self, coupling: &Coupling<'_>) -> f64 {
        let external = self.reactivity.map_or(0.0, |id| coupling.boundary.get(id));
        let feedback = match self.doppler {
            Some(d) if !coupling.plant.solid.is_empty() => {
                d.coefficient * (coupling.plant.solid.fuel_temperature_average() - d.reference_temperature)
            }
            _ => 0.0,
        };
        external + feedback
    }
}

impl Subsystem for PointKinetics {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Pointkinetics
    }

    fn state_length(&self) -> usize {
        1 + self.cdnp.len()
    }

    fn state_labels(&self) -> Vec<String> {
        std::iter::once("power".to_string())
            .chain((0..self.cdnp.len()).map(|i| format!("cdnp-{i:03}")))
            .collect()
    }

    fn read_state(&self) -> Vec<f64> {
        let mut y = Vec::with_capacity(self.state_length());
        y.push(self.power);
        y.extend_from_slice(&self.cdnp);
        y
    }

    fn write_state(&mut self, y: &[f64]) -> PhysicsResult<()> {
        check_len("point kinetics", self.state_length(), y.len())?;
        self.power = y[0];
        self.cdnp.copy_from_slice(&y[1..]);
        Ok(())
    }

    fn compute_rhs(&self, _t: f64, coupling: &Coupling<'_>, out: &mut [f64]) -> PhysicsResult<()> {
        check_len("point kinetics derivatives", self.state_length(), out.len())?;
        if !self.power.is_finite() {
            return Err(PhysicsError::NonPhysical {
                location: "point kinetics".to_string(),
                what: "power",
                value: self.power,
            });
        }
        let rho = self.reactivity(coupling);
        if !rho.is_finite() {
            return Err(PhysicsError::NonPhysical {
                location: "point kinetics".to_string(),
                what: "reactivity",
                value: rho,
            });
        }
        let lambda = self.prompt_generation_time;
        let delayed: f64 = self
            .groups
            .iter()
            .zip(&self.cdnp)
            .map(|(g, c)| g.lambda * c)
            .sum();
        out[0] = (rho - self.beta_total()) / lambda * self.power + delayed;
        for (i, (g, c)) in self.groups.iter().zip(&self.cdnp).enumerate() {
            out[i + 1] = g.beta / lambda * self.power - g.lambda * c;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupling::PlantView;
    use crate::fluid::Fluid;
    use crate::solid::Solid;
    use rx_controls::Boundary;
    use rx_project::{ControlDef, DnpGroupDef, SignalDef, SignalKindDef};

    fn control() -> Control {
        let def = ControlDef {
            signals: vec![SignalDef {
                id: "rho".to_string(),
                kind: SignalKindDef::Constant { value: 0.0 },
            }],
            reactor_power: None,
        };
        Control::compile(&def, &[], &[]).unwrap()
    }

    fn def() -> PointKineticsDef {
        PointKineticsDef {
            initial_power: 1.0,
            prompt_generation_time_s: 2e-5,
            groups: vec![
                DnpGroupDef {
                    beta: 2.1e-4,
                    lambda_per_s: 0.0124,
                },
                DnpGroupDef {
                    beta: 1.4e-3,
                    lambda_per_s: 0.0305,
                },
                DnpGroupDef {
                    beta: 1.3e-3,
                    lambda_per_s: 0.111,
                },
            ],
            reactivity_signal: Some("rho".to_string()),
            doppler: None,
        }
    }

    fn rates(pk: &PointKinetics, rho: f64) -> Vec<f64> {
        let solid = Solid::default();
        let fluid = Fluid::default();
        let boundary = Boundary::new(0.0, vec![rho]);
        let coupling = Coupling {
            plant: PlantView {
                solid: &solid,
                fluid: &fluid,
                neutron: pk,
            },
            boundary: &boundary,
            kinetics_solved: true,
            power_signal: None,
        };
        let mut out = vec![0.0; pk.state_length()];
        pk.compute_rhs(0.0, &coupling, &mut out).unwrap();
        out
    }

    #[test]
    fn initial_state_is_critical() {
        let pk = PointKinetics::from_def(&def(), &control()).unwrap();
        let out = rates(&pk, 0.0);
        for r in &out {
            assert!(r.abs() < 1e-9, "rate {r} should vanish");
        }
    }

    #[test]
    fn positive_reactivity_raises_power() {
        let pk = PointKinetics::from_def(&def(), &control()).unwrap();
        let out = rates(&pk, 1e-4);
        assert!((out[0] - 1e-4 / 2e-5).abs() < 1e-9);
        assert!(out[1..].iter().all(|r| r.abs() < 1e-9));
    }

    #[test]
    fn labels_follow_group_count() {
        let pk = PointKinetics::from_def(&def(), &control()).unwrap();
        assert_eq!(pk.state_labels(), vec!["power", "cdnp-000", "cdnp-001", "cdnp-002"]);
        assert_eq!(pk.state_length(), 4);
    }

    #[test]
    fn non_finite_power_is_rejected() {
        let mut pk = PointKinetics::from_def(&def(), &control()).unwrap();
        let mut y = pk.read_state();
        y[0] = f64::NAN;
        pk.write_state(&y).unwrap();
        let solid = Solid::default();
        let fluid = Fluid::default();
        let boundary = Boundary::new(0.0, vec![0.0]);
        let coupling = Coupling {
            plant: PlantView {
                solid: &solid,
                fluid: &fluid,
                neutron: &pk,
            },
            boundary: &boundary,
            kinetics_solved: true,
            power_signal: None,
        };
        let mut out = vec![0.0; 4];
        assert!(matches!(
            pk.compute_rhs(0.0, &coupling, &mut out),
            Err(PhysicsError::NonPhysical { what: "power", .. })
        ));
    }

    #[test]
    fn non_positive_generation_time_is_rejected() {
        let mut d = def();
        d.prompt_generation_time_s = 0.0;
        assert!(PointKinetics::from_def(&d, &control()).is_err());
    }
}
