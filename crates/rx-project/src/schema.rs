//! Case file schema definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Subsystems that may contribute unknowns to the global state vector.
///
/// The declaration order is the canonical concatenation order of the state
/// vector, so `Ord` on this enum is load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubsystemKind {
    Fuelrod,
    Fluid,
    Pointkinetics,
}

impl SubsystemKind {
    pub const ALL: [SubsystemKind; 3] = [
        SubsystemKind::Fuelrod,
        SubsystemKind::Fluid,
        SubsystemKind::Pointkinetics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubsystemKind::Fuelrod => "fuelrod",
            SubsystemKind::Fluid => "fluid",
            SubsystemKind::Pointkinetics => "pointkinetics",
        }
    }
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseDef {
    pub version: u32,
    pub name: String,
    /// Subsystems to integrate.
    pub solve: Vec<SubsystemKind>,
    pub time: TimeDef,
    #[serde(default)]
    pub solver: SolverDef,
    #[serde(default)]
    pub materials: Vec<MaterialDef>,
    #[serde(default)]
    pub fuelrods: Vec<FuelRodDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluid: Option<FluidDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointkinetics: Option<PointKineticsDef>,
    #[serde(default)]
    pub control: ControlDef,
}

impl CaseDef {
    pub fn solves(&self, kind: SubsystemKind) -> bool {
        self.solve.contains(&kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeDef {
    #[serde(default)]
    pub t0_s: f64,
    pub segments: Vec<SegmentDef>,
}

/// One (end time, output interval) pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SegmentDef {
    pub end_s: f64,
    pub output_interval_s: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolverDef {
    #[serde(default)]
    pub kind: SolverKindDef,
    #[serde(default = "default_rtol")]
    pub rtol: f64,
    #[serde(default = "default_atol")]
    pub atol: f64,
    /// Per-subsystem tolerance overrides.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupToleranceDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h0_s: Option<f64>,
    #[serde(default = "default_h_min")]
    pub h_min_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h_max_s: Option<f64>,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for SolverDef {
    fn default() -> Self {
        Self {
            kind: SolverKindDef::default(),
            rtol: default_rtol(),
            atol: default_atol(),
            groups: Vec::new(),
            h0_s: None,
            h_min_s: default_h_min(),
            h_max_s: None,
            max_steps: default_max_steps(),
        }
    }
}

fn default_rtol() -> f64 {
    1e-6
}

fn default_atol() -> f64 {
    1e-6
}

fn default_h_min() -> f64 {
    1e-12
}

fn default_max_steps() -> usize {
    100_000
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type")]
pub enum SolverKindDef {
    /// Explicit Dormand-Prince 5(4) with adaptive steps.
    #[default]
    DormandPrince,
    /// L-stable two-stage SDIRK with Newton iteration, for stiff cases.
    Sdirk2,
    /// Classical RK4 with a fixed maximum step.
    Rk4 { dt_s: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupToleranceDef {
    pub group: SubsystemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atol: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialDef {
    pub id: String,
    pub conductivity_w_mk: f64,
    pub density_kg_m3: f64,
    pub heat_capacity_j_kgk: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FuelRodDef {
    pub id: String,
    pub axial: AxialDef,
    /// Linear heat rate at nominal power (W/m).
    pub q_linear_w_m: f64,
    pub fuel: PelletDef,
    pub gap: GapDef,
    pub clad: CladDef,
    pub coolant: CoolantDef,
    pub initial_temperature_k: f64,
}

impl FuelRodDef {
    pub fn nz(&self) -> usize {
        self.axial.dz_m.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AxialDef {
    /// Axial node heights (m).
    pub dz_m: Vec<f64>,
    /// Axial power shape, one factor per node.
    pub kz: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PelletDef {
    pub material: String,
    pub r_out_m: f64,
    pub nr: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GapDef {
    pub conductance_w_m2k: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CladDef {
    pub material: String,
    pub r_in_m: f64,
    pub r_out_m: f64,
    pub nr: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoolantDef {
    pub htc_w_m2k: f64,
    pub temperature_signal: String,
    /// Junction whose flow scales the heat transfer coefficient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_junction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mdot_nominal_kg_s: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FluidDef {
    pub junctions: Vec<JunctionDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JunctionDef {
    pub from: String,
    pub to: String,
    pub kind: JunctionKindDef,
}

impl JunctionDef {
    /// Junction identifier, also used as the output column label.
    pub fn id(&self) -> String {
        format!("{}-{}", self.from, self.to)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum JunctionKindDef {
    /// Flow rate is an unknown governed by a lumped momentum balance.
    Independent {
        initial_mdot_kg_s: f64,
        /// Flow path length over flow area (1/m).
        inertia_l_over_a_per_m: f64,
        loss_coefficient: f64,
        flow_area_m2: f64,
        density_kg_m3: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pump_head_signal: Option<String>,
    },
    /// Flow rate imposed by a control signal.
    Dependent { flow_signal: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointKineticsDef {
    #[serde(default = "default_initial_power")]
    pub initial_power: f64,
    pub prompt_generation_time_s: f64,
    pub groups: Vec<DnpGroupDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactivity_signal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doppler: Option<DopplerDef>,
}

fn default_initial_power() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DnpGroupDef {
    pub beta: f64,
    pub lambda_per_s: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DopplerDef {
    pub coefficient_per_k: f64,
    pub reference_temperature_k: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ControlDef {
    #[serde(default)]
    pub signals: Vec<SignalDef>,
    /// Signal providing normalized power when point kinetics is not solved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactor_power: Option<String>,
}

impl ControlDef {
    pub fn signal_index(&self, id: &str) -> Option<usize> {
        self.signals.iter().position(|s| s.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalDef {
    pub id: String,
    pub kind: SignalKindDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum SignalKindDef {
    Time,
    Constant {
        value: f64,
    },
    /// Piecewise-linear table of (x, y) points over another signal.
    Lookup {
        input: String,
        table: Vec<[f64; 2]>,
    },
    Sum {
        inputs: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        gains: Vec<f64>,
    },
    Measured {
        reference: MeasuredDef,
    },
}

impl SignalKindDef {
    /// Ids of the signals this one reads.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            SignalKindDef::Lookup { input, .. } => vec![input.as_str()],
            SignalKindDef::Sum { inputs, .. } => inputs.iter().map(String::as_str).collect(),
            SignalKindDef::Time | SignalKindDef::Constant { .. } | SignalKindDef::Measured { .. } => {
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum MeasuredDef {
    ReactorPower,
    FuelTemperatureAverage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rod_id: Option<String>,
    },
    JunctionFlow {
        junction: String,
    },
}
