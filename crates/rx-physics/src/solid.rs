//! Fuel rods: radial heat conduction in fuel pellet and cladding.
//!
//! Each axial node is an independent radial problem (no axial conduction).
//! Fuel and cladding are split into equal-thickness rings; ring temperatures
//! sit at ring mid-radii. All heat flows are per unit rod length.

use std::f64::consts::PI;

use rx_controls::{Control, SignalId};
use rx_project::{FuelRodDef, MaterialDef, SubsystemKind};

use crate::coupling::Coupling;
use crate::error::{PhysicsError, PhysicsResult, check_len, check_temperature};
use crate::material::Material;
use crate::subsystem::Subsystem;

/// Equal-thickness rings between two radii.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialMesh {
    /// Ring boundaries (m), `nr + 1` entries.
    faces: Vec<f64>,
}

impl RadialMesh {
    pub fn new(r_in: f64, r_out: f64, nr: usize) -> PhysicsResult<Self> {
        if nr == 0 || !(r_in >= 0.0) || !(r_out > r_in) {
            return Err(PhysicsError::InvalidArg {
                what: format!("radial mesh needs 0 <= r_in < r_out and nr > 0 (r_in={r_in}, r_out={r_out}, nr={nr})"),
            });
        }
        let dr = (r_out - r_in) / nr as f64;
        let faces = (0..=nr).map(|i| r_in + dr * i as f64).collect();
        Ok(Self { faces })
    }

    pub fn nr(&self) -> usize {
        self.faces.len() - 1
    }

    pub fn r_in(&self) -> f64 {
        self.faces[0]
    }

    pub fn r_out(&self) -> f64 {
        self.faces[self.nr()]
    }

    /// Mid-radius of ring `i`.
    pub fn center(&self, i: usize) -> f64 {
        0.5 * (self.faces[i] + self.faces[i + 1])
    }

    /// Cross-section area of ring `i` (m², i.e. volume per metre).
    pub fn area(&self, i: usize) -> f64 {
        PI * (self.faces[i + 1].powi(2) - self.faces[i].powi(2))
    }

    /// Conductance (W/m/K) between ring `i` and ring `i + 1`.
    fn inner_conductance(&self, i: usize, k: f64) -> f64 {
        2.0 * PI * self.faces[i + 1] * k / (self.center(i + 1) - self.center(i))
    }

    /// Thermal resistance (m·K/W) from the last ring centre to the outer face.
    fn outer_half_resistance(&self, k: f64) -> f64 {
        let n = self.nr();
        (self.r_out() - self.center(n - 1)) / (2.0 * PI * self.r_out() * k)
    }

    /// Thermal resistance (m·K/W) from the inner face to the first ring centre.
    fn inner_half_resistance(&self, k: f64) -> f64 {
        (self.center(0) - self.r_in()) / (2.0 * PI * self.r_in() * k)
    }
}

/// One fuel rod with `nz` axial nodes.
#[derive(Debug, Clone)]
pub struct FuelRod {
    id: String,
    dz: Vec<f64>,
    kz: Vec<f64>,
    q_linear: f64,
    fuel: Material,
    clad: Material,
    fuel_mesh: RadialMesh,
    clad_mesh: RadialMesh,
    gap_conductance: f64,
    htc: f64,
    coolant_temperature: SignalId,
    /// Junction index and nominal flow scaling the heat transfer coefficient.
    flow_scaling: Option<(usize, f64)>,
    /// `[axial][ring]` temperatures (K)
    fuel_temp: Vec<Vec<f64>>,
    clad_temp: Vec<Vec<f64>>,
}

impl FuelRod {
    pub fn from_def(
        def: &FuelRodDef,
        materials: &[MaterialDef],
        control: &Control,
        junction_ids: &[String],
    ) -> PhysicsResult<Self> {
        let material = |name: &str| -> PhysicsResult<Material> {
            let m = materials
                .iter()
                .find(|m| m.id == name)
                .ok_or_else(|| PhysicsError::InvalidArg {
                    what: format!("fuel rod '{}' uses unknown material '{name}'", def.id),
                })?;
            Material::from_def(m)
        };
        let nz = def.nz();
        if nz == 0 || def.axial.kz.len() != nz {
            return Err(PhysicsError::InvalidArg {
                what: format!("fuel rod '{}' needs matching non-empty dz/kz lists", def.id),
            });
        }
        let fuel_mesh = RadialMesh::new(0.0, def.fuel.r_out_m, def.fuel.nr)?;
        let clad_mesh = RadialMesh::new(def.clad.r_in_m, def.clad.r_out_m, def.clad.nr)?;
        if clad_mesh.r_in() < fuel_mesh.r_out() {
            return Err(PhysicsError::InvalidArg {
                what: format!("fuel rod '{}' cladding overlaps the pellet", def.id),
            });
        }
        let flow_scaling = match (&def.coolant.flow_junction, def.coolant.mdot_nominal_kg_s) {
            (Some(junction), Some(mdot_nominal)) => {
                let index = junction_ids.iter().position(|j| j == junction).ok_or_else(|| {
                    PhysicsError::InvalidArg {
                        what: format!("fuel rod '{}' references unknown junction '{junction}'", def.id),
                    }
                })?;
                Some((index, mdot_nominal))
            }
            (Some(_), None) => {
                return Err(PhysicsError::InvalidArg {
                    what: format!("fuel rod '{}' needs mdot_nominal_kg_s with flow_junction", def.id),
                });
            }
            _ => None,
        };
        let t0 = def.initial_temperature_k;
        Ok(Self {
            id: def.id.clone(),
            dz: def.axial.dz_m.clone(),
            kz: def.axial.kz.clone(),
            q_linear: def.q_linear_w_m,
            fuel: material(&def.fuel.material)?,
            clad: material(&def.clad.material)?,
            fuel_temp: vec![vec![t0; fuel_mesh.nr()]; nz],
            clad_temp: vec![vec![t0; clad_mesh.nr()]; nz],
            fuel_mesh,
            clad_mesh,
            gap_conductance: def.gap.conductance_w_m2k,
            htc: def.coolant.htc_w_m2k,
            coolant_temperature: control.signal_id(&def.coolant.temperature_signal)?,
            flow_scaling,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn nz(&self) -> usize {
        self.dz.len()
    }

    pub fn fuel_mesh(&self) -> &RadialMesh {
        &self.fuel_mesh
    }

    pub fn clad_mesh(&self) -> &RadialMesh {
        &self.clad_mesh
    }

    pub fn fuel_temperatures(&self, j: usize) -> &[f64] {
        &self.fuel_temp[j]
    }

    pub fn clad_temperatures(&self, j: usize) -> &[f64] {
        &self.clad_temp[j]
    }

    fn node_length(&self) -> usize {
        self.fuel_mesh.nr() + self.clad_mesh.nr()
    }

    pub fn state_length(&self) -> usize {
        self.nz() * self.node_length()
    }

    /// Volume-weighted fuel temperature over the whole rod (K).
    pub fn fuel_temperature_average(&self) -> f64 {
        let (sum, volume) = self.fuel_temperature_moments();
        sum / volume
    }

    fn fuel_temperature_moments(&self) -> (f64, f64) {
        let mut sum = 0.0;
        let mut volume = 0.0;
        for (j, dz) in self.dz.iter().enumerate() {
            for (i, temp) in self.fuel_temp[j].iter().enumerate() {
                let v = self.fuel_mesh.area(i) * dz;
                sum += temp * v;
                volume += v;
            }
        }
        (sum, volume)
    }

    fn state_labels_into(&self, labels: &mut Vec<String>) {
        for j in 0..self.nz() {
            for i in 0..self.fuel_mesh.nr() {
                labels.push(format!("{}/z{j:03}/tempf-{i:03}", self.id));
            }
            for i in 0..self.clad_mesh.nr() {
                labels.push(format!("{}/z{j:03}/tempc-{i:03}", self.id));
            }
        }
    }

    fn read_state_into(&self, y: &mut Vec<f64>) {
        for j in 0..self.nz() {
            y.extend_from_slice(&self.fuel_temp[j]);
            y.extend_from_slice(&self.clad_temp[j]);
        }
    }

    fn write_state_from(&mut self, y: &[f64]) {
        let nf = self.fuel_mesh.nr();
        let nc = self.clad_mesh.nr();
        for (j, node) in y.chunks_exact(nf + nc).enumerate() {
            self.fuel_temp[j].copy_from_slice(&node[..nf]);
            self.clad_temp[j].copy_from_slice(&node[nf..]);
        }
    }

    /// Coolant-side heat transfer coefficient, scaled by flow when coupled.
    fn effective_htc(&self, coupling: &Coupling<'_>) -> f64 {
        match self.flow_scaling {
            Some((junction, mdot_nominal)) => {
                let mdot = coupling.plant.fluid.flow(junction, coupling.boundary);
                self.htc * (mdot.abs() / mdot_nominal).powf(0.8)
            }
            None => self.htc,
        }
    }

    fn compute_rhs_into(&self, coupling: &Coupling<'_>, out: &mut [f64]) -> PhysicsResult<()> {
        let nf = self.fuel_mesh.nr();
        let nc = self.clad_mesh.nr();
        let power = coupling.reactor_power();
        let t_cool = check_temperature(coupling.boundary.get(self.coolant_temperature), || {
            format!("coolant of fuel rod '{}'", self.id)
        })?;
        let htc = self.effective_htc(coupling);
        if !htc.is_finite() {
            return Err(PhysicsError::NonPhysical {
                location: format!("coolant of fuel rod '{}'", self.id),
                what: "heat transfer coefficient",
                value: htc,
            });
        }

        let r_fo = self.fuel_mesh.r_out();
        let r_ci = self.clad_mesh.r_in();
        let r_co = self.clad_mesh.r_out();
        let gap_resistance = self.fuel_mesh.outer_half_resistance(self.fuel.k)
            + 1.0 / (self.gap_conductance * PI * (r_fo + r_ci))
            + self.clad_mesh.inner_half_resistance(self.clad.k);
        let g_gap = 1.0 / gap_resistance;
        // Written as a product so that htc = 0 gives zero conductance.
        let h_perimeter = htc * 2.0 * PI * r_co;
        let g_cool = h_perimeter / (1.0 + h_perimeter * self.clad_mesh.outer_half_resistance(self.clad.k));
        let pellet_area = PI * r_fo * r_fo;

        for (j, node_out) in out.chunks_exact_mut(nf + nc).enumerate() {
            let tf = &self.fuel_temp[j];
            let tc = &self.clad_temp[j];
            for (i, t) in tf.iter().enumerate() {
                check_temperature(*t, || format!("fuel rod '{}' node {j} fuel ring {i}", self.id))?;
            }
            for (i, t) in tc.iter().enumerate() {
                check_temperature(*t, || format!("fuel rod '{}' node {j} clad ring {i}", self.id))?;
            }

            let q_vol = self.q_linear * self.kz[j] * power / pellet_area;
            let (fuel_out, clad_out) = node_out.split_at_mut(nf);

            // Fuel rings: heat flows outward from ring i to ring i + 1.
            let mut q_in = 0.0;
            for i in 0..nf {
                let q_out = if i + 1 < nf {
                    self.fuel_mesh.inner_conductance(i, self.fuel.k) * (tf[i] - tf[i + 1])
                } else {
                    g_gap * (tf[i] - tc[0])
                };
                let area = self.fuel_mesh.area(i);
                fuel_out[i] = (q_in - q_out + q_vol * area) / (self.fuel.rho_cp() * area);
                q_in = q_out;
            }

            for i in 0..nc {
                let q_out = if i + 1 < nc {
                    self.clad_mesh.inner_conductance(i, self.clad.k) * (tc[i] - tc[i + 1])
                } else {
                    g_cool * (tc[i] - t_cool)
                };
                let area = self.clad_mesh.area(i);
                clad_out[i] = (q_in - q_out) / (self.clad.rho_cp() * area);
                q_in = q_out;
            }
        }
        Ok(())
    }
}

/// All fuel rods of the core.
#[derive(Debug, Clone, Default)]
pub struct Solid {
    rods: Vec<FuelRod>,
}

impl Solid {
    pub fn new(rods: Vec<FuelRod>) -> Self {
        Self { rods }
    }

    pub fn from_defs(
        defs: &[FuelRodDef],
        materials: &[MaterialDef],
        control: &Control,
        junction_ids: &[String],
    ) -> PhysicsResult<Self> {
        let rods = defs
            .iter()
            .map(|d| FuelRod::from_def(d, materials, control, junction_ids))
            .collect::<PhysicsResult<Vec<_>>>()?;
        Ok(Self { rods })
    }

    pub fn rods(&self) -> &[FuelRod] {
        &self.rods
    }

    pub fn is_empty(&self) -> bool {
        self.rods.is_empty()
    }

    /// Volume-weighted fuel temperature over all rods (K).
    pub fn fuel_temperature_average(&self) -> f64 {
        let (sum, volume) = self
            .rods
            .iter()
            .map(FuelRod::fuel_temperature_moments)
            .fold((0.0, 0.0), |acc, m| (acc.0 + m.0, acc.1 + m.1));
        sum / volume
    }
}

impl Subsystem for Solid {
    fn kind(&self) -> SubsystemKind {
        SubsystemKind::Fuelrod
    }

    fn state_length(&self) -> usize {
        self.rods.iter().map(FuelRod::state_length).sum()
    }

    fn state_labels(&self) -> Vec<String> {
        let mut labels = Vec::with_capacity(self.state_length());
        for rod in &self.rods {
            rod.state_labels_into(&mut labels);
        }
        labels
    }

    fn read_state(&self) -> Vec<f64> {
        let mut y = Vec::with_capacity(self.state_length());
        for rod in &self.rods {
            rod.read_state_into(&mut y);
        }
        y
    }

    fn write_state(&mut self, y: &[f64]) -> PhysicsResult<()> {
        check_len("fuel rods", self.state_length(), y.len())?;
        let mut offset = 0;
        for rod in &mut self.rods {
            let n = rod.state_length();
            rod.write_state_from(&y[offset..offset + n]);
            offset += n;
        }
        Ok(())
    }

    fn compute_rhs(&self, _t: f64, coupling: &Coupling<'_>, out: &mut [f64]) -> PhysicsResult<()> {
        check_len("fuel rod derivatives", self.state_length(), out.len())?;
        let mut offset = 0;
        for rod in &self.rods {
            let n = rod.state_length();
            rod.compute_rhs_into(coupling, &mut out[offset..offset + n])?;
            offset += n;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupling::PlantView;
    use crate::fluid::Fluid;
    use crate::neutron::PointKinetics;
    use rx_controls::Boundary;
    use rx_project::{
        AxialDef, CladDef, ControlDef, CoolantDef, GapDef, PelletDef, SignalDef, SignalKindDef,
    };

    fn materials() -> Vec<MaterialDef> {
        vec![
            MaterialDef {
                id: "uo2".to_string(),
                conductivity_w_mk: 3.0,
                density_kg_m3: 10_400.0,
                heat_capacity_j_kgk: 300.0,
            },
            MaterialDef {
                id: "zry".to_string(),
                conductivity_w_mk: 15.0,
                density_kg_m3: 6_500.0,
                heat_capacity_j_kgk: 330.0,
            },
        ]
    }

    fn rod_def(q_linear: f64, t0: f64) -> FuelRodDef {
        FuelRodDef {
            id: "r1".to_string(),
            axial: AxialDef {
                dz_m: vec![0.5, 0.5],
                kz: vec![1.0, 1.0],
            },
            q_linear_w_m: q_linear,
            fuel: PelletDef {
                material: "uo2".to_string(),
                r_out_m: 0.004,
                nr: 3,
            },
            gap: GapDef {
                conductance_w_m2k: 5_000.0,
            },
            clad: CladDef {
                material: "zry".to_string(),
                r_in_m: 0.0041,
                r_out_m: 0.0047,
                nr: 2,
            },
            coolant: CoolantDef {
                htc_w_m2k: 30_000.0,
                temperature_signal: "tcool".to_string(),
                flow_junction: None,
                mdot_nominal_kg_s: None,
            },
            initial_temperature_k: t0,
        }
    }

    fn control() -> Control {
        let def = ControlDef {
            signals: vec![SignalDef {
                id: "tcool".to_string(),
                kind: SignalKindDef::Constant { value: 560.0 },
            }],
            reactor_power: None,
        };
        Control::compile(&def, &["r1".to_string()], &[]).unwrap()
    }

    fn derivatives(solid: &Solid) -> PhysicsResult<Vec<f64>> {
        let fluid = Fluid::default();
        let neutron = PointKinetics::fixed_power(1.0);
        let boundary = Boundary::new(0.0, vec![560.0]);
        let coupling = Coupling {
            plant: PlantView {
                solid,
                fluid: &fluid,
                neutron: &neutron,
            },
            boundary: &boundary,
            kinetics_solved: false,
            power_signal: None,
        };
        let mut out = vec![0.0; solid.state_length()];
        solid.compute_rhs(0.0, &coupling, &mut out)?;
        Ok(out)
    }

    #[test]
    fn mesh_areas_sum_to_annulus() {
        let mesh = RadialMesh::new(0.001, 0.003, 4).unwrap();
        let total: f64 = (0..4).map(|i| mesh.area(i)).sum();
        let expected = PI * (0.003f64.powi(2) - 0.001f64.powi(2));
        assert!((total - expected).abs() < 1e-18);
    }

    #[test]
    fn state_layout_is_fuel_then_clad_per_node() {
        let solid = Solid::from_defs(&[rod_def(0.0, 600.0)], &materials(), &control(), &[]).unwrap();
        assert_eq!(solid.state_length(), 2 * (3 + 2));
        let labels = solid.state_labels();
        assert_eq!(labels[0], "r1/z000/tempf-000");
        assert_eq!(labels[3], "r1/z000/tempc-000");
        assert_eq!(labels[5], "r1/z001/tempf-000");
    }

    #[test]
    fn isothermal_unheated_rod_at_coolant_temperature_is_steady() {
        let solid = Solid::from_defs(&[rod_def(0.0, 560.0)], &materials(), &control(), &[]).unwrap();
        let rates = derivatives(&solid).unwrap();
        assert!(rates.iter().all(|r| r.abs() < 1e-12));
    }

    #[test]
    fn heated_rod_warms_up_and_fuel_heats_fastest() {
        let solid =
            Solid::from_defs(&[rod_def(20_000.0, 560.0)], &materials(), &control(), &[]).unwrap();
        let rates = derivatives(&solid).unwrap();
        assert!(rates[0] > 0.0);
        // Cladding starts at coolant temperature and has no source.
        assert!(rates[3].abs() < rates[0]);
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut solid =
            Solid::from_defs(&[rod_def(0.0, 600.0)], &materials(), &control(), &[]).unwrap();
        let y: Vec<f64> = (0..solid.state_length()).map(|i| 500.0 + i as f64).collect();
        solid.write_state(&y).unwrap();
        assert_eq!(solid.read_state(), y);
        assert_eq!(solid.rods()[0].clad_temperatures(1), &[508.0, 509.0]);
    }

    #[test]
    fn negative_temperature_is_non_physical() {
        let mut solid =
            Solid::from_defs(&[rod_def(0.0, 600.0)], &materials(), &control(), &[]).unwrap();
        let mut y = solid.read_state();
        y[4] = -1.0;
        solid.write_state(&y).unwrap();
        assert!(matches!(
            derivatives(&solid),
            Err(PhysicsError::NonPhysical { what: "temperature", .. })
        ));
    }

    #[test]
    fn wrong_state_length_is_rejected() {
        let mut solid =
            Solid::from_defs(&[rod_def(0.0, 600.0)], &materials(), &control(), &[]).unwrap();
        assert!(matches!(
            solid.write_state(&[1.0, 2.0]),
            Err(PhysicsError::LengthMismatch { .. })
        ));
    }
}
