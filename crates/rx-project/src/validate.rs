//! Case validation logic.

use crate::schema::{
    CaseDef, ControlDef, FluidDef, FuelRodDef, JunctionKindDef, MeasuredDef, PointKineticsDef,
    SignalKindDef, SolverDef, SolverKindDef, SubsystemKind, TimeDef,
};
use std::collections::HashSet;

pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Length mismatch: {field} has {actual} entries, expected {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("Missing section '{section}' required by solve entry '{kind}'")]
    MissingSection { section: String, kind: SubsystemKind },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

type VResult = Result<(), ValidationError>;

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: impl Into<String>, value: f64) -> VResult {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be finite and positive"))
    }
}

fn non_negative(field: impl Into<String>, value: f64) -> VResult {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be finite and non-negative"))
    }
}

pub fn validate_case(case: &CaseDef) -> VResult {
    if case.version == 0 || case.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: case.version,
        });
    }

    if case.solve.is_empty() {
        return Err(invalid("solve", "[]", "at least one subsystem must be solved"));
    }
    let mut seen = HashSet::new();
    for kind in &case.solve {
        if !seen.insert(kind) {
            return Err(ValidationError::DuplicateId {
                id: kind.to_string(),
                context: "solve".to_string(),
            });
        }
    }

    validate_time(&case.time)?;
    validate_solver(&case.solver, case)?;
    validate_control(&case.control, case)?;

    if case.solves(SubsystemKind::Fuelrod) {
        if case.fuelrods.is_empty() {
            return Err(ValidationError::MissingSection {
                section: "fuelrods".to_string(),
                kind: SubsystemKind::Fuelrod,
            });
        }
        let mut material_ids = HashSet::new();
        for material in &case.materials {
            if !material_ids.insert(material.id.as_str()) {
                return Err(ValidationError::DuplicateId {
                    id: material.id.clone(),
                    context: "materials".to_string(),
                });
            }
            positive(format!("materials.{}.conductivity_w_mk", material.id), material.conductivity_w_mk)?;
            positive(format!("materials.{}.density_kg_m3", material.id), material.density_kg_m3)?;
            positive(
                format!("materials.{}.heat_capacity_j_kgk", material.id),
                material.heat_capacity_j_kgk,
            )?;
        }
        let mut rod_ids = HashSet::new();
        for rod in &case.fuelrods {
            if !rod_ids.insert(rod.id.as_str()) {
                return Err(ValidationError::DuplicateId {
                    id: rod.id.clone(),
                    context: "fuelrods".to_string(),
                });
            }
            validate_fuelrod(rod, &material_ids, case)?;
        }
    }

    if case.solves(SubsystemKind::Fluid) {
        let fluid = case.fluid.as_ref().ok_or_else(|| ValidationError::MissingSection {
            section: "fluid".to_string(),
            kind: SubsystemKind::Fluid,
        })?;
        validate_fluid(fluid, &case.control)?;
    }

    if case.solves(SubsystemKind::Pointkinetics) {
        let pk = case
            .pointkinetics
            .as_ref()
            .ok_or_else(|| ValidationError::MissingSection {
                section: "pointkinetics".to_string(),
                kind: SubsystemKind::Pointkinetics,
            })?;
        validate_pointkinetics(pk, &case.control)?;
    }

    Ok(())
}

fn validate_time(time: &TimeDef) -> VResult {
    if !time.t0_s.is_finite() {
        return Err(invalid("time.t0_s", time.t0_s, "must be finite"));
    }
    if time.segments.is_empty() {
        return Err(invalid("time.segments", "[]", "at least one segment is required"));
    }
    let mut previous_end = time.t0_s;
    for (i, segment) in time.segments.iter().enumerate() {
        if !segment.end_s.is_finite() || segment.end_s <= previous_end {
            return Err(invalid(
                format!("time.segments[{i}].end_s"),
                segment.end_s,
                "end times must be strictly increasing and after t0",
            ));
        }
        positive(
            format!("time.segments[{i}].output_interval_s"),
            segment.output_interval_s,
        )?;
        previous_end = segment.end_s;
    }
    Ok(())
}

fn validate_solver(solver: &SolverDef, case: &CaseDef) -> VResult {
    positive("solver.rtol", solver.rtol)?;
    positive("solver.atol", solver.atol)?;
    non_negative("solver.h_min_s", solver.h_min_s)?;
    if let Some(h0) = solver.h0_s {
        positive("solver.h0_s", h0)?;
    }
    if let Some(h_max) = solver.h_max_s {
        positive("solver.h_max_s", h_max)?;
    }
    if solver.max_steps == 0 {
        return Err(invalid("solver.max_steps", 0, "must be positive"));
    }
    if let SolverKindDef::Rk4 { dt_s } = solver.kind {
        positive("solver.kind.dt_s", dt_s)?;
    }

    let mut groups = HashSet::new();
    for group in &solver.groups {
        if !groups.insert(group.group) {
            return Err(ValidationError::DuplicateId {
                id: group.group.to_string(),
                context: "solver.groups".to_string(),
            });
        }
        if !case.solves(group.group) {
            return Err(ValidationError::MissingReference {
                id: group.group.to_string(),
                context: "solver.groups (subsystem is not solved)".to_string(),
            });
        }
        if let Some(rtol) = group.rtol {
            positive(format!("solver.groups.{}.rtol", group.group), rtol)?;
        }
        if let Some(atol) = group.atol {
            positive(format!("solver.groups.{}.atol", group.group), atol)?;
        }
    }
    Ok(())
}

fn require_signal(control: &ControlDef, id: &str, context: &str) -> VResult {
    if control.signal_index(id).is_some() {
        Ok(())
    } else {
        Err(ValidationError::MissingReference {
            id: id.to_string(),
            context: context.to_string(),
        })
    }
}

fn validate_control(control: &ControlDef, case: &CaseDef) -> VResult {
    let mut declared: HashSet<&str> = HashSet::new();
    for signal in &control.signals {
        for input in signal.kind.inputs() {
            // Signals are evaluated in declaration order.
            if !declared.contains(input) {
                return Err(ValidationError::MissingReference {
                    id: input.to_string(),
                    context: format!("signal '{}' (inputs must be declared earlier)", signal.id),
                });
            }
        }
        match &signal.kind {
            SignalKindDef::Constant { value } if !value.is_finite() => {
                return Err(invalid(format!("signals.{}.value", signal.id), value, "must be finite"));
            }
            SignalKindDef::Lookup { table, .. } => {
                if table.is_empty() {
                    return Err(invalid(
                        format!("signals.{}.table", signal.id),
                        "[]",
                        "lookup table needs at least one point",
                    ));
                }
                if table.iter().flatten().any(|v| !v.is_finite()) {
                    return Err(invalid(
                        format!("signals.{}.table", signal.id),
                        "non-finite",
                        "table entries must be finite",
                    ));
                }
                if table.windows(2).any(|w| w[1][0] <= w[0][0]) {
                    return Err(invalid(
                        format!("signals.{}.table", signal.id),
                        "x",
                        "x values must be strictly increasing",
                    ));
                }
            }
            SignalKindDef::Sum { inputs, gains } => {
                if inputs.is_empty() {
                    return Err(invalid(format!("signals.{}.inputs", signal.id), "[]", "sum needs inputs"));
                }
                if !gains.is_empty() && gains.len() != inputs.len() {
                    return Err(ValidationError::LengthMismatch {
                        field: format!("signals.{}.gains", signal.id),
                        expected: inputs.len(),
                        actual: gains.len(),
                    });
                }
            }
            SignalKindDef::Measured { reference } => validate_measured(reference, &signal.id, case)?,
            _ => {}
        }
        if !declared.insert(signal.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: signal.id.clone(),
                context: "control.signals".to_string(),
            });
        }
    }

    if let Some(power) = &control.reactor_power {
        require_signal(control, power, "control.reactor_power")?;
    }
    Ok(())
}

fn validate_measured(reference: &MeasuredDef, signal_id: &str, case: &CaseDef) -> VResult {
    match reference {
        MeasuredDef::ReactorPower => Ok(()),
        MeasuredDef::FuelTemperatureAverage { rod_id } => {
            if !case.solves(SubsystemKind::Fuelrod) {
                return Err(ValidationError::MissingSection {
                    section: format!("fuelrods (measured by signal '{signal_id}')"),
                    kind: SubsystemKind::Fuelrod,
                });
            }
            match rod_id {
                Some(id) if !case.fuelrods.iter().any(|r| &r.id == id) => {
                    Err(ValidationError::MissingReference {
                        id: id.clone(),
                        context: format!("signal '{signal_id}' rod_id"),
                    })
                }
                _ => Ok(()),
            }
        }
        MeasuredDef::JunctionFlow { junction } => {
            // Only state-carrying junctions can be measured; dependent flows are
            // themselves signal outputs.
            let exists = case.solves(SubsystemKind::Fluid)
                && case.fluid.as_ref().is_some_and(|f| {
                    f.junctions.iter().any(|j| {
                        &j.id() == junction && matches!(j.kind, JunctionKindDef::Independent { .. })
                    })
                });
            if exists {
                Ok(())
            } else {
                Err(ValidationError::MissingReference {
                    id: junction.clone(),
                    context: format!("signal '{signal_id}' junction"),
                })
            }
        }
    }
}

fn validate_fuelrod(rod: &FuelRodDef, materials: &HashSet<&str>, case: &CaseDef) -> VResult {
    let ctx = |field: &str| format!("fuelrods.{}.{}", rod.id, field);

    if rod.axial.dz_m.is_empty() {
        return Err(invalid(ctx("axial.dz_m"), "[]", "at least one axial node is required"));
    }
    if rod.axial.kz.len() != rod.axial.dz_m.len() {
        return Err(ValidationError::LengthMismatch {
            field: ctx("axial.kz"),
            expected: rod.axial.dz_m.len(),
            actual: rod.axial.kz.len(),
        });
    }
    for dz in &rod.axial.dz_m {
        positive(ctx("axial.dz_m"), *dz)?;
    }
    for kz in &rod.axial.kz {
        non_negative(ctx("axial.kz"), *kz)?;
    }
    non_negative(ctx("q_linear_w_m"), rod.q_linear_w_m)?;
    positive(ctx("initial_temperature_k"), rod.initial_temperature_k)?;

    for (field, material) in [("fuel.material", &rod.fuel.material), ("clad.material", &rod.clad.material)] {
        if !materials.contains(material.as_str()) {
            return Err(ValidationError::MissingReference {
                id: material.clone(),
                context: ctx(field),
            });
        }
    }
    positive(ctx("fuel.r_out_m"), rod.fuel.r_out_m)?;
    if rod.fuel.nr == 0 {
        return Err(invalid(ctx("fuel.nr"), 0, "must be at least 1"));
    }
    if rod.clad.nr == 0 {
        return Err(invalid(ctx("clad.nr"), 0, "must be at least 1"));
    }
    if !(rod.clad.r_in_m >= rod.fuel.r_out_m) {
        return Err(invalid(ctx("clad.r_in_m"), rod.clad.r_in_m, "must not be below the fuel outer radius"));
    }
    if !(rod.clad.r_out_m > rod.clad.r_in_m) {
        return Err(invalid(ctx("clad.r_out_m"), rod.clad.r_out_m, "must exceed the clad inner radius"));
    }
    positive(ctx("gap.conductance_w_m2k"), rod.gap.conductance_w_m2k)?;
    positive(ctx("coolant.htc_w_m2k"), rod.coolant.htc_w_m2k)?;
    require_signal(&case.control, &rod.coolant.temperature_signal, &ctx("coolant.temperature_signal"))?;

    if let Some(junction) = &rod.coolant.flow_junction {
        let exists = case.solves(SubsystemKind::Fluid)
            && case
                .fluid
                .as_ref()
                .is_some_and(|f| f.junctions.iter().any(|j| &j.id() == junction));
        if !exists {
            return Err(ValidationError::MissingReference {
                id: junction.clone(),
                context: ctx("coolant.flow_junction"),
            });
        }
        match rod.coolant.mdot_nominal_kg_s {
            Some(mdot) => positive(ctx("coolant.mdot_nominal_kg_s"), mdot)?,
            None => {
                return Err(invalid(
                    ctx("coolant.mdot_nominal_kg_s"),
                    "none",
                    "required when flow_junction is set",
                ));
            }
        }
    }
    Ok(())
}

fn validate_fluid(fluid: &FluidDef, control: &ControlDef) -> VResult {
    if fluid.junctions.is_empty() {
        return Err(invalid("fluid.junctions", "[]", "at least one junction is required"));
    }
    let mut ids = HashSet::new();
    for junction in &fluid.junctions {
        let id = junction.id();
        let ctx = |field: &str| format!("fluid.junctions.{id}.{field}");
        match &junction.kind {
            JunctionKindDef::Independent {
                initial_mdot_kg_s,
                inertia_l_over_a_per_m,
                loss_coefficient,
                flow_area_m2,
                density_kg_m3,
                pump_head_signal,
            } => {
                if !initial_mdot_kg_s.is_finite() {
                    return Err(invalid(ctx("initial_mdot_kg_s"), initial_mdot_kg_s, "must be finite"));
                }
                positive(ctx("inertia_l_over_a_per_m"), *inertia_l_over_a_per_m)?;
                non_negative(ctx("loss_coefficient"), *loss_coefficient)?;
                positive(ctx("flow_area_m2"), *flow_area_m2)?;
                positive(ctx("density_kg_m3"), *density_kg_m3)?;
                if let Some(signal) = pump_head_signal {
                    require_signal(control, signal, &ctx("pump_head_signal"))?;
                }
            }
            JunctionKindDef::Dependent { flow_signal } => {
                require_signal(control, flow_signal, &ctx("flow_signal"))?;
            }
        }
        if !ids.insert(id.clone()) {
            return Err(ValidationError::DuplicateId {
                id,
                context: "fluid.junctions".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_pointkinetics(pk: &PointKineticsDef, control: &ControlDef) -> VResult {
    non_negative("pointkinetics.initial_power", pk.initial_power)?;
    positive("pointkinetics.prompt_generation_time_s", pk.prompt_generation_time_s)?;
    if pk.groups.is_empty() {
        return Err(invalid(
            "pointkinetics.groups",
            "[]",
            "at least one delayed neutron group is required",
        ));
    }
    for (i, group) in pk.groups.iter().enumerate() {
        positive(format!("pointkinetics.groups[{i}].beta"), group.beta)?;
        positive(format!("pointkinetics.groups[{i}].lambda_per_s"), group.lambda_per_s)?;
    }
    if let Some(signal) = &pk.reactivity_signal {
        require_signal(control, signal, "pointkinetics.reactivity_signal")?;
    }
    if let Some(doppler) = &pk.doppler {
        if !doppler.coefficient_per_k.is_finite() {
            return Err(invalid(
                "pointkinetics.doppler.coefficient_per_k",
                doppler.coefficient_per_k,
                "must be finite",
            ));
        }
        positive(
            "pointkinetics.doppler.reference_temperature_k",
            doppler.reference_temperature_k,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::*;

    fn kinetics_only() -> CaseDef {
        CaseDef {
            version: 1,
            name: "pk".to_string(),
            solve: vec![SubsystemKind::Pointkinetics],
            time: TimeDef {
                t0_s: 0.0,
                segments: vec![SegmentDef {
                    end_s: 10.0,
                    output_interval_s: 1.0,
                }],
            },
            solver: SolverDef::default(),
            materials: vec![],
            fuelrods: vec![],
            fluid: None,
            pointkinetics: Some(PointKineticsDef {
                initial_power: 1.0,
                prompt_generation_time_s: 1e-4,
                groups: vec![DnpGroupDef {
                    beta: 0.0065,
                    lambda_per_s: 0.08,
                }],
                reactivity_signal: None,
                doppler: None,
            }),
            control: ControlDef::default(),
        }
    }

    #[test]
    fn kinetics_only_case_is_valid() {
        validate_case(&kinetics_only()).unwrap();
    }

    #[test]
    fn non_increasing_segments_rejected() {
        let mut case = kinetics_only();
        case.time.segments.push(SegmentDef {
            end_s: 10.0,
            output_interval_s: 1.0,
        });
        let err = validate_case(&case).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "time.segments[1].end_s"));
    }

    #[test]
    fn missing_section_rejected() {
        let mut case = kinetics_only();
        case.pointkinetics = None;
        assert!(matches!(
            validate_case(&case),
            Err(ValidationError::MissingSection {
                kind: SubsystemKind::Pointkinetics,
                ..
            })
        ));
    }

    #[test]
    fn signal_forward_reference_rejected() {
        let mut case = kinetics_only();
        case.control.signals = vec![
            SignalDef {
                id: "rho".to_string(),
                kind: SignalKindDef::Lookup {
                    input: "t".to_string(),
                    table: vec![[0.0, 0.0], [1.0, 1e-3]],
                },
            },
            SignalDef {
                id: "t".to_string(),
                kind: SignalKindDef::Time,
            },
        ];
        assert!(matches!(
            validate_case(&case),
            Err(ValidationError::MissingReference { ref id, .. }) if id == "t"
        ));
    }

    #[test]
    fn lookup_table_must_increase() {
        let mut case = kinetics_only();
        case.control.signals = vec![
            SignalDef {
                id: "t".to_string(),
                kind: SignalKindDef::Time,
            },
            SignalDef {
                id: "rho".to_string(),
                kind: SignalKindDef::Lookup {
                    input: "t".to_string(),
                    table: vec![[1.0, 0.0], [1.0, 1e-3]],
                },
            },
        ];
        assert!(validate_case(&case).is_err());
    }

    #[test]
    fn duplicate_solve_entry_rejected() {
        let mut case = kinetics_only();
        case.solve.push(SubsystemKind::Pointkinetics);
        assert!(matches!(
            validate_case(&case),
            Err(ValidationError::DuplicateId { .. })
        ));
    }

    #[test]
    fn tolerance_group_must_be_solved() {
        let mut case = kinetics_only();
        case.solver.groups.push(GroupToleranceDef {
            group: SubsystemKind::Fluid,
            rtol: None,
            atol: Some(1e-3),
        });
        assert!(matches!(
            validate_case(&case),
            Err(ValidationError::MissingReference { .. })
        ));
    }
}
