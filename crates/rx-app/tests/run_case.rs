use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use rx_app::{AppError, RunRequest, layout, list_runs, load_case, load_run, run_case, validate_case};
use rx_project::SubsystemKind;
use rx_results::RunStatus;
use rx_sim::SimError;

const PK_CASE: &str = r#"
version: 1
name: pk step
solve: [pointkinetics]
time:
  segments:
    - { end_s: 1.0, output_interval_s: 0.25 }
    - { end_s: 2.0, output_interval_s: 0.5 }
pointkinetics:
  prompt_generation_time_s: 2.0e-5
  groups:
    - { beta: 0.000215, lambda_per_s: 0.0124 }
    - { beta: 0.001424, lambda_per_s: 0.0305 }
  reactivity_signal: rho
control:
  signals:
    - { id: rho, kind: { type: Constant, value: 0.0 } }
"#;

const ROD_CASE: &str = r#"
version: 1
name: rod with failing coolant
solve: [fuelrod]
time:
  segments:
    - { end_s: 1.0, output_interval_s: 0.1 }
materials:
  - { id: uo2, conductivity_w_mk: 3.0, density_kg_m3: 10400.0, heat_capacity_j_kgk: 300.0 }
  - { id: zry, conductivity_w_mk: 15.0, density_kg_m3: 6500.0, heat_capacity_j_kgk: 330.0 }
fuelrods:
  - id: rod1
    axial: { dz_m: [0.5, 0.5], kz: [1.0, 1.0] }
    q_linear_w_m: 10000.0
    fuel: { material: uo2, r_out_m: 0.0041, nr: 3 }
    gap: { conductance_w_m2k: 5000.0 }
    clad: { material: zry, r_in_m: 0.0042, r_out_m: 0.00475, nr: 2 }
    coolant: { htc_w_m2k: 30000.0, temperature_signal: tcool }
    initial_temperature_k: 600.0
control:
  signals:
    - { id: t, kind: { type: Time } }
    - id: tcool
      kind:
        type: Lookup
        input: t
        table: [[0.0, 560.0], [0.3, 560.0], [0.4, -10.0]]
"#;

fn scratch(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("rx_app_{name}_{nanos}"));
    std::fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn write_case(dir: &Path, yaml: &str) -> PathBuf {
    let path = dir.join("case.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn completed_run_is_persisted_with_manifest_and_input_copy() {
    let dir = scratch("completed");
    let case_path = write_case(&dir, PK_CASE);
    let output_root = dir.join("runs");

    let response = run_case(&RunRequest {
        case_path: &case_path,
        output_root: &output_root,
        cancel: None,
    })
    .unwrap();

    assert_eq!(response.summary.samples, 6);
    assert_eq!(response.manifest.status, RunStatus::Completed);
    assert_eq!(response.manifest.t_final_s, Some(2.0));
    assert_eq!(response.manifest.solve, vec![SubsystemKind::Pointkinetics]);
    assert_eq!(response.manifest.solver, "DormandPrince");
    assert_eq!(response.manifest.input_sha256.len(), 64);
    assert_eq!(
        std::fs::read_to_string(response.run_dir.join("input.yaml")).unwrap(),
        PK_CASE
    );

    let runs = list_runs(&output_root).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].0, response.run_dir);

    let (manifest, tables) = load_run(&response.run_dir).unwrap();
    assert_eq!(manifest, response.manifest);
    assert_eq!(tables.len(), 1);
    let (name, power) = &tables[0];
    assert_eq!(name, "power.dat");
    assert_eq!(power.columns, vec!["power(-)", "cdnp-000(-)", "cdnp-001(-)"]);
    assert_eq!(power.times(), vec![0.25, 0.5, 0.75, 1.0, 1.5, 2.0]);
}

#[test]
fn cancelled_run_leaves_a_failed_manifest() {
    let dir = scratch("cancelled");
    let case_path = write_case(&dir, PK_CASE);
    let output_root = dir.join("runs");

    let err = run_case(&RunRequest {
        case_path: &case_path,
        output_root: &output_root,
        cancel: Some(Arc::new(AtomicBool::new(true))),
    })
    .unwrap_err();

    let (run_dir, source) = match err {
        AppError::RunFailed { run_dir, source } => (run_dir, source),
        other => panic!("expected a failed run, got {other:?}"),
    };
    assert!(matches!(source, SimError::Cancelled { .. }));
    let (manifest, tables) = load_run(&run_dir).unwrap();
    assert_eq!(manifest.status, RunStatus::Failed);
    assert_eq!(manifest.samples, 0);
    assert!(manifest.error.unwrap().contains("cancelled"));
    assert!(tables[0].1.rows.is_empty());
}

#[test]
fn domain_abort_leaves_a_failed_manifest_and_earlier_rows() {
    let dir = scratch("domain");
    let case_path = write_case(&dir, ROD_CASE);
    let output_root = dir.join("runs");

    let err = run_case(&RunRequest {
        case_path: &case_path,
        output_root: &output_root,
        cancel: None,
    })
    .unwrap_err();

    let (run_dir, source) = match err {
        AppError::RunFailed { run_dir, source } => (run_dir, source),
        other => panic!("expected a failed run, got {other:?}"),
    };
    match &source {
        SimError::Domain { subsystem, t, .. } => {
            assert_eq!(subsystem, "fuelrod");
            assert!(*t > 0.3 && *t < 0.4, "aborted at t = {t}");
        }
        other => panic!("expected a domain error, got {other:?}"),
    }

    let (manifest, tables) = load_run(&run_dir).unwrap();
    assert_eq!(manifest.status, RunStatus::Failed);
    assert_eq!(manifest.samples, 3);
    assert!(manifest.error.unwrap().contains("fuelrod"));
    let (name, rod) = &tables[0];
    assert_eq!(name, "temp-fuelrod-rod1-000.dat");
    let times = rod.times();
    assert_eq!(times.len(), 3);
    for (got, want) in times.iter().zip([0.1, 0.2, 0.3]) {
        assert!((got - want).abs() < 1e-9);
    }
    assert!(rod.rows.iter().flatten().all(|v| v.is_finite()));
}

#[test]
fn setup_errors_do_not_create_a_run() {
    let dir = scratch("setup");
    let broken = PK_CASE.replace("solve: [pointkinetics]", "solve: [pointkinetics, fluid]");
    let case_path = write_case(&dir, &broken);
    let output_root = dir.join("runs");

    let err = run_case(&RunRequest {
        case_path: &case_path,
        output_root: &output_root,
        cancel: None,
    })
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Setup(SimError::Config { .. }) | AppError::Project(_)
    ));
    assert!(!output_root.exists());
}

#[test]
fn missing_case_file_is_reported_with_its_path() {
    let dir = scratch("missing");
    let err = load_case(&dir.join("nope.yaml")).unwrap_err();
    assert!(matches!(err, AppError::CaseFileRead { .. }));
    assert!(err.to_string().contains("nope.yaml"));
}

#[test]
fn validate_and_layout_describe_the_state_vector() {
    let dir = scratch("layout");
    let case = load_case(&write_case(&dir, PK_CASE)).unwrap();

    let summary = validate_case(&case).unwrap();
    assert_eq!(summary.name, "pk step");
    assert_eq!(summary.state_len, 3);
    assert_eq!(summary.streams, vec!["power.dat"]);

    let entries = layout(&case).unwrap();
    let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, vec!["power", "cdnp-000", "cdnp-001"]);
    assert!(entries.iter().all(|e| e.subsystem == SubsystemKind::Pointkinetics));
    assert_eq!(entries[2].index, 2);
}
