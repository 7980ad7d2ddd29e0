//! Run execution and run store access.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use rx_results::{
    RunDir, RunManifest, RunStatus, RunStore, StreamSet, StreamSpec, Table, input_digest,
    read_table,
};
use rx_sim::{Driver, Plant, Reactor, RunSummary, Solver, StateSchema};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

/// Request to execute one case.
pub struct RunRequest<'a> {
    pub case_path: &'a Path,
    /// Root of the run store; a timestamped directory is created under it.
    pub output_root: &'a Path,
    pub cancel: Option<Arc<AtomicBool>>,
}

#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_dir: PathBuf,
    pub manifest: RunManifest,
    pub summary: RunSummary,
    pub wall_time_s: f64,
}

/// Execute a case into a fresh run directory.
///
/// Setup errors (bad case, inconsistent state layout, unusable output root)
/// are returned before anything is integrated. Once the run directory exists
/// its manifest always ends up `completed` or `failed`, and a failure is
/// reported as [`AppError::RunFailed`].
pub fn run_case(request: &RunRequest) -> AppResult<RunResponse> {
    let started = Instant::now();

    let bytes = std::fs::read(request.case_path).map_err(|e| AppError::CaseFileRead {
        path: request.case_path.to_path_buf(),
        source: e,
    })?;
    let content = String::from_utf8_lossy(&bytes);
    let case = rx_project::from_yaml_str(&content)?;
    info!(case = %case.name, path = %request.case_path.display(), "case loaded");

    let mut reactor = Reactor::from_case(&case)?;
    let schema = StateSchema::build(&reactor)?;
    let y0 = schema.pack(&reactor)?;
    let solver = Solver::from_def(&case.solver, &schema, case.time.t0_s, y0)?;
    info!(
        state_len = schema.len(),
        solver = solver.name(),
        "plant assembled"
    );

    let store = RunStore::new(request.output_root.to_path_buf())?;
    let run_dir = store.create_run()?;
    let mut manifest = RunManifest {
        case_name: case.name.clone(),
        timestamp: run_dir.timestamp().to_string(),
        input_sha256: input_digest(&bytes),
        solve: reactor.active().to_vec(),
        solver: solver.name().to_string(),
        status: RunStatus::Running,
        t_final_s: None,
        samples: 0,
        streams: reactor.streams().iter().map(|s| s.file_name.clone()).collect(),
        error: None,
    };
    let mut streams = prepare_run(&run_dir, &mut manifest, request.case_path, reactor.streams())?;
    info!(run_dir = %run_dir.path().display(), "run directory created");

    let (outcome, summary) = {
        let mut driver = Driver::new(&mut reactor, &schema, solver);
        if let Some(flag) = &request.cancel {
            driver = driver.with_cancel_flag(Arc::clone(flag));
        }
        let outcome = driver.run(&case.time.segments, &mut streams);
        (outcome, driver.summary())
    };
    let closed = streams.close();

    manifest.samples = summary.samples;
    manifest.t_final_s = Some(summary.t_final);
    let failure = match (outcome, closed) {
        (Err(e), _) => Some(e),
        (Ok(_), Err(e)) => Some(e.into()),
        (Ok(_), Ok(())) => None,
    };
    match &failure {
        Some(e) => {
            manifest.status = RunStatus::Failed;
            manifest.error = Some(e.to_string());
        }
        None => manifest.status = RunStatus::Completed,
    }
    run_dir.write_manifest(&manifest)?;

    let wall_time_s = started.elapsed().as_secs_f64();
    match failure {
        Some(source) => {
            warn!(run_dir = %run_dir.path().display(), error = %source, "run failed");
            Err(AppError::RunFailed {
                run_dir: run_dir.path().to_path_buf(),
                source,
            })
        }
        None => {
            info!(samples = summary.samples, wall_time_s, "run finished");
            Ok(RunResponse {
                run_dir: run_dir.path().to_path_buf(),
                manifest,
                summary,
                wall_time_s,
            })
        }
    }
}

/// Copy the input and open the streams, then record the run as running.
///
/// A failure here still finalises the manifest as `failed`.
fn prepare_run(
    run_dir: &RunDir,
    manifest: &mut RunManifest,
    case_path: &Path,
    specs: Vec<StreamSpec>,
) -> AppResult<StreamSet> {
    let prepared = run_dir
        .copy_input(case_path)
        .and_then(|_| StreamSet::open(run_dir.path(), specs));
    match prepared {
        Ok(streams) => {
            run_dir.write_manifest(manifest)?;
            Ok(streams)
        }
        Err(e) => {
            manifest.status = RunStatus::Failed;
            manifest.error = Some(e.to_string());
            run_dir.write_manifest(manifest)?;
            Err(AppError::RunFailed {
                run_dir: run_dir.path().to_path_buf(),
                source: e.into(),
            })
        }
    }
}

/// Every run under `output_root` with a readable manifest, oldest first.
pub fn list_runs(output_root: &Path) -> AppResult<Vec<(PathBuf, RunManifest)>> {
    let store = RunStore::new(output_root.to_path_buf())?;
    Ok(store
        .list_runs()?
        .into_iter()
        .map(|(dir, manifest)| (dir.path().to_path_buf(), manifest))
        .collect())
}

/// Manifest plus every data stream of a finished run, in manifest order.
pub fn load_run(run_dir: &Path) -> AppResult<(RunManifest, Vec<(String, Table)>)> {
    let dir = RunDir::open(run_dir.to_path_buf())?;
    let manifest = dir.load_manifest()?;
    let mut tables = Vec::with_capacity(manifest.streams.len());
    for name in &manifest.streams {
        tables.push((name.clone(), read_table(&dir.path().join(name))?));
    }
    Ok((manifest, tables))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rx_project::SubsystemKind;

    fn manifest() -> RunManifest {
        RunManifest {
            case_name: "pk".to_string(),
            timestamp: String::new(),
            input_sha256: input_digest(b""),
            solve: vec![SubsystemKind::Pointkinetics],
            solver: "DormandPrince".to_string(),
            status: RunStatus::Running,
            t_final_s: None,
            samples: 0,
            streams: vec!["power.dat".to_string()],
            error: None,
        }
    }

    fn store(name: &str) -> (PathBuf, RunStore) {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let root = std::env::temp_dir().join(format!("rx_app_{name}_{nanos}"));
        let store = RunStore::new(root.clone()).unwrap();
        let case = root.join("case.yaml");
        std::fs::write(&case, "version: 1\n").unwrap();
        (case, store)
    }

    #[test]
    fn stream_open_failure_finalises_manifest_as_failed() {
        let (case, store) = store("open_fails");
        let run_dir = store.create_run().unwrap();
        // a directory where the stream file should go
        std::fs::create_dir(run_dir.path().join("power.dat")).unwrap();

        let mut m = manifest();
        let specs = vec![StreamSpec::new("power.dat", vec!["power(-)".to_string()])];
        let err = prepare_run(&run_dir, &mut m, &case, specs).unwrap_err();

        assert!(matches!(err, AppError::RunFailed { .. }));
        let stored = run_dir.load_manifest().unwrap();
        assert_eq!(stored.status, RunStatus::Failed);
        assert!(stored.error.is_some());
        assert!(run_dir.path().join("input.yaml").is_file());
    }

    #[test]
    fn prepared_run_is_marked_running() {
        let (case, store) = store("open_ok");
        let run_dir = store.create_run().unwrap();
        let mut m = manifest();
        let specs = vec![StreamSpec::new("power.dat", vec!["power(-)".to_string()])];
        let streams = prepare_run(&run_dir, &mut m, &case, specs).unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(run_dir.load_manifest().unwrap().status, RunStatus::Running);
    }
}
