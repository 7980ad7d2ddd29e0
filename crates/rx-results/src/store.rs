//! Run directory storage API.

use crate::types::RunManifest;
use crate::{ResultsError, ResultsResult};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const INPUT_COPY_FILE: &str = "input.yaml";

/// Root folder holding one timestamped directory per run.
#[derive(Clone, Debug)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if root_dir.is_file() {
            return Err(ResultsError::InvalidPath {
                message: format!("output root {} is a file", root_dir.display()),
            });
        }
        fs::create_dir_all(&root_dir)?;
        Ok(Self { root_dir })
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Create a fresh run directory named after the current local time.
    pub fn create_run(&self) -> ResultsResult<RunDir> {
        self.create_run_at(Local::now())
    }

    /// Create a run directory for `now`; a numeric suffix is appended if a
    /// run with the same timestamp already exists.
    pub fn create_run_at(&self, now: DateTime<Local>) -> ResultsResult<RunDir> {
        let stem = now.format("%Y-%m-%d-%H-%M-%S-%3f").to_string();
        let mut name = stem.clone();
        let mut suffix = 1;
        loop {
            let path = self.root_dir.join(&name);
            match fs::create_dir(&path) {
                Ok(()) => {
                    return Ok(RunDir {
                        path,
                        timestamp: now.to_rfc3339(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    name = format!("{stem}-{suffix}");
                    suffix += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// All runs under the root that carry a readable manifest, oldest first.
    pub fn list_runs(&self) -> ResultsResult<Vec<(RunDir, RunManifest)>> {
        let mut runs = Vec::new();
        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let dir = RunDir::open(entry.path())?;
            if let Ok(manifest) = dir.load_manifest() {
                runs.push((dir, manifest));
            }
        }
        runs.sort_by(|a, b| a.0.path.cmp(&b.0.path));
        Ok(runs)
    }
}

/// One run's output directory.
#[derive(Clone, Debug)]
pub struct RunDir {
    path: PathBuf,
    timestamp: String,
}

impl RunDir {
    /// Open an existing run directory.
    pub fn open(path: PathBuf) -> ResultsResult<Self> {
        if !path.is_dir() {
            return Err(ResultsError::RunNotFound {
                path: path.display().to_string(),
            });
        }
        Ok(Self {
            path,
            timestamp: String::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creation time of a run made by this process, empty for opened runs.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Keep a verbatim copy of the case file beside the results.
    pub fn copy_input(&self, input: &Path) -> ResultsResult<PathBuf> {
        let target = self.path.join(INPUT_COPY_FILE);
        fs::copy(input, &target)?;
        Ok(target)
    }

    pub fn write_manifest(&self, manifest: &RunManifest) -> ResultsResult<()> {
        let json = serde_json::to_string_pretty(manifest)?;
        fs::write(self.path.join(MANIFEST_FILE), json)?;
        Ok(())
    }

    pub fn load_manifest(&self) -> ResultsResult<RunManifest> {
        let manifest_path = self.path.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                path: self.path.display().to_string(),
            });
        }
        let content = fs::read_to_string(manifest_path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
