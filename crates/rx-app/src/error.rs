//! Error types for the rx-app service layer.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(#[from] rx_project::ProjectError),

    #[error("Failed to read case file: {path}")]
    CaseFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Simulation setup failed: {0}")]
    Setup(rx_sim::SimError),

    /// Integration stopped after the run directory was created. Rows written
    /// before the failure stay in `run_dir`.
    #[error("Run failed ({}): {source}", run_dir.display())]
    RunFailed {
        run_dir: PathBuf,
        source: rx_sim::SimError,
    },

    #[error("Results error: {0}")]
    Results(#[from] rx_results::ResultsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<rx_sim::SimError> for AppError {
    fn from(err: rx_sim::SimError) -> Self {
        AppError::Setup(err)
    }
}
