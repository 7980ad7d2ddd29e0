//! Shared application service layer for the reactor transient tools.
//!
//! The CLI goes through this crate for everything that touches the
//! filesystem: loading and checking cases, executing runs into the run store,
//! and reading finished runs back.

pub mod error;
pub mod project_service;
pub mod run_service;

pub use error::{AppError, AppResult};
pub use project_service::{CaseSummary, LayoutEntry, layout, load_case, validate_case};
pub use run_service::{RunRequest, RunResponse, list_runs, load_run, run_case};
