//! rx-results: run directories, time-series streams and run manifests.

pub mod format;
pub mod hash;
pub mod store;
pub mod streams;
pub mod table;
pub mod types;

pub use format::{format_header, format_row, format_value};
pub use hash::input_digest;
pub use store::{RunDir, RunStore};
pub use streams::{StreamSet, StreamSpec};
pub use table::{Table, read_table};
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {path}")]
    RunNotFound { path: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    #[error("Stream '{file}' expects {expected} values per row, got {actual}")]
    RowLength {
        file: String,
        expected: usize,
        actual: usize,
    },

    #[error("Malformed table '{file}' at line {line}: {what}")]
    Format {
        file: String,
        line: usize,
        what: String,
    },
}
