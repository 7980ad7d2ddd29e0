//! rx-core: stable foundation for the reactor transient workspace.
//!
//! Contains:
//! - numeric (Real + finiteness, range and length checks + time slack)
//! - error (shared error types)

pub mod error;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use error::{RxError, RxResult};
pub use numeric::*;
