//! Case loading, validation, and state layout introspection.

use std::path::Path;

use rx_project::{CaseDef, SubsystemKind};
use rx_sim::{Plant, Reactor, StateSchema};

use crate::error::{AppError, AppResult};

/// What a case will integrate and write.
#[derive(Debug, Clone)]
pub struct CaseSummary {
    pub name: String,
    pub solve: Vec<SubsystemKind>,
    pub state_len: usize,
    pub streams: Vec<String>,
}

/// One component of the global state vector.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEntry {
    pub index: usize,
    pub subsystem: SubsystemKind,
    pub label: String,
}

/// Load and validate a case from a YAML file.
pub fn load_case(path: &Path) -> AppResult<CaseDef> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::CaseFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(rx_project::from_yaml_str(&content)?)
}

/// Build the plant and its state layout without integrating.
///
/// Catches everything schema validation cannot see, such as subsystems whose
/// declared and actual state lengths disagree.
pub fn validate_case(case: &CaseDef) -> AppResult<CaseSummary> {
    let reactor = Reactor::from_case(case)?;
    let schema = StateSchema::build(&reactor)?;
    schema.pack(&reactor)?;
    Ok(CaseSummary {
        name: case.name.clone(),
        solve: reactor.active().to_vec(),
        state_len: schema.len(),
        streams: reactor.streams().into_iter().map(|s| s.file_name).collect(),
    })
}

/// Index, owning subsystem, and label of every state component.
pub fn layout(case: &CaseDef) -> AppResult<Vec<LayoutEntry>> {
    let reactor = Reactor::from_case(case)?;
    let schema = StateSchema::build(&reactor)?;
    let mut entries = Vec::with_capacity(schema.len());
    for segment in schema.segments() {
        for (k, label) in segment.labels.iter().enumerate() {
            entries.push(LayoutEntry {
                index: segment.offset + k,
                subsystem: segment.kind,
                label: label.clone(),
            });
        }
    }
    Ok(entries)
}
