//! Layout of the global state vector.
//!
//! One [`StateSchema`] is built per run and is the only description of where
//! each subsystem's unknowns live. Packing and unpacking both walk it, so they
//! cannot disagree on order.

use std::ops::Range;

use rx_project::{SolverDef, SubsystemKind};

use crate::error::{SimError, SimResult};
use crate::plant::Plant;

/// Contiguous block of the state vector owned by one subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub kind: SubsystemKind,
    pub offset: usize,
    pub len: usize,
    pub labels: Vec<String>,
}

impl Segment {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateSchema {
    segments: Vec<Segment>,
    len: usize,
}

impl StateSchema {
    /// Lay out the active subsystems of `plant` in canonical order.
    pub fn build<P: Plant + ?Sized>(plant: &P) -> SimResult<Self> {
        let mut active = plant.active().to_vec();
        active.sort();
        active.dedup();
        if active.len() != plant.active().len() || active.as_slice() != plant.active() {
            return Err(SimError::Config {
                what: "active subsystems must be unique and in canonical order".to_string(),
            });
        }

        let mut segments = Vec::with_capacity(active.len());
        let mut offset = 0;
        for kind in active {
            let sub = plant.subsystem(kind);
            let len = sub.state_length();
            let labels = sub.state_labels();
            if labels.len() != len {
                return Err(SimError::Config {
                    what: format!(
                        "{kind} declares {len} state variables but {} labels",
                        labels.len()
                    ),
                });
            }
            segments.push(Segment {
                kind,
                offset,
                len,
                labels,
            });
            offset += len;
        }
        Ok(Self {
            segments,
            len: offset,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn range(&self, kind: SubsystemKind) -> Option<Range<usize>> {
        self.segments.iter().find(|s| s.kind == kind).map(Segment::range)
    }

    /// Label of every component, in state order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .flat_map(|s| s.labels.iter().map(String::as_str))
    }

    /// Read every active subsystem into a fresh state vector.
    ///
    /// Each subsystem must return exactly the number of values it declared
    /// when the schema was built.
    pub fn pack<P: Plant + ?Sized>(&self, plant: &P) -> SimResult<Vec<f64>> {
        let mut y = Vec::with_capacity(self.len);
        for segment in &self.segments {
            let values = plant.subsystem(segment.kind).read_state();
            if values.len() != segment.len {
                return Err(SimError::Config {
                    what: format!(
                        "{} declares {} state variables but reads {}",
                        segment.kind,
                        segment.len,
                        values.len()
                    ),
                });
            }
            y.extend_from_slice(&values);
        }
        Ok(y)
    }

    /// Overwrite every active subsystem from `y`.
    pub fn unpack<P: Plant + ?Sized>(&self, plant: &mut P, y: &[f64]) -> SimResult<()> {
        if y.len() != self.len {
            return Err(SimError::Config {
                what: format!("state vector has {} entries, schema expects {}", y.len(), self.len),
            });
        }
        for segment in &self.segments {
            plant
                .subsystem_mut(segment.kind)
                .write_state(&y[segment.range()])?;
        }
        Ok(())
    }

    /// Per-component (rtol, atol), applying per-subsystem overrides.
    pub fn tolerances(&self, def: &SolverDef) -> (Vec<f64>, Vec<f64>) {
        let mut rtol = Vec::with_capacity(self.len);
        let mut atol = Vec::with_capacity(self.len);
        for segment in &self.segments {
            let group = def.groups.iter().find(|g| g.group == segment.kind);
            let r = group.and_then(|g| g.rtol).unwrap_or(def.rtol);
            let a = group.and_then(|g| g.atol).unwrap_or(def.atol);
            rtol.extend(std::iter::repeat_n(r, segment.len));
            atol.extend(std::iter::repeat_n(a, segment.len));
        }
        (rtol, atol)
    }
}
