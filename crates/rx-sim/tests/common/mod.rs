#![allow(dead_code)]

use std::cell::RefCell;

use rx_physics::{Coupling, PhysicsError, PhysicsResult, Subsystem};
use rx_project::SubsystemKind;
use rx_results::StreamSpec;
use rx_sim::{Plant, SampleSink, SimResult};

/// Linear decay block: dy_i/dt = -rate_i * y_i.
#[derive(Debug, Clone)]
pub struct Block {
    pub kind: SubsystemKind,
    pub values: Vec<f64>,
    pub rates: Vec<f64>,
    /// Length reported by `state_length`; may disagree with `values`.
    pub declared: usize,
    /// From this time on the first derivative is NaN.
    pub nan_from: Option<f64>,
}

impl Block {
    pub fn new(kind: SubsystemKind, values: Vec<f64>, rates: Vec<f64>) -> Self {
        Self {
            kind,
            declared: values.len(),
            values,
            rates,
            nan_from: None,
        }
    }

    fn rates_into(&self, t: f64, out: &mut [f64]) {
        for (i, o) in out.iter_mut().enumerate() {
            *o = -self.rates[i] * self.values[i];
        }
        if let Some(t_bad) = self.nan_from {
            if t >= t_bad && !out.is_empty() {
                out[0] = f64::NAN;
            }
        }
    }
}

impl Subsystem for Block {
    fn kind(&self) -> SubsystemKind {
        self.kind
    }

    fn state_length(&self) -> usize {
        self.declared
    }

    fn state_labels(&self) -> Vec<String> {
        (0..self.declared).map(|i| format!("{}-{i}", self.kind)).collect()
    }

    fn read_state(&self) -> Vec<f64> {
        self.values.clone()
    }

    fn write_state(&mut self, y: &[f64]) -> PhysicsResult<()> {
        if y.len() != self.values.len() {
            return Err(PhysicsError::LengthMismatch {
                what: "block",
                expected: self.values.len(),
                actual: y.len(),
            });
        }
        self.values.copy_from_slice(y);
        Ok(())
    }

    fn compute_rhs(&self, t: f64, _coupling: &Coupling<'_>, out: &mut [f64]) -> PhysicsResult<()> {
        self.rates_into(t, out);
        Ok(())
    }
}

/// Event seen by the toy plant, in call order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Call {
    Refresh(f64),
    Derivative(SubsystemKind, f64),
}

#[derive(Debug, Clone)]
pub struct ToyPlant {
    pub active: Vec<SubsystemKind>,
    pub blocks: Vec<Block>,
    pub calls: RefCell<Vec<Call>>,
}

impl ToyPlant {
    /// `blocks` must be given in canonical kind order.
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            active: blocks.iter().map(|b| b.kind).collect(),
            blocks,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn block(&self, kind: SubsystemKind) -> &Block {
        self.blocks.iter().find(|b| b.kind == kind).expect("inactive block")
    }
}

impl Plant for ToyPlant {
    fn active(&self) -> &[SubsystemKind] {
        &self.active
    }

    fn subsystem(&self, kind: SubsystemKind) -> &dyn Subsystem {
        self.block(kind)
    }

    fn subsystem_mut(&mut self, kind: SubsystemKind) -> &mut dyn Subsystem {
        self.blocks
            .iter_mut()
            .find(|b| b.kind == kind)
            .expect("inactive block")
    }

    fn refresh_boundary_conditions(&mut self, t: f64) -> SimResult<()> {
        self.calls.borrow_mut().push(Call::Refresh(t));
        Ok(())
    }

    fn compute_derivatives(&self, kind: SubsystemKind, t: f64, out: &mut [f64]) -> SimResult<()> {
        self.calls.borrow_mut().push(Call::Derivative(kind, t));
        self.block(kind).rates_into(t, out);
        Ok(())
    }

    fn streams(&self) -> Vec<StreamSpec> {
        self.blocks
            .iter()
            .map(|b| StreamSpec::new(format!("{}.dat", b.kind), b.state_labels()))
            .collect()
    }

    fn sample(&self) -> Vec<Vec<f64>> {
        self.blocks.iter().map(|b| b.values.clone()).collect()
    }
}

/// Keeps every sample in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub times: Vec<f64>,
    pub rows: Vec<Vec<Vec<f64>>>,
}

impl SampleSink for RecordingSink {
    fn write_sample(&mut self, t: f64, rows: &[Vec<f64>]) -> SimResult<()> {
        self.times.push(t);
        self.rows.push(rows.to_vec());
        Ok(())
    }
}

pub fn temp_dir(name: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("rx_sim_{name}_{nanos}"));
    std::fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}
