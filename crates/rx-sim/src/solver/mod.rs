//! Time integrators for the global state vector.
//!
//! A solver owns `(t, y)` and advances it to requested output times through
//! an [`OdeSystem`]. Every solver stops exactly on the requested time.

mod dopri5;
mod rk4;
mod sdirk2;

pub use dopri5::DormandPrince;
pub use rk4::Rk4;
pub use sdirk2::Sdirk2;

use rx_core::ensure_len;
use rx_project::{SolverDef, SolverKindDef};

use crate::error::{SimError, SimResult};
use crate::schema::StateSchema;

/// Right-hand side of `dy/dt = f(t, y)`.
pub trait OdeSystem {
    fn ndim(&self) -> usize;

    /// Evaluate `f(t, y)` into `dy`. May be called with rejected or
    /// non-monotonic trial times.
    fn rhs(&mut self, t: f64, y: &[f64], dy: &mut [f64]) -> SimResult<()>;
}

/// Counters accumulated over the life of a solver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub rhs_calls: usize,
    pub jacobians: usize,
}

pub trait OdeSolver {
    fn t(&self) -> f64;

    fn y(&self) -> &[f64];

    /// Integrate forward until `t() == target`.
    fn advance_to<S: OdeSystem>(&mut self, sys: &mut S, target: f64) -> SimResult<()>;

    fn stats(&self) -> SolverStats;
}

/// Step control settings shared by the adaptive solvers.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    /// Per-component relative tolerance.
    pub rtol: Vec<f64>,
    /// Per-component absolute tolerance.
    pub atol: Vec<f64>,
    /// First trial step; estimated from the initial slope when `None`.
    pub h0: Option<f64>,
    pub h_min: f64,
    pub h_max: f64,
    /// Step budget for a single `advance_to` call.
    pub max_steps: usize,
}

impl SolverOptions {
    /// Uniform tolerances for `n` components.
    pub fn uniform(n: usize, rtol: f64, atol: f64) -> Self {
        Self {
            rtol: vec![rtol; n],
            atol: vec![atol; n],
            h0: None,
            h_min: 1e-12,
            h_max: f64::INFINITY,
            max_steps: 100_000,
        }
    }

    pub fn from_def(def: &SolverDef, schema: &StateSchema) -> Self {
        let (rtol, atol) = schema.tolerances(def);
        Self {
            rtol,
            atol,
            h0: def.h0_s,
            h_min: def.h_min_s,
            h_max: def.h_max_s.unwrap_or(f64::INFINITY),
            max_steps: def.max_steps,
        }
    }

    fn validate(&self, n: usize) -> SimResult<()> {
        let config = |what: String| SimError::Config { what };
        ensure_len("relative tolerances", n, self.rtol.len()).map_err(|e| config(e.to_string()))?;
        ensure_len("absolute tolerances", n, self.atol.len()).map_err(|e| config(e.to_string()))?;
        if self.rtol.iter().chain(&self.atol).any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(config("tolerances must be finite and > 0".to_string()));
        }
        if !(self.h_min > 0.0) || !(self.h_max >= self.h_min) {
            return Err(config(format!(
                "step bounds must satisfy 0 < h_min <= h_max (h_min={}, h_max={})",
                self.h_min, self.h_max
            )));
        }
        if let Some(h0) = self.h0.filter(|h| !(h.is_finite() && *h > 0.0)) {
            return Err(config(format!("initial step must be finite and > 0, got {h0}")));
        }
        if self.max_steps == 0 {
            return Err(config("max_steps must be > 0".to_string()));
        }
        Ok(())
    }

    /// Weighted RMS norm of `e` with weights from `y0` and `y1`.
    fn error_norm(&self, e: &[f64], y0: &[f64], y1: &[f64]) -> f64 {
        if e.is_empty() {
            return 0.0;
        }
        let sum: f64 = e
            .iter()
            .enumerate()
            .map(|(i, ei)| {
                let sc = self.atol[i] + self.rtol[i] * y0[i].abs().max(y1[i].abs());
                (ei / sc).powi(2)
            })
            .sum();
        (sum / e.len() as f64).sqrt()
    }

    /// Starting step from the size of the state and its initial slope.
    fn initial_step(&self, y: &[f64], f0: &[f64], span: f64) -> f64 {
        let h = match self.h0 {
            Some(h0) => h0,
            None => {
                let zeros = vec![0.0; y.len()];
                let d0 = self.error_norm(y, &zeros, &zeros);
                let d1 = self.error_norm(f0, &zeros, &zeros);
                if d0 < 1e-5 || d1 < 1e-5 { 1e-6 } else { 0.01 * d0 / d1 }
            }
        };
        h.min(self.h_max).min(span).max(self.h_min)
    }
}

/// Solver selected by the case file.
#[derive(Debug, Clone)]
pub enum Solver {
    DormandPrince(DormandPrince),
    Sdirk2(Sdirk2),
    Rk4(Rk4),
}

impl Solver {
    pub fn from_def(def: &SolverDef, schema: &StateSchema, t0: f64, y0: Vec<f64>) -> SimResult<Self> {
        let opts = SolverOptions::from_def(def, schema);
        Ok(match def.kind {
            SolverKindDef::DormandPrince => Solver::DormandPrince(DormandPrince::new(t0, y0, opts)?),
            SolverKindDef::Sdirk2 => Solver::Sdirk2(Sdirk2::new(t0, y0, opts)?),
            SolverKindDef::Rk4 { dt_s } => Solver::Rk4(Rk4::new(t0, y0, dt_s, opts.max_steps)?),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Solver::DormandPrince(_) => "DormandPrince",
            Solver::Sdirk2(_) => "Sdirk2",
            Solver::Rk4(_) => "Rk4",
        }
    }
}

impl OdeSolver for Solver {
    fn t(&self) -> f64 {
        match self {
            Solver::DormandPrince(s) => s.t(),
            Solver::Sdirk2(s) => s.t(),
            Solver::Rk4(s) => s.t(),
        }
    }

    fn y(&self) -> &[f64] {
        match self {
            Solver::DormandPrince(s) => s.y(),
            Solver::Sdirk2(s) => s.y(),
            Solver::Rk4(s) => s.y(),
        }
    }

    fn advance_to<S: OdeSystem>(&mut self, sys: &mut S, target: f64) -> SimResult<()> {
        match self {
            Solver::DormandPrince(s) => s.advance_to(sys, target),
            Solver::Sdirk2(s) => s.advance_to(sys, target),
            Solver::Rk4(s) => s.advance_to(sys, target),
        }
    }

    fn stats(&self) -> SolverStats {
        match self {
            Solver::DormandPrince(s) => s.stats(),
            Solver::Sdirk2(s) => s.stats(),
            Solver::Rk4(s) => s.stats(),
        }
    }
}

/// Shared entry checks for `advance_to`.
fn check_advance<S: OdeSystem>(sys: &S, n: usize, t: f64, target: f64) -> SimResult<()> {
    if sys.ndim() != n {
        return Err(SimError::Config {
            what: format!("system has {} unknowns, solver state has {n}", sys.ndim()),
        });
    }
    if !target.is_finite() || target < t {
        return Err(SimError::Numerical {
            t,
            what: format!("cannot advance backwards or to a non-finite time ({target})"),
        });
    }
    Ok(())
}
