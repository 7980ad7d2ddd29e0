//! Classical RK4 with a fixed maximum step.

use rx_core::first_non_finite;

use super::{OdeSolver, OdeSystem, SolverStats, check_advance};
use crate::error::{SimError, SimResult};

/// Each `advance_to` interval is split into equal steps no longer than `dt`.
#[derive(Debug, Clone)]
pub struct Rk4 {
    t: f64,
    y: Vec<f64>,
    dt: f64,
    max_steps: usize,
    stats: SolverStats,
}

impl Rk4 {
    pub fn new(t0: f64, y0: Vec<f64>, dt: f64, max_steps: usize) -> SimResult<Self> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::Config {
                what: format!("dt must be finite and > 0, got {dt}"),
            });
        }
        if let Some(i) = first_non_finite(&y0) {
            return Err(SimError::Config {
                what: format!("initial state component {i} is not finite"),
            });
        }
        Ok(Self {
            t: t0,
            y: y0,
            dt,
            max_steps,
            stats: SolverStats::default(),
        })
    }

    fn step<S: OdeSystem>(&mut self, sys: &mut S, h: f64, t_end: f64) -> SimResult<()> {
        let n = self.y.len();
        let t = self.t;
        let y = &self.y;
        let mut k1 = vec![0.0; n];
        let mut k2 = vec![0.0; n];
        let mut k3 = vec![0.0; n];
        let mut k4 = vec![0.0; n];
        let mut tmp = vec![0.0; n];

        sys.rhs(t, y, &mut k1)?;

        for i in 0..n {
            tmp[i] = y[i] + 0.5 * h * k1[i];
        }
        sys.rhs(t + 0.5 * h, &tmp, &mut k2)?;

        for i in 0..n {
            tmp[i] = y[i] + 0.5 * h * k2[i];
        }
        sys.rhs(t + 0.5 * h, &tmp, &mut k3)?;

        for i in 0..n {
            tmp[i] = y[i] + h * k3[i];
        }
        sys.rhs(t_end, &tmp, &mut k4)?;

        // y_new = y + (h/6) * (k1 + 2*k2 + 2*k3 + k4)
        for i in 0..n {
            self.y[i] += h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
        }
        self.t = t_end;
        self.stats.rhs_calls += 4;
        self.stats.accepted_steps += 1;
        Ok(())
    }
}

impl OdeSolver for Rk4 {
    fn t(&self) -> f64 {
        self.t
    }

    fn y(&self) -> &[f64] {
        &self.y
    }

    fn stats(&self) -> SolverStats {
        self.stats
    }

    fn advance_to<S: OdeSystem>(&mut self, sys: &mut S, target: f64) -> SimResult<()> {
        check_advance(sys, self.y.len(), self.t, target)?;
        let span = target - self.t;
        if span == 0.0 {
            return Ok(());
        }
        let steps = (span / self.dt * (1.0 - 1e-12)).ceil().max(1.0) as usize;
        if steps > self.max_steps {
            return Err(SimError::Numerical {
                t: self.t,
                what: format!("{steps} steps of at most {:e} s exceed the budget of {}", self.dt, self.max_steps),
            });
        }
        let t_start = self.t;
        let h = span / steps as f64;
        for k in 1..=steps {
            let t_end = if k == steps { target } else { t_start + h * k as f64 };
            self.step(sys, t_end - self.t, t_end)?;
        }
        Ok(())
    }
}
