//! Two-stage L-stable SDIRK for stiff plants.
//!
//! Tableau, with γ = 1 - 1/√2:
//!
//! ```text
//!  γ | γ      0
//!  1 | 1 - γ  γ
//! ---+-----------
//!    | 1 - γ  γ    (order 2, stiffly accurate)
//!    | 1      0    (order 1, error estimate)
//! ```
//!
//! Stage equations are solved by simplified Newton iteration with a
//! finite-difference Jacobian taken once per accepted point and an LU factor
//! of `I - hγJ` per step attempt.

use nalgebra::{DMatrix, DVector, Dyn, LU};
use rx_core::{first_non_finite, time_slack};
use tracing::debug;

use super::{OdeSolver, OdeSystem, SolverOptions, SolverStats, check_advance};
use crate::error::{SimError, SimResult};

const GAMMA: f64 = 1.0 - std::f64::consts::FRAC_1_SQRT_2;
const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;
/// Shrink applied after a failed Newton solve.
const NEWTON_FAIL_FACTOR: f64 = 0.25;
const MAX_NEWTON_ITERS: usize = 10;
/// Newton stops once the weighted update norm falls below this.
const NEWTON_TOL: f64 = 1e-2;

#[derive(Debug, Clone)]
pub struct Sdirk2 {
    t: f64,
    y: Vec<f64>,
    opts: SolverOptions,
    h: Option<f64>,
    /// Derivative and Jacobian at `(t, y)`, dropped whenever the state moves.
    f: Option<Vec<f64>>,
    jac: Option<DMatrix<f64>>,
    stats: SolverStats,
}

/// Outcome of one attempted step.
enum Attempt {
    Accepted { y_new: Vec<f64>, err_norm: f64 },
    Rejected { err_norm: f64 },
    NewtonFailed,
}

impl Sdirk2 {
    pub fn new(t0: f64, y0: Vec<f64>, opts: SolverOptions) -> SimResult<Self> {
        opts.validate(y0.len())?;
        if let Some(i) = first_non_finite(&y0) {
            return Err(SimError::Config {
                what: format!("initial state component {i} is not finite"),
            });
        }
        Ok(Self {
            t: t0,
            y: y0,
            opts,
            h: None,
            f: None,
            jac: None,
            stats: SolverStats::default(),
        })
    }

    fn derivative<S: OdeSystem>(&mut self, sys: &mut S) -> SimResult<Vec<f64>> {
        if let Some(f) = &self.f {
            return Ok(f.clone());
        }
        let mut f = vec![0.0; self.y.len()];
        sys.rhs(self.t, &self.y, &mut f)?;
        self.stats.rhs_calls += 1;
        self.f = Some(f.clone());
        Ok(f)
    }

    /// Forward-difference Jacobian at `(t, y)`.
    fn jacobian<S: OdeSystem>(&mut self, sys: &mut S, f0: &[f64]) -> SimResult<DMatrix<f64>> {
        if let Some(jac) = &self.jac {
            return Ok(jac.clone());
        }
        let n = self.y.len();
        let mut jac = DMatrix::zeros(n, n);
        let mut yp = self.y.clone();
        let mut fp = vec![0.0; n];
        for j in 0..n {
            let orig = yp[j];
            let delta = f64::EPSILON.sqrt() * orig.abs().max(self.opts.atol[j] / self.opts.rtol[j]).max(1e-8);
            yp[j] = orig + delta;
            sys.rhs(self.t, &yp, &mut fp)?;
            yp[j] = orig;
            for i in 0..n {
                jac[(i, j)] = (fp[i] - f0[i]) / delta;
            }
        }
        self.stats.rhs_calls += n;
        self.stats.jacobians += 1;
        self.jac = Some(jac.clone());
        Ok(jac)
    }

    /// Solve `Y = base + hγ f(tc, Y)` starting from `guess`.
    ///
    /// Returns `None` when the iteration does not converge.
    #[allow(clippy::too_many_arguments)]
    fn solve_stage<S: OdeSystem>(
        sys: &mut S,
        opts: &SolverOptions,
        stats: &mut SolverStats,
        lu: &LU<f64, Dyn, Dyn>,
        tc: f64,
        hg: f64,
        base: &[f64],
        guess: Vec<f64>,
    ) -> SimResult<Option<Vec<f64>>> {
        let n = base.len();
        let mut stage = guess;
        let mut f = vec![0.0; n];
        let mut residual = DVector::zeros(n);
        let mut previous = f64::INFINITY;
        for _ in 0..MAX_NEWTON_ITERS {
            sys.rhs(tc, &stage, &mut f)?;
            stats.rhs_calls += 1;
            for i in 0..n {
                residual[i] = -(stage[i] - base[i] - hg * f[i]);
            }
            let Some(delta) = lu.solve(&residual) else {
                return Ok(None);
            };
            for i in 0..n {
                stage[i] += delta[i];
            }
            if first_non_finite(&stage).is_some() {
                return Ok(None);
            }
            let norm = opts.error_norm(delta.as_slice(), &stage, base);
            if norm <= NEWTON_TOL {
                return Ok(Some(stage));
            }
            if norm > 2.0 * previous {
                return Ok(None);
            }
            previous = norm;
        }
        Ok(None)
    }

    fn attempt<S: OdeSystem>(
        &mut self,
        sys: &mut S,
        f0: &[f64],
        jac: &DMatrix<f64>,
        h: f64,
    ) -> SimResult<Attempt> {
        let n = self.y.len();
        let hg = h * GAMMA;
        let iteration = DMatrix::<f64>::identity(n, n) - jac * hg;
        let lu = iteration.lu();

        let guess: Vec<f64> = self.y.iter().zip(f0).map(|(y, f)| y + hg * f).collect();
        let Some(y1) =
            Self::solve_stage(sys, &self.opts, &mut self.stats, &lu, self.t + hg, hg, &self.y, guess)?
        else {
            return Ok(Attempt::NewtonFailed);
        };
        let k1: Vec<f64> = y1.iter().zip(&self.y).map(|(s, b)| (s - b) / hg).collect();

        let base2: Vec<f64> = self
            .y
            .iter()
            .zip(&k1)
            .map(|(y, k)| y + h * (1.0 - GAMMA) * k)
            .collect();
        let guess2: Vec<f64> = base2.iter().zip(&k1).map(|(b, k)| b + hg * k).collect();
        let Some(y2) =
            Self::solve_stage(sys, &self.opts, &mut self.stats, &lu, self.t + h, hg, &base2, guess2)?
        else {
            return Ok(Attempt::NewtonFailed);
        };

        let err: Vec<f64> = (0..n)
            .map(|i| {
                let k2 = (y2[i] - base2[i]) / hg;
                hg * (k2 - k1[i])
            })
            .collect();
        let err_norm = self.opts.error_norm(&err, &self.y, &y2);
        if err_norm <= 1.0 {
            Ok(Attempt::Accepted { y_new: y2, err_norm })
        } else {
            Ok(Attempt::Rejected { err_norm })
        }
    }

    fn step_factor(err: f64) -> f64 {
        if err == 0.0 {
            MAX_FACTOR
        } else if err.is_finite() {
            (SAFETY * err.powf(-0.5)).clamp(MIN_FACTOR, MAX_FACTOR)
        } else {
            MIN_FACTOR
        }
    }
}

impl OdeSolver for Sdirk2 {
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
        if target == self.t {
            return Ok(());
        }
        let slack = time_slack(target);
        let mut h_prop = match self.h {
            Some(h) => h,
            None => {
                let f0 = self.derivative(sys)?;
                self.opts.initial_step(&self.y, &f0, target - self.t)
            }
        };

        let mut steps = 0;
        while self.t < target {
            if steps == self.opts.max_steps {
                return Err(SimError::Numerical {
                    t: self.t,
                    what: format!("step budget of {} exhausted before t = {target:e}", self.opts.max_steps),
                });
            }
            steps += 1;

            let remaining = target - self.t;
            let last = h_prop >= remaining - slack;
            let h = if last { remaining } else { h_prop };

            let f0 = self.derivative(sys)?;
            let jac = self.jacobian(sys, &f0)?;
            match self.attempt(sys, &f0, &jac, h)? {
                Attempt::Accepted { y_new, err_norm } => {
                    self.t = if last { target } else { self.t + h };
                    self.y = y_new;
                    self.f = None;
                    self.jac = None;
                    self.stats.accepted_steps += 1;
                    let grown = h * Self::step_factor(err_norm);
                    h_prop = if last { h_prop.max(grown) } else { grown };
                }
                Attempt::Rejected { err_norm } => {
                    self.stats.rejected_steps += 1;
                    if h <= self.opts.h_min {
                        return Err(SimError::Numerical {
                            t: self.t,
                            what: format!("step size {h:e} at minimum and error norm {err_norm:e} still too large"),
                        });
                    }
                    h_prop = h * Self::step_factor(err_norm);
                }
                Attempt::NewtonFailed => {
                    self.stats.rejected_steps += 1;
                    debug!(t = self.t, h, "stage iteration failed, shrinking step");
                    if h <= self.opts.h_min {
                        return Err(SimError::Numerical {
                            t: self.t,
                            what: format!("stage iteration does not converge at minimum step {h:e}"),
                        });
                    }
                    h_prop = h * NEWTON_FAIL_FACTOR;
                }
            }
            h_prop = h_prop.clamp(self.opts.h_min, self.opts.h_max);
        }
        self.h = Some(h_prop);
        Ok(())
    }
}
