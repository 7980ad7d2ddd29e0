//! Dormand–Prince 5(4) explicit pair with adaptive step size.

use rx_core::{first_non_finite, time_slack};

use super::{OdeSolver, OdeSystem, SolverOptions, SolverStats, check_advance};
use crate::error::{SimError, SimResult};

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// 5th-order weights, used to advance.
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// 5th minus embedded 4th order.
const E1: f64 = B1 - 5179.0 / 57600.0;
const E3: f64 = B3 - 7571.0 / 16695.0;
const E4: f64 = B4 - 393.0 / 640.0;
const E5: f64 = B5 - -92097.0 / 339200.0;
const E6: f64 = B6 - 187.0 / 2100.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct DormandPrince {
    t: f64,
    y: Vec<f64>,
    opts: SolverOptions,
    /// Proposed size of the next step.
    h: Option<f64>,
    /// Derivative at `(t, y)`, carried over between steps (first same as last).
    f: Option<Vec<f64>>,
    stats: SolverStats,
}

impl DormandPrince {
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
            stats: SolverStats::default(),
        })
    }

    fn step_factor(err: f64) -> f64 {
        if err == 0.0 {
            MAX_FACTOR
        } else if err.is_finite() {
            (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
        } else {
            MIN_FACTOR
        }
    }
}

impl OdeSolver for DormandPrince {
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
        let n = self.y.len();
        check_advance(sys, n, self.t, target)?;
        if target == self.t {
            return Ok(());
        }
        let slack = time_slack(target);

        let mut k1 = match self.f.take() {
            Some(f) => f,
            None => {
                let mut f = vec![0.0; n];
                sys.rhs(self.t, &self.y, &mut f)?;
                self.stats.rhs_calls += 1;
                f
            }
        };
        let mut h_prop = match self.h {
            Some(h) => h,
            None => self.opts.initial_step(&self.y, &k1, target - self.t),
        };

        let mut k2 = vec![0.0; n];
        let mut k3 = vec![0.0; n];
        let mut k4 = vec![0.0; n];
        let mut k5 = vec![0.0; n];
        let mut k6 = vec![0.0; n];
        let mut k7 = vec![0.0; n];
        let mut y_tmp = vec![0.0; n];
        let mut y_new = vec![0.0; n];
        let mut err = vec![0.0; n];

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
            let t = self.t;
            let y = &self.y;

            for i in 0..n {
                y_tmp[i] = y[i] + h * A21 * k1[i];
            }
            sys.rhs(t + h / 5.0, &y_tmp, &mut k2)?;

            for i in 0..n {
                y_tmp[i] = y[i] + h * (A31 * k1[i] + A32 * k2[i]);
            }
            sys.rhs(t + 3.0 * h / 10.0, &y_tmp, &mut k3)?;

            for i in 0..n {
                y_tmp[i] = y[i] + h * (A41 * k1[i] + A42 * k2[i] + A43 * k3[i]);
            }
            sys.rhs(t + 4.0 * h / 5.0, &y_tmp, &mut k4)?;

            for i in 0..n {
                y_tmp[i] = y[i] + h * (A51 * k1[i] + A52 * k2[i] + A53 * k3[i] + A54 * k4[i]);
            }
            sys.rhs(t + 8.0 * h / 9.0, &y_tmp, &mut k5)?;

            for i in 0..n {
                y_tmp[i] =
                    y[i] + h * (A61 * k1[i] + A62 * k2[i] + A63 * k3[i] + A64 * k4[i] + A65 * k5[i]);
            }
            sys.rhs(t + h, &y_tmp, &mut k6)?;

            for i in 0..n {
                y_new[i] = y[i] + h * (B1 * k1[i] + B3 * k3[i] + B4 * k4[i] + B5 * k5[i] + B6 * k6[i]);
            }
            let t_new = if last { target } else { t + h };
            sys.rhs(t_new, &y_new, &mut k7)?;
            self.stats.rhs_calls += 6;

            for i in 0..n {
                err[i] = h * (E1 * k1[i] + E3 * k3[i] + E4 * k4[i] + E5 * k5[i] + E6 * k6[i] + E7 * k7[i]);
            }
            let err_norm = self.opts.error_norm(&err, y, &y_new);
            let factor = Self::step_factor(err_norm);

            if err_norm <= 1.0 {
                self.t = t_new;
                std::mem::swap(&mut self.y, &mut y_new);
                std::mem::swap(&mut k1, &mut k7);
                self.stats.accepted_steps += 1;
                // A step shortened to hit the target says little about the next one.
                h_prop = if last { h_prop.max(h * factor) } else { h * factor };
            } else {
                self.stats.rejected_steps += 1;
                if h <= self.opts.h_min {
                    return Err(SimError::Numerical {
                        t,
                        what: format!("step size {h:e} at minimum and error norm {err_norm:e} still too large"),
                    });
                }
                h_prop = h * factor;
            }
            h_prop = h_prop.clamp(self.opts.h_min, self.opts.h_max);
        }

        self.f = Some(k1);
        self.h = Some(h_prop);
        Ok(())
    }
}
