//! Piecewise-linear lookup tables.

use crate::error::{ControlError, ControlResult};

/// Piecewise-linear table over strictly increasing abscissae.
///
/// Outside the table range the end values are held.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl LookupTable {
    pub fn new(points: &[[f64; 2]]) -> ControlResult<Self> {
        if points.is_empty() {
            return Err(ControlError::InvalidArg {
                what: "lookup table needs at least one point",
            });
        }
        if points.windows(2).any(|w| w[1][0] <= w[0][0]) {
            return Err(ControlError::InvalidArg {
                what: "lookup table x values must be strictly increasing",
            });
        }
        Ok(Self {
            x: points.iter().map(|p| p[0]).collect(),
            y: points.iter().map(|p| p[1]).collect(),
        })
    }

    pub fn eval(&self, x: f64) -> f64 {
        let n = self.x.len();
        if x <= self.x[0] {
            return self.y[0];
        }
        if x >= self.x[n - 1] {
            return self.y[n - 1];
        }
        // First abscissa strictly greater than x; in 1..n by the checks above.
        let hi = self.x.partition_point(|&xi| xi <= x);
        let lo = hi - 1;
        let w = (x - self.x[lo]) / (self.x[hi] - self.x[lo]);
        self.y[lo] + w * (self.y[hi] - self.y[lo])
    }
}
