//! The right-hand side handed to the ODE solver.
//!
//! Every evaluation runs in two phases. [`Dispatcher::refresh_boundary_conditions`]
//! unpacks nothing by itself; it evaluates the control layer and returns a
//! [`DerivativePhase`], which is the only way to reach
//! [`DerivativePhase::compute_derivatives`]. Derivatives therefore always see
//! boundary values computed for the same trial point.

use rx_core::first_non_finite;

use crate::error::{SimError, SimResult};
use crate::plant::Plant;
use crate::schema::StateSchema;
use crate::solver::OdeSystem;

/// Exclusive borrow of the plant for the duration of a run.
pub struct Dispatcher<'p, P: Plant> {
    plant: &'p mut P,
    schema: &'p StateSchema,
}

impl<'p, P: Plant> Dispatcher<'p, P> {
    pub fn new(plant: &'p mut P, schema: &'p StateSchema) -> Self {
        Self { plant, schema }
    }

    pub fn plant(&self) -> &P {
        &*self.plant
    }

    pub fn schema(&self) -> &StateSchema {
        self.schema
    }

    /// Phase one: evaluate control at `t` against the current subsystem state.
    pub fn refresh_boundary_conditions(&mut self, t: f64) -> SimResult<DerivativePhase<'_, P>> {
        self.plant.refresh_boundary_conditions(t)?;
        Ok(DerivativePhase {
            plant: &*self.plant,
            schema: self.schema,
            t,
        })
    }

    /// Make `y` the subsystems' current state and refresh boundary values, so
    /// that the plant reads consistently between solver calls.
    pub fn sync(&mut self, t: f64, y: &[f64]) -> SimResult<()> {
        self.schema.unpack(&mut *self.plant, y)?;
        self.plant.refresh_boundary_conditions(t)
    }
}

/// Boundary values are current for `t`; derivatives may be computed.
pub struct DerivativePhase<'d, P: Plant> {
    plant: &'d P,
    schema: &'d StateSchema,
    t: f64,
}

impl<P: Plant> DerivativePhase<'_, P> {
    pub fn t(&self) -> f64 {
        self.t
    }

    /// Phase two: every active subsystem writes its block of `dy`, in schema
    /// order.
    pub fn compute_derivatives(self, dy: &mut [f64]) -> SimResult<()> {
        if dy.len() != self.schema.len() {
            return Err(SimError::Config {
                what: format!(
                    "derivative buffer has {} entries, schema expects {}",
                    dy.len(),
                    self.schema.len()
                ),
            });
        }
        for segment in self.schema.segments() {
            let out = &mut dy[segment.range()];
            self.plant.compute_derivatives(segment.kind, self.t, out)?;
            if let Some(i) = first_non_finite(out) {
                return Err(SimError::Domain {
                    subsystem: segment.kind.to_string(),
                    t: self.t,
                    what: format!("non-finite derivative of {}: {}", segment.labels[i], out[i]),
                });
            }
        }
        Ok(())
    }
}

impl<P: Plant> OdeSystem for Dispatcher<'_, P> {
    fn ndim(&self) -> usize {
        self.schema.len()
    }

    fn rhs(&mut self, t: f64, y: &[f64], dy: &mut [f64]) -> SimResult<()> {
        self.schema.unpack(&mut *self.plant, y)?;
        self.refresh_boundary_conditions(t)?.compute_derivatives(dy)
    }
}
