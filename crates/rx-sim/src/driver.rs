//! Integration driver: walks the time segments and samples the plant.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rx_core::time_slack;
use rx_project::SegmentDef;
use rx_results::{StreamSet, format_value};
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::{SimError, SimResult};
use crate::plant::Plant;
use crate::schema::StateSchema;
use crate::solver::{OdeSolver, Solver, SolverStats};

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    Failed,
}

/// Destination of sampled rows.
pub trait SampleSink {
    fn write_sample(&mut self, t: f64, rows: &[Vec<f64>]) -> SimResult<()>;
}

impl SampleSink for StreamSet {
    fn write_sample(&mut self, t: f64, rows: &[Vec<f64>]) -> SimResult<()> {
        StreamSet::write_sample(self, t, rows)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub state: RunState,
    pub samples: usize,
    pub t_final: f64,
    pub stats: SolverStats,
}

pub struct Driver<'p, P: Plant> {
    dispatcher: Dispatcher<'p, P>,
    solver: Solver,
    state: RunState,
    samples: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'p, P: Plant> Driver<'p, P> {
    /// The solver must have been started from `schema.pack(plant)`.
    pub fn new(plant: &'p mut P, schema: &'p StateSchema, solver: Solver) -> Self {
        Self {
            dispatcher: Dispatcher::new(plant, schema),
            solver,
            state: RunState::NotStarted,
            samples: 0,
            cancel: None,
        }
    }

    /// Stop between samples once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Time of the last accepted solver state.
    pub fn t(&self) -> f64 {
        self.solver.t()
    }

    pub fn stats(&self) -> SolverStats {
        self.solver.stats()
    }

    pub fn plant(&self) -> &P {
        self.dispatcher.plant()
    }

    /// Integrate through every segment, writing one sample per output time.
    ///
    /// The initial state is not sampled. Segments are checked before anything
    /// is integrated; a bad segment leaves the run in [`RunState::NotStarted`].
    /// Any later error moves the run to [`RunState::Failed`]; rows already
    /// handed to `sink` are left as they are.
    pub fn run<K: SampleSink>(&mut self, segments: &[SegmentDef], sink: &mut K) -> SimResult<RunSummary> {
        if self.state != RunState::NotStarted {
            return Err(SimError::Config {
                what: format!("run already {:?}", self.state),
            });
        }
        check_segments(self.solver.t(), segments)?;
        self.state = RunState::Running;
        match self.run_segments(segments, sink) {
            Ok(()) => {
                self.state = RunState::Completed;
                let summary = self.summary();
                info!(
                    samples = summary.samples,
                    accepted = summary.stats.accepted_steps,
                    rejected = summary.stats.rejected_steps,
                    rhs_calls = summary.stats.rhs_calls,
                    "run completed"
                );
                Ok(summary)
            }
            Err(e) => {
                self.state = RunState::Failed;
                warn!(t = self.solver.t(), samples = self.samples, error = %e, "run failed");
                Err(e)
            }
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            state: self.state,
            samples: self.samples,
            t_final: self.solver.t(),
            stats: self.solver.stats(),
        }
    }

    fn run_segments<K: SampleSink>(&mut self, segments: &[SegmentDef], sink: &mut K) -> SimResult<()> {
        let t0 = self.solver.t();
        let y0 = self.solver.y().to_vec();
        self.dispatcher.sync(t0, &y0)?;

        let mut seg_start = t0;
        for segment in segments {
            let end = segment.end_s;
            let dt = segment.output_interval_s;
            let slack = time_slack(end);
            let mut k = 1u64;
            while self.solver.t() < end - slack {
                if self.cancel.as_ref().is_some_and(|c| c.load(Ordering::Relaxed)) {
                    return Err(SimError::Cancelled { t: self.solver.t() });
                }
                let mut target = seg_start + k as f64 * dt;
                if target > end - slack {
                    target = end;
                }
                k += 1;
                if target <= self.solver.t() {
                    continue;
                }

                self.solver.advance_to(&mut self.dispatcher, target)?;
                let t = self.solver.t();
                let y = self.solver.y().to_vec();
                self.dispatcher.sync(t, &y)?;
                sink.write_sample(t, &self.dispatcher.plant().sample())?;
                self.samples += 1;
                info!("time: {}", format_value(t));
            }
            seg_start = end;
        }
        Ok(())
    }
}

/// Every segment must end after the previous one (the first after `t0`) and
/// sample at a finite positive interval.
fn check_segments(t0: f64, segments: &[SegmentDef]) -> SimResult<()> {
    if segments.is_empty() {
        return Err(SimError::Config {
            what: "no time segments".to_string(),
        });
    }
    let mut start = t0;
    for (i, segment) in segments.iter().enumerate() {
        let end = segment.end_s;
        let dt = segment.output_interval_s;
        if !end.is_finite() || end <= start || !dt.is_finite() || dt <= 0.0 {
            return Err(SimError::Config {
                what: format!("segment {i} ending at {end} with interval {dt} does not advance from {start}"),
            });
        }
        start = end;
    }
    Ok(())
}
