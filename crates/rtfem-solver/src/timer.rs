//! Timing instrumentation for the iterative solver.
//!
//! Purely observational: the recorded durations never influence control
//! flow. Callers read them to find which stage dominates an iteration.

use std::time::{Duration, Instant};

/// Wall-clock breakdown of one solver iteration by pipeline stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationTiming {
    /// Force reassembly from per-element data.
    pub reassembly: Duration,
    /// Right-hand-side and effective-matrix construction.
    pub rhs: Duration,
    /// Boundary-condition elimination.
    pub boundary: Duration,
    /// Linear solve.
    pub solve: Duration,
    /// State integration.
    pub integration: Duration,
}

impl IterationTiming {
    /// Total wall-clock time across all stages.
    pub fn total(&self) -> Duration {
        self.reassembly + self.rhs + self.boundary + self.solve + self.integration
    }
}

/// Accumulates per-stage wall-clock time across solver iterations.
#[derive(Debug, Clone, Default)]
pub struct SolverTimer {
    last: IterationTiming,
    accumulated: IterationTiming,
    iterations: usize,
}

impl SolverTimer {
    /// Create a timer with no recorded iterations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the breakdown of a completed iteration.
    pub(crate) fn record(&mut self, timing: IterationTiming) {
        self.accumulated.reassembly += timing.reassembly;
        self.accumulated.rhs += timing.rhs;
        self.accumulated.boundary += timing.boundary;
        self.accumulated.solve += timing.solve;
        self.accumulated.integration += timing.integration;
        self.last = timing;
        self.iterations += 1;
    }

    /// Breakdown of the most recent iteration.
    pub fn last_iteration(&self) -> &IterationTiming {
        &self.last
    }

    /// Per-stage totals over all recorded iterations.
    pub fn accumulated(&self) -> &IterationTiming {
        &self.accumulated
    }

    /// Number of recorded iterations.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Mean wall-clock time of one iteration.
    pub fn average_iteration(&self) -> Duration {
        if self.iterations == 0 {
            return Duration::ZERO;
        }
        self.accumulated.total() / self.iterations as u32
    }
}

/// Stopwatch marking stage boundaries within one iteration.
pub(crate) struct StageClock {
    mark: Instant,
}

impl StageClock {
    pub fn start() -> Self {
        Self {
            mark: Instant::now(),
        }
    }

    /// Time since the previous lap (or start), resetting the mark.
    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now - self.mark;
        self.mark = now;
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn records_and_accumulates() {
        let mut timer = SolverTimer::new();
        assert_eq!(timer.iterations(), 0);
        assert_eq!(timer.average_iteration(), Duration::ZERO);

        timer.record(IterationTiming {
            reassembly: millis(1),
            rhs: millis(2),
            boundary: millis(1),
            solve: millis(5),
            integration: millis(1),
        });
        timer.record(IterationTiming {
            solve: millis(3),
            ..Default::default()
        });

        assert_eq!(timer.iterations(), 2);
        assert_eq!(timer.accumulated().solve, millis(8));
        assert_eq!(timer.accumulated().reassembly, millis(1));
        assert_eq!(timer.last_iteration().solve, millis(3));
        assert_eq!(timer.last_iteration().rhs, Duration::ZERO);
    }

    #[test]
    fn iteration_total_sums_stages() {
        let timing = IterationTiming {
            reassembly: millis(1),
            rhs: millis(2),
            boundary: millis(3),
            solve: millis(4),
            integration: millis(5),
        };
        assert_eq!(timing.total(), millis(15));
    }

    #[test]
    fn stage_clock_laps_are_monotone() {
        let mut clock = StageClock::start();
        let first = clock.lap();
        let second = clock.lap();
        // Durations are non-negative by construction; just ensure the
        // clock keeps advancing without panicking.
        assert!(first >= Duration::ZERO);
        assert!(second >= Duration::ZERO);
    }
}
