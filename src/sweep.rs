use log::{info, warn};
use minitrace::{collector::SpanContext, Span};

use crate::{
    config::BenchConfig,
    error::{BenchError, Result},
    sink::{ResultRow, ResultSink},
    strategy::{LockStrategy, LockVariant},
    trial::{TrialResult, TrialRunner},
    workload::Workload,
};

/// Elapsed times of the trials at one sweep point. No trial is discarded.
#[derive(Debug, Default, Clone)]
pub struct TrialStats {
    elapsed_ms: Vec<f64>,
}

impl TrialStats {
    pub fn with_capacity(trials: usize) -> Self {
        Self {
            elapsed_ms: Vec::with_capacity(trials),
        }
    }

    pub fn push(&mut self, result: &TrialResult) {
        self.elapsed_ms.push(result.elapsed_ms());
    }

    pub fn push_ms(&mut self, elapsed_ms: f64) {
        self.elapsed_ms.push(elapsed_ms);
    }

    pub fn len(&self) -> usize {
        self.elapsed_ms.len()
    }

    /// Arithmetic mean, every trial weighted equally. `None` without trials.
    pub fn mean_ms(&self) -> Option<f64> {
        if self.elapsed_ms.is_empty() {
            return None;
        }
        Some(self.elapsed_ms.iter().sum::<f64>() / self.elapsed_ms.len() as f64)
    }
}

/// All sweep points of one lock variant, with its lock bound once.
pub struct Sweep {
    variant: LockVariant,
    strategy: Box<dyn LockStrategy>,
}

impl Sweep {
    pub fn new(variant: LockVariant) -> Self {
        Self::with_strategy(variant, variant.strategy())
    }

    /// Binds a caller-supplied lock, reported under `variant`.
    pub fn with_strategy(variant: LockVariant, strategy: Box<dyn LockStrategy>) -> Self {
        Self { variant, strategy }
    }

    pub fn variant(&self) -> LockVariant {
        self.variant
    }

    /// Runs `trials` trials at every thread count, in the given order, and
    /// records one row per thread count as soon as it completes.
    ///
    /// Stops at the first failed trial; rows already recorded stay in the sink.
    /// Zero trials is a configuration error, since no mean could be reported.
    pub fn run(
        &self,
        runner: &mut TrialRunner,
        thread_counts: &[usize],
        trials: usize,
        sink: &mut dyn ResultSink,
    ) -> Result<Vec<ResultRow>> {
        if trials == 0 {
            return Err(BenchError::Config("trials must be at least 1".into()));
        }

        let root = Span::root("sweep", SpanContext::random())
            .with_property(|| ("variant", self.variant.to_string()));
        let _guard = root.set_local_parent();

        let mut rows = Vec::with_capacity(thread_counts.len());
        for &thread_count in thread_counts {
            let mut stats = TrialStats::with_capacity(trials);
            for trial in 0..trials {
                let result =
                    runner.run_trial(self.variant, &*self.strategy, thread_count, trial)?;
                stats.push(&result);
            }
            let mean_time_ms = stats.mean_ms().unwrap_or_default();

            let row = ResultRow {
                variant: self.variant,
                thread_count,
                mean_time_ms,
            };
            info!(
                "Average time with {} threads using {} lock: {:.6} ms",
                thread_count, self.variant, mean_time_ms
            );
            sink.record(&row)?;
            rows.push(row);
        }
        Ok(rows)
    }
}

/// Rows produced by a complete run, in production order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub rows: Vec<ResultRow>,
}

/// Sweeps every configured variant in order with one shared runner.
pub struct Harness {
    config: BenchConfig,
    runner: TrialRunner,
}

impl Harness {
    pub fn new(config: BenchConfig) -> Result<Self> {
        config.validate()?;
        let runner = TrialRunner::new(config.max_threads, Workload::new(config.busy_iterations))?;
        Ok(Self { config, runner })
    }

    /// Runs every sweep. The first failure ends the whole run.
    pub fn run(&mut self, sink: &mut dyn ResultSink) -> Result<RunSummary> {
        self.warn_oversubscription();

        let mut summary = RunSummary::default();
        for &variant in &self.config.variants {
            info!(
                "Sweeping {} lock over {:?} threads, {} trials each",
                variant, self.config.thread_counts, self.config.trials
            );
            let rows = Sweep::new(variant).run(
                &mut self.runner,
                &self.config.thread_counts,
                self.config.trials,
                sink,
            )?;
            summary.rows.extend(rows);
        }
        sink.finish()?;
        Ok(summary)
    }

    fn warn_oversubscription(&self) {
        let Some(cores) = core_affinity::get_core_ids().map(|ids| ids.len()) else {
            return;
        };
        for &thread_count in &self.config.thread_counts {
            if thread_count > cores {
                warn!(
                    "{} threads exceed the {} available cores; spinning waiters will compete with the lock holder",
                    thread_count, cores
                );
            }
        }
    }
}
