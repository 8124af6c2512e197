use std::{
    thread,
    time::{Duration, Instant},
};

use log::{debug, error};
use minitrace::local::LocalSpan;

use crate::{
    error::{BenchError, Result},
    strategy::{LockNode, LockStrategy, LockVariant},
    workload::{SharedCounters, Workload},
};

/// Hard ceiling on workers per trial. The node array is sized from the
/// configured maximum, which may not exceed this.
pub const MAX_SUPPORTED_THREADS: usize = 1000;

/// Outcome of one spawn-run-join episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialResult {
    pub variant: LockVariant,
    pub thread_count: usize,
    pub trial: usize,
    pub elapsed: Duration,
}

impl TrialResult {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Runs trials. Owns everything the workers share besides the lock: the
/// per-thread node array, allocated once, and the counters, reset per trial.
pub struct TrialRunner {
    nodes: Box<[LockNode]>,
    counters: SharedCounters,
    workload: Workload,
}

impl TrialRunner {
    pub fn new(max_threads: usize, workload: Workload) -> Result<Self> {
        if max_threads == 0 || max_threads > MAX_SUPPORTED_THREADS {
            return Err(BenchError::ThreadCountOutOfRange {
                thread_count: max_threads,
                max: MAX_SUPPORTED_THREADS,
            });
        }
        let nodes = (0..max_threads).map(|_| LockNode::new()).collect();
        Ok(Self {
            nodes,
            counters: SharedCounters::new(),
            workload,
        })
    }

    pub fn max_threads(&self) -> usize {
        self.nodes.len()
    }

    pub fn counters(&self) -> &SharedCounters {
        &self.counters
    }

    /// One trial: reset counters, spawn `thread_count` workers that each take
    /// the lock exactly once, join them all, then check the counters.
    ///
    /// Thread creation and join are inside the timed interval. A worker that
    /// never returns hangs this call.
    pub fn run_trial(
        &mut self,
        variant: LockVariant,
        strategy: &dyn LockStrategy,
        thread_count: usize,
        trial: usize,
    ) -> Result<TrialResult> {
        if thread_count == 0 || thread_count > self.nodes.len() {
            return Err(BenchError::ThreadCountOutOfRange {
                thread_count,
                max: self.nodes.len(),
            });
        }

        let _span = LocalSpan::enter_with_local_parent("trial").with_properties(|| {
            [
                ("variant", variant.to_string()),
                ("thread_count", thread_count.to_string()),
                ("trial", trial.to_string()),
            ]
        });

        self.counters.reset();
        let counters = &self.counters;
        let workload = &self.workload;
        let nodes = &self.nodes[..thread_count];

        let start = Instant::now();
        let outcome = thread::scope(|s| {
            let mut handles = Vec::with_capacity(thread_count);
            let mut spawn_error = None;
            for (index, node) in nodes.iter().enumerate() {
                let spawned = thread::Builder::new()
                    .name(format!("spinbench-worker-{index}"))
                    .spawn_scoped(s, move || {
                        strategy.with_lock(node, || {
                            counters.enter();
                            std::hint::black_box(workload.run());
                            counters.exit();
                        });
                    });
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(source) => {
                        spawn_error = Some(source);
                        break;
                    }
                }
            }

            // Workers already started are joined before any error is reported.
            let mut panicked = false;
            for handle in handles {
                panicked |= handle.join().is_err();
            }

            if let Some(source) = spawn_error {
                return Err(BenchError::ThreadCreation {
                    variant,
                    thread_count,
                    trial,
                    source,
                });
            }
            if panicked {
                return Err(BenchError::WorkerPanicked {
                    variant,
                    thread_count,
                    trial,
                });
            }
            Ok(())
        });
        let elapsed = start.elapsed();
        outcome?;

        let snapshot = self.counters.snapshot();
        if let Err(violation) = snapshot.verify(thread_count) {
            error!(
                "Trial {} of {} lock with {} threads failed: {} (A = {}, B = {})",
                trial, variant, thread_count, violation, snapshot.a, snapshot.b
            );
            return Err(BenchError::CorrectnessViolation {
                variant,
                thread_count,
                trial,
                violation,
                a: snapshot.a,
                b: snapshot.b,
            });
        }

        debug!(
            "Trial {} of {} lock with {} threads finished in {:?}",
            trial, variant, thread_count, elapsed
        );
        Ok(TrialResult {
            variant,
            thread_count,
            trial,
            elapsed,
        })
    }
}
