use std::{io, path::PathBuf};

use thiserror::Error;

use crate::{strategy::LockVariant, workload::Violation};

pub type Result<T> = std::result::Result<T, BenchError>;

/// Every way a benchmark run can fail. None of them are retried.
#[derive(Error, Debug)]
pub enum BenchError {
    /// The output record could not be created.
    #[error("failed to open result sink {}: {source}", .path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn worker for {variant} with {thread_count} threads (trial {trial}): {source}")]
    ThreadCreation {
        variant: LockVariant,
        thread_count: usize,
        trial: usize,
        #[source]
        source: io::Error,
    },

    /// The A == n == B invariant failed after a trial.
    #[error("correctness violation in {variant} lock with {thread_count} threads (trial {trial}): {violation} (A = {a}, B = {b})")]
    CorrectnessViolation {
        variant: LockVariant,
        thread_count: usize,
        trial: usize,
        violation: Violation,
        a: usize,
        b: usize,
    },

    #[error("worker panicked in {variant} lock with {thread_count} threads (trial {trial})")]
    WorkerPanicked {
        variant: LockVariant,
        thread_count: usize,
        trial: usize,
    },

    #[error("thread count {thread_count} outside supported range 1..={max}")]
    ThreadCountOutOfRange { thread_count: usize, max: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to write result row: {0}")]
    Sink(#[from] io::Error),
}
