//! Microbenchmark harness comparing spin locks under contention.
//!
//! For every lock variant and every configured thread count, a fresh set of
//! OS threads each takes the lock exactly once, runs a fixed busy loop inside
//! it, and the wall time of the whole spawn-to-join episode is averaged over
//! repeated trials. Two counters bumped inside the critical section are
//! checked after every trial; a wrong count aborts the run.

mod caslock;
mod config;
mod error;
mod mcslock;
mod sink;
mod strategy;
mod sweep;
mod ticketlock;
mod trial;
mod ttaslock;
mod workload;

pub use caslock::CasLock;
pub use config::BenchConfig;
pub use error::{BenchError, Result};
pub use mcslock::McsLock;
pub use sink::{CsvSink, ResultRow, ResultSink, HEADER};
pub use strategy::{LockNode, LockStrategy, LockVariant};
pub use sweep::{Harness, RunSummary, Sweep, TrialStats};
pub use ticketlock::TicketLock;
pub use trial::{TrialResult, TrialRunner, MAX_SUPPORTED_THREADS};
pub use ttaslock::TtasLock;
pub use workload::{CounterSnapshot, SharedCounters, Violation, Workload};
