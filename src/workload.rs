use std::hint::black_box;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::Relaxed;

use derive_more::Display;

pub const DEFAULT_BUSY_ITERATIONS: u64 = 100_000;

/// Fixed-cost computation run by every worker while it holds the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workload {
    busy_iterations: u64,
}

impl Workload {
    pub const fn new(busy_iterations: u64) -> Self {
        Self { busy_iterations }
    }

    /// Sums `0..busy_iterations`. `black_box` keeps the loop from being
    /// folded into a constant, so the cost is paid on every call.
    pub fn run(&self) -> u64 {
        let mut sum = 0u64;
        for i in 0..black_box(self.busy_iterations) {
            sum = black_box(sum.wrapping_add(i));
        }
        sum
    }
}

impl Default for Workload {
    fn default() -> Self {
        Self::new(DEFAULT_BUSY_ITERATIONS)
    }
}

/// The two counters bumped inside the critical section, A on entry and B on
/// exit.
///
/// Increments are a plain load followed by a store, never a fetch-add: if two
/// workers ever share the critical section the updates race and the final
/// counts come out wrong. Relaxed ordering is enough because the lock itself
/// orders the critical sections.
#[derive(Debug, Default)]
pub struct SharedCounters {
    a: AtomicUsize,
    b: AtomicUsize,
    overlaps: AtomicUsize,
}

impl SharedCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.a.store(0, Relaxed);
        self.b.store(0, Relaxed);
        self.overlaps.store(0, Relaxed);
    }

    /// First increment, right after acquiring.
    pub fn enter(&self) {
        let a = self.a.load(Relaxed);
        self.a.store(a + 1, Relaxed);
    }

    /// Second increment, right before releasing. Under mutual exclusion A is
    /// exactly one ahead of B here; anything else means another worker got in.
    pub fn exit(&self) {
        let a = self.a.load(Relaxed);
        let b = self.b.load(Relaxed);
        if a != b + 1 {
            self.overlaps.fetch_add(1, Relaxed);
        }
        self.b.store(b + 1, Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            a: self.a.load(Relaxed),
            b: self.b.load(Relaxed),
            overlaps: self.overlaps.load(Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub a: usize,
    pub b: usize,
    pub overlaps: usize,
}

impl CounterSnapshot {
    /// Checks A == `thread_count` and A == B, and that no critical sections
    /// overlapped.
    pub fn verify(&self, thread_count: usize) -> Result<(), Violation> {
        if self.a != thread_count {
            return Err(Violation::LostUpdate {
                expected: thread_count,
            });
        }
        if self.a != self.b {
            return Err(Violation::Mismatch);
        }
        if self.overlaps > 0 {
            return Err(Violation::Overlap {
                count: self.overlaps,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// A did not reach the thread count.
    #[display("counter A does not match {expected} workers")]
    LostUpdate { expected: usize },
    /// A and B disagree.
    #[display("counters A and B differ")]
    Mismatch,
    /// Workers found another worker inside the critical section.
    #[display("{count} critical sections overlapped")]
    Overlap { count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workload_sum() {
        assert_eq!(Workload::new(0).run(), 0);
        assert_eq!(Workload::new(1).run(), 0);
        assert_eq!(Workload::new(10).run(), 45);
        assert_eq!(Workload::default().run(), 100_000 * 99_999 / 2);
    }

    #[test]
    fn test_sequential_sections_verify() {
        let counters = SharedCounters::new();
        for _ in 0..6 {
            counters.enter();
            counters.exit();
        }
        let snapshot = counters.snapshot();
        assert_eq!(snapshot, CounterSnapshot { a: 6, b: 6, overlaps: 0 });
        assert_eq!(snapshot.verify(6), Ok(()));
        assert_eq!(
            snapshot.verify(7),
            Err(Violation::LostUpdate { expected: 7 })
        );
    }

    #[test]
    fn test_reset() {
        let counters = SharedCounters::new();
        counters.enter();
        counters.enter();
        counters.exit();
        counters.reset();
        assert_eq!(counters.snapshot(), CounterSnapshot { a: 0, b: 0, overlaps: 0 });
    }

    #[test]
    fn test_interleaved_sections_are_overlaps() {
        let counters = SharedCounters::new();
        // two workers inside at once
        counters.enter();
        counters.enter();
        counters.exit();
        counters.exit();
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.a, 2);
        assert_eq!(snapshot.b, 2);
        assert_eq!(snapshot.overlaps, 1);
        assert_eq!(snapshot.verify(2), Err(Violation::Overlap { count: 1 }));
    }

    #[test]
    fn test_mismatch() {
        let snapshot = CounterSnapshot { a: 3, b: 2, overlaps: 0 };
        assert_eq!(snapshot.verify(3), Err(Violation::Mismatch));
    }

    #[test]
    fn test_violation_messages() {
        assert_eq!(
            Violation::LostUpdate { expected: 4 }.to_string(),
            "counter A does not match 4 workers"
        );
        assert_eq!(Violation::Mismatch.to_string(), "counters A and B differ");
        assert_eq!(
            Violation::Overlap { count: 2 }.to_string(),
            "2 critical sections overlapped"
        );
    }
}
