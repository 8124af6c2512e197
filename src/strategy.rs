use std::{
    ptr,
    str::FromStr,
    sync::atomic::{AtomicBool, AtomicPtr},
};

use derive_more::Display;

use crate::{
    caslock::CasLock, error::BenchError, mcslock::McsLock, ticketlock::TicketLock,
    ttaslock::TtasLock,
};

/// Acquire/release contract the harness drives.
///
/// Implementations guarantee that at most one caller sits between `acquire`
/// and `release` at any time, and that every caller eventually acquires.
/// Waiting is a spin, never a park.
pub trait LockStrategy: Send + Sync {
    /// Spins until the caller owns the lock.
    ///
    /// # Safety
    ///
    /// `node` must not be used by any other thread until the matching
    /// [`release`](LockStrategy::release) returns, and must stay alive until then.
    unsafe fn acquire(&self, node: &LockNode);

    /// Hands the lock to the next waiter.
    ///
    /// # Safety
    ///
    /// The calling thread must own the lock through an `acquire` made with the
    /// same `node`.
    unsafe fn release(&self, node: &LockNode);
}

impl<'s> dyn LockStrategy + 's {
    /// Runs `f` inside the acquire/release window. The lock is released even
    /// if `f` unwinds.
    pub fn with_lock<R>(&self, node: &LockNode, f: impl FnOnce() -> R) -> R {
        let _held = Held::acquire(self, node);
        f()
    }
}

struct Held<'a, S: LockStrategy + ?Sized> {
    strategy: &'a S,
    node: &'a LockNode,
}

impl<'a, S: LockStrategy + ?Sized> Held<'a, S> {
    fn acquire(strategy: &'a S, node: &'a LockNode) -> Self {
        // The node is borrowed for the whole lifetime of `Held`, which is also
        // where the matching release happens.
        unsafe { strategy.acquire(node) };
        Self { strategy, node }
    }
}

impl<S: LockStrategy + ?Sized> Drop for Held<'_, S> {
    fn drop(&mut self) {
        unsafe { self.strategy.release(self.node) }
    }
}

/// Per-thread queue node.
///
/// Only the MCS lock reads it; the other variants accept and ignore it.
/// Aligned to a cache line so neighbouring slots of the node array never
/// share one.
#[repr(align(64))]
#[derive(Debug)]
pub struct LockNode {
    pub(crate) next: AtomicPtr<LockNode>,
    pub(crate) locked: AtomicBool,
}

impl LockNode {
    pub const fn new() -> Self {
        Self {
            next: AtomicPtr::new(ptr::null_mut()),
            locked: AtomicBool::new(false),
        }
    }
}

impl Default for LockNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Which lock algorithm a sweep exercises. The display form is the name
/// written to the result rows.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockVariant {
    #[display("MCS")]
    Mcs,
    #[display("CAS")]
    Cas,
    #[display("Ticket")]
    Ticket,
    #[display("TTAS")]
    Ttas,
}

impl LockVariant {
    pub const ALL: [LockVariant; 4] = [
        LockVariant::Mcs,
        LockVariant::Cas,
        LockVariant::Ticket,
        LockVariant::Ttas,
    ];

    /// Builds a fresh, unlocked instance of this variant's lock.
    pub fn strategy(self) -> Box<dyn LockStrategy> {
        match self {
            LockVariant::Mcs => Box::new(McsLock::new()),
            LockVariant::Cas => Box::new(CasLock::new()),
            LockVariant::Ticket => Box::new(TicketLock::new()),
            LockVariant::Ttas => Box::new(TtasLock::new()),
        }
    }
}

impl FromStr for LockVariant {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        LockVariant::ALL
            .into_iter()
            .find(|variant| variant.to_string().eq_ignore_ascii_case(name))
            .ok_or_else(|| BenchError::Config(format!("unknown lock variant `{name}`")))
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use std::sync::atomic::{AtomicUsize, Ordering::*};

    use super::{LockNode, LockStrategy};

    /// Broken lock: callers are let in two at a time, released together.
    /// Only usable with an even number of callers.
    pub struct PairwiseLock {
        arrived: AtomicUsize,
    }

    impl PairwiseLock {
        pub fn new() -> Self {
            Self {
                arrived: AtomicUsize::new(0),
            }
        }
    }

    impl LockStrategy for PairwiseLock {
        unsafe fn acquire(&self, _node: &LockNode) {
            let ticket = self.arrived.fetch_add(1, AcqRel);
            let pair_complete = ticket - ticket % 2 + 2;
            while self.arrived.load(Acquire) < pair_complete {
                std::hint::spin_loop();
            }
        }

        unsafe fn release(&self, _node: &LockNode) {}
    }
}
