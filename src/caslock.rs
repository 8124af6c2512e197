use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::*;

use crate::strategy::{LockNode, LockStrategy};

/// Spin lock acquired with a compare-and-swap on a single flag.
/// Any waiter may win the next acquisition.
pub struct CasLock {
    locked: AtomicBool,
}

impl CasLock {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }
}

impl Default for CasLock {
    fn default() -> Self {
        Self::new()
    }
}

impl LockStrategy for CasLock {
    unsafe fn acquire(&self, _node: &LockNode) {
        while self
            .locked
            .compare_exchange_weak(false, true, Acquire, Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }
    }

    unsafe fn release(&self, _node: &LockNode) {
        self.locked.store(false, Release);
    }
}
