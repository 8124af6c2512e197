use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::*;

use crate::strategy::{LockNode, LockStrategy};

/// Test-and-test-and-set spin lock.
///
/// Waiters poll with plain loads, which stay in their own cache, and only
/// attempt the swap once the flag looks clear. No ordering between waiters.
pub struct TtasLock {
    locked: AtomicBool,
}

impl TtasLock {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }
}

impl Default for TtasLock {
    fn default() -> Self {
        Self::new()
    }
}

impl LockStrategy for TtasLock {
    unsafe fn acquire(&self, _node: &LockNode) {
        loop {
            while self.locked.load(Relaxed) {
                std::hint::spin_loop();
            }
            if !self.locked.swap(true, Acquire) {
                return;
            }
        }
    }

    unsafe fn release(&self, _node: &LockNode) {
        self.locked.store(false, Release);
    }
}
