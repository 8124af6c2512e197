use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::*;

use crate::strategy::{LockNode, LockStrategy};

/// Ticket lock: callers draw increasing tickets and are served in that
/// order (FIFO).
pub struct TicketLock {
    next_ticket: AtomicUsize,
    now_serving: AtomicUsize,
}

impl TicketLock {
    pub const fn new() -> Self {
        Self {
            next_ticket: AtomicUsize::new(0),
            now_serving: AtomicUsize::new(0),
        }
    }
}

impl Default for TicketLock {
    fn default() -> Self {
        Self::new()
    }
}

impl LockStrategy for TicketLock {
    unsafe fn acquire(&self, _node: &LockNode) {
        let ticket = self.next_ticket.fetch_add(1, Relaxed);
        while self.now_serving.load(Acquire) != ticket {
            std::hint::spin_loop();
        }
    }

    unsafe fn release(&self, _node: &LockNode) {
        // only the holder writes `now_serving`
        let served = self.now_serving.load(Relaxed);
        self.now_serving.store(served.wrapping_add(1), Release);
    }
}
