use std::ptr;
use std::sync::atomic::AtomicPtr;
use std::sync::atomic::Ordering::*;

use crate::strategy::{LockNode, LockStrategy};

/// Mellor-Crummey and Scott queue lock.
///
/// Each waiter links its own [`LockNode`] behind the current tail and spins
/// on that node's flag only, so handoff touches one cache line per waiter.
/// Acquisition order is request order.
pub struct McsLock {
    tail: AtomicPtr<LockNode>,
}

impl McsLock {
    pub const fn new() -> Self {
        Self {
            tail: AtomicPtr::new(ptr::null_mut()),
        }
    }
}

impl Default for McsLock {
    fn default() -> Self {
        Self::new()
    }
}

impl LockStrategy for McsLock {
    unsafe fn acquire(&self, node: &LockNode) {
        node.next.store(ptr::null_mut(), Relaxed);
        node.locked.store(true, Relaxed);

        let me = node as *const LockNode as *mut LockNode;
        let prev = self.tail.swap(me, AcqRel);
        if prev.is_null() {
            return;
        }

        // Safety: `prev` stays alive until its owner sees us as successor.
        unsafe { (*prev).next.store(me, Release) };
        while node.locked.load(Acquire) {
            std::hint::spin_loop();
        }
    }

    unsafe fn release(&self, node: &LockNode) {
        let me = node as *const LockNode as *mut LockNode;
        let mut next = node.next.load(Acquire);
        if next.is_null() {
            if self
                .tail
                .compare_exchange(me, ptr::null_mut(), Release, Relaxed)
                .is_ok()
            {
                return;
            }
            // A successor swapped the tail but has not linked itself yet.
            loop {
                next = node.next.load(Acquire);
                if !next.is_null() {
                    break;
                }
                std::hint::spin_loop();
            }
        }
        // Safety: the successor spins on its node until this store.
        unsafe { (*next).locked.store(false, Release) };
    }
}
