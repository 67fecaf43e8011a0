//! One-shot countdown gate for cross-thread orchestration.
//!
//! Blocking, not spinning: waiters park on a condvar until the count
//! reaches zero. Used to sequence a thread that must act only after
//! another thread has reached a known point, e.g. invalidating installed
//! code once its invocation has entered a loop. Safepoint polls themselves
//! stay lock-free; the latch only orders the surrounding threads.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

// =============================================================================
// Latch
// =============================================================================

/// A countdown latch. Counts down to zero exactly once and stays open.
pub struct Latch {
    remaining: Mutex<usize>,
    zeroed: Condvar,
}

impl Latch {
    /// Create a latch that opens after `count` countdowns.
    pub fn new(count: usize) -> Self {
        Latch {
            remaining: Mutex::new(count),
            zeroed: Condvar::new(),
        }
    }

    /// Count down once. Opening the latch wakes every waiter; further
    /// countdowns are no-ops.
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        if *remaining > 0 {
            *remaining -= 1;
            if *remaining == 0 {
                self.zeroed.notify_all();
            }
        }
    }

    /// Block until the latch opens.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            self.zeroed.wait(&mut remaining);
        }
    }

    /// Block until the latch opens or the timeout elapses. Returns whether
    /// the latch opened.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            if self.zeroed.wait_for(&mut remaining, timeout).timed_out() {
                return *remaining == 0;
            }
        }
        true
    }
}

// =============================================================================
// Tests
// =============================================================================
