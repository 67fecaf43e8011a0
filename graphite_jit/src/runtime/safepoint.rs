//! Cooperative safepoint polling.
//!
//! Compiled code checks for invalidation only at designated poll sites,
//! conventionally loop back-edges; there is no preemption anywhere else.
//! A poll is one atomic load. Invalidation published with release ordering
//! is visible to every poll ordered after it; nothing is guaranteed about
//! timeliness before the next poll.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use super::installed_code::CodeState;

// =============================================================================
// Poll Result
// =============================================================================

/// What a poll observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResult {
    /// The code is still valid; keep executing.
    Continue,
    /// The code was invalidated; abandon the compiled frame.
    Deoptimize,
}

impl PollResult {
    /// Whether the compiled frame must be abandoned.
    #[inline]
    pub const fn should_deoptimize(self) -> bool {
        matches!(self, PollResult::Deoptimize)
    }
}

// =============================================================================
// Safepoint
// =============================================================================

/// The poll handle handed to a compiled entry for the duration of one
/// invocation.
///
/// Borrows the installed code's state word; polling never blocks and never
/// takes a lock.
pub struct Safepoint<'a> {
    state: &'a AtomicU32,
    polls: &'a AtomicU64,
}

impl<'a> Safepoint<'a> {
    pub(crate) fn new(state: &'a AtomicU32, polls: &'a AtomicU64) -> Self {
        Safepoint { state, polls }
    }

    /// Check validity at a designated poll site.
    #[inline]
    pub fn poll(&self) -> PollResult {
        self.polls.fetch_add(1, Ordering::Relaxed);
        if self.state.load(Ordering::Acquire) == CodeState::Invalidated as u32 {
            PollResult::Deoptimize
        } else {
            PollResult::Continue
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_observes_state() {
        let state = AtomicU32::new(CodeState::Valid as u32);
        let polls = AtomicU64::new(0);
        let sp = Safepoint::new(&state, &polls);

        assert_eq!(sp.poll(), PollResult::Continue);
        assert!(!sp.poll().should_deoptimize());

        state.store(CodeState::Invalidated as u32, Ordering::Release);
        assert_eq!(sp.poll(), PollResult::Deoptimize);
        assert_eq!(polls.load(Ordering::Relaxed), 3);
    }
}
