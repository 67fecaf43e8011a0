//! Deoptimization state capture.
//!
//! When a poll observes invalidation, the compiled frame is abandoned and
//! execution resumes under the reference engine. The [`DeoptState`] built
//! at the poll site carries everything the reference continuation needs to
//! be observably transparent: the resume point, the live slot values, and
//! any exception that was in flight at the instant of the check, so that
//! throw/catch control flow already committed by compiled code replays
//! exactly.

use smallvec::SmallVec;

// =============================================================================
// Exception Token
// =============================================================================

/// Opaque identity of a language-level exception object.
///
/// The core never inspects exception payloads; it only carries the token
/// across the compiled/reference boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExceptionToken(u32);

impl ExceptionToken {
    /// Wrap a runtime exception identity.
    #[inline]
    pub const fn new(id: u32) -> Self {
        ExceptionToken(id)
    }

    /// The raw identity.
    #[inline]
    pub const fn id(self) -> u32 {
        self.0
    }
}

// =============================================================================
// Deopt Reason
// =============================================================================

/// Why a compiled frame was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeoptReason {
    /// A poll observed that the installed code was invalidated.
    Invalidated,
    /// A speculation guard in the compiled code failed.
    GuardFailed,
}

// =============================================================================
// Deopt State
// =============================================================================

/// Inline capacity for live slots; small frames stay allocation-free.
const INLINE_SLOTS: usize = 8;

/// Snapshot of one compiled frame at its abandonment point.
#[derive(Debug, Clone)]
pub struct DeoptState {
    /// Why the frame was abandoned.
    pub reason: DeoptReason,
    /// Bytecode offset the reference engine resumes at.
    pub resume_offset: u32,
    /// The exception in flight at the poll, if the frame was mid
    /// throw/catch dispatch. The reference engine re-dispatches it before
    /// executing anything else.
    pub pending_exception: Option<ExceptionToken>,
    /// Live slot values at the resume point, in slot order.
    pub slots: SmallVec<[u64; INLINE_SLOTS]>,
}

impl DeoptState {
    /// Snapshot a frame with no pending exception and no live slots.
    pub fn new(reason: DeoptReason, resume_offset: u32) -> Self {
        DeoptState {
            reason,
            resume_offset,
            pending_exception: None,
            slots: SmallVec::new(),
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
    fn test_state_carries_in_flight_exception() {
        let mut state = DeoptState::new(DeoptReason::Invalidated, 12);
        state.pending_exception = Some(ExceptionToken::new(7));
        state.slots.push(41);

        assert_eq!(state.resume_offset, 12);
        assert_eq!(state.pending_exception.map(ExceptionToken::id), Some(7));
        assert_eq!(&state.slots[..], &[41]);
    }
}
