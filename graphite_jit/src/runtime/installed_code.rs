//! Installed compiled code and the invalidation protocol.
//!
//! An [`InstalledCode`] is the handle to one compilation's executable
//! artifact. Its state moves `Valid -> Invalidated` exactly once and never
//! back; `invalidate()` is thread-safe, idempotent, and deliberately races
//! with concurrent invocations of the same code. No lock mediates the race:
//! the running invocation observes invalidation at its next safepoint poll,
//! abandons the compiled frame, and finishes under the injected reference
//! continuation, which must be observably indistinguishable from the
//! uninterrupted compiled execution.
//!
//! The machine code itself and the reference engine are external
//! collaborators, injected as boxed callables.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use super::deopt::{DeoptReason, DeoptState, ExceptionToken};
use super::safepoint::Safepoint;

// =============================================================================
// Code State
// =============================================================================

/// Validity of installed code. Monotonic: no reverse transition exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CodeState {
    /// Installed and runnable.
    Valid = 0,
    /// Invalidated; entry is refused and running frames deoptimize at
    /// their next poll.
    Invalidated = 1,
}

// =============================================================================
// Execute Error
// =============================================================================

/// Failure surfaced by [`InstalledCode::execute_varargs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteError {
    /// The code was invalidated before entry.
    InvalidCode,
    /// An exception escaped the invocation uncaught.
    Exception(ExceptionToken),
}

impl fmt::Display for ExecuteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecuteError::InvalidCode => write!(f, "installed code was invalidated"),
            ExecuteError::Exception(token) => {
                write!(f, "uncaught exception {} escaped compiled code", token.id())
            }
        }
    }
}

impl std::error::Error for ExecuteError {}

// =============================================================================
// Injected Callables
// =============================================================================

/// How one compiled invocation ended.
#[derive(Debug, Clone)]
pub enum CompiledExit {
    /// Normal completion with a return value.
    Return(u64),
    /// An exception escaped the compiled frame.
    Throw(ExceptionToken),
    /// A poll observed invalidation; the frame snapshot follows.
    Deopt(DeoptState),
}

/// The compiled artifact: runs the invocation, polling the supplied
/// safepoint at its designated sites.
pub type CompiledEntry = dyn Fn(&Safepoint<'_>, &[u64]) -> CompiledExit + Send + Sync;

/// The reference engine fallback: resumes an abandoned frame and carries
/// it to completion with identical observable semantics.
pub type ReferenceContinuation =
    dyn Fn(DeoptState, &[u64]) -> Result<u64, ExceptionToken> + Send + Sync;

// =============================================================================
// Statistics
// =============================================================================

/// Per-code counters. All relaxed: they inform tuning, never semantics.
#[derive(Debug)]
pub struct InstalledCodeStats {
    /// Invocations entered.
    pub invocations: AtomicU64,
    /// Safepoint polls executed.
    pub safepoint_polls: AtomicU64,
    /// Frames abandoned to the reference engine.
    pub deopts: AtomicU64,
    /// Deopts caused by invalidation.
    pub invalidation_deopts: AtomicU64,
    /// Invocations that ended in an uncaught exception.
    pub exceptions: AtomicU64,
}

impl InstalledCodeStats {
    const fn new() -> Self {
        InstalledCodeStats {
            invocations: AtomicU64::new(0),
            safepoint_polls: AtomicU64::new(0),
            deopts: AtomicU64::new(0),
            invalidation_deopts: AtomicU64::new(0),
            exceptions: AtomicU64::new(0),
        }
    }

    fn record_deopt(&self, reason: DeoptReason) {
        self.deopts.fetch_add(1, Ordering::Relaxed);
        if reason == DeoptReason::Invalidated {
            self.invalidation_deopts.fetch_add(1, Ordering::Relaxed);
        }
    }
}

// =============================================================================
// Installed Code
// =============================================================================

/// Handle to one compilation's installed artifact.
pub struct InstalledCode {
    name: String,
    state: AtomicU32,
    entry: Box<CompiledEntry>,
    reference: Box<ReferenceContinuation>,
    stats: InstalledCodeStats,
}

impl InstalledCode {
    /// Install a compiled entry with its reference fallback.
    pub fn new(
        name: impl Into<String>,
        entry: Box<CompiledEntry>,
        reference: Box<ReferenceContinuation>,
    ) -> Self {
        InstalledCode {
            name: name.into(),
            state: AtomicU32::new(CodeState::Valid as u32),
            entry,
            reference,
            stats: InstalledCodeStats::new(),
        }
    }

    /// The compiled method's name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current validity.
    #[inline]
    pub fn state(&self) -> CodeState {
        if self.state.load(Ordering::Acquire) == CodeState::Valid as u32 {
            CodeState::Valid
        } else {
            CodeState::Invalidated
        }
    }

    /// Whether the code is still runnable.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.state() == CodeState::Valid
    }

    /// Per-code counters.
    #[inline]
    pub fn stats(&self) -> &InstalledCodeStats {
        &self.stats
    }

    /// Invalidate the code. Thread-safe and idempotent; may race freely
    /// with concurrent invocations.
    ///
    /// Returns whether this call performed the transition. The release
    /// store pairs with the acquire load in every poll, so any poll
    /// ordered after the transition observes it; a frame between polls
    /// keeps running until its next designated site.
    pub fn invalidate(&self) -> bool {
        self.state
            .compare_exchange(
                CodeState::Valid as u32,
                CodeState::Invalidated as u32,
                Ordering::Release,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    /// Run the compiled code with the given arguments.
    ///
    /// Entry on already-invalidated code fails with
    /// [`ExecuteError::InvalidCode`]. A deopt exit transfers the frame
    /// snapshot to the reference continuation; its result is the
    /// invocation's result. An uncaught exception propagates as
    /// [`ExecuteError::Exception`].
    pub fn execute_varargs(&self, args: &[u64]) -> Result<u64, ExecuteError> {
        if self.state.load(Ordering::Acquire) == CodeState::Invalidated as u32 {
            return Err(ExecuteError::InvalidCode);
        }
        self.stats.invocations.fetch_add(1, Ordering::Relaxed);

        let safepoint = Safepoint::new(&self.state, &self.stats.safepoint_polls);
        match (self.entry)(&safepoint, args) {
            CompiledExit::Return(value) => Ok(value),
            CompiledExit::Throw(token) => {
                self.stats.exceptions.fetch_add(1, Ordering::Relaxed);
                Err(ExecuteError::Exception(token))
            }
            CompiledExit::Deopt(state) => {
                self.stats.record_deopt(state.reason);
                (self.reference)(state, args).map_err(|token| {
                    self.stats.exceptions.fetch_add(1, Ordering::Relaxed);
                    ExecuteError::Exception(token)
                })
            }
        }
    }
}

impl fmt::Debug for InstalledCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstalledCode")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
