//! The installed-code / safepoint-deoptimization runtime protocol.
//!
//! - **Installed code** (`installed_code.rs`): the compiled artifact
//!   handle, its monotonic validity state, and the entry surface
//! - **Safepoint** (`safepoint.rs`): lock-free cooperative polling at
//!   designated sites
//! - **Deopt** (`deopt.rs`): frame snapshots carrying resume state and
//!   in-flight exceptions across the compiled/reference boundary
//! - **Latch** (`latch.rs`): blocking countdown gate for cross-thread
//!   orchestration
//!
//! The designed race: one thread executes installed code while another
//! invalidates it. The protocol is polling-based; no lock is ever taken
//! between `invalidate()` and a running invocation.

pub mod deopt;
pub mod installed_code;
pub mod latch;
pub mod safepoint;

pub use deopt::{DeoptReason, DeoptState, ExceptionToken};
pub use installed_code::{
    CodeState, CompiledEntry, CompiledExit, ExecuteError, InstalledCode, InstalledCodeStats,
    ReferenceContinuation,
};
pub use latch::Latch;
pub use safepoint::{PollResult, Safepoint};
