//! Mid-level optimization passes.
//!
//! - **Escape** (`escape.rs`): escape states and the read-only alias map
//!   produced by upstream escape analysis
//! - **Virtualize** (`virtualize.rs`): rewrites lock acquisitions over
//!   provably non-escaping objects into symbolic virtual locks

pub mod escape;
pub mod virtualize;

pub use escape::{AliasMap, EscapeState};
pub use virtualize::{
    VirtualizePass, VirtualizeResult, VirtualizeStats, VirtualizedLocks, VirtualizerTool,
};
