//! Mid-level IR core for the Graphite JIT compiler.
//!
//! This crate owns the stages between front-end graph construction and
//! back-end code emission:
//!
//! - Node graph with typed stamps and conservative memory-location markers
//! - Escape-analysis-driven virtualization of monitor acquisitions
//! - Lowering of surviving mid-level nodes to platform-level operations
//! - The installed-code / safepoint-deoptimization runtime protocol
//!
//! Front-end translation, register allocation, machine-code emission, and
//! the reference interpreter are external collaborators.
#![deny(unsafe_op_in_unsafe_fn)]

pub mod ir;
pub mod lower;
pub mod opt;
pub mod runtime;
