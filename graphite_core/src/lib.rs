//! # Graphite Core
//!
//! Foundational primitives shared across all Graphite compiler components.
//!
//! This crate provides the raw machine-word value system used to implement
//! runtime internals:
//!
//! - **Word Values**: Typed 64-bit raw quantities (signed, unsigned, pointer)
//!   distinct from managed references
//! - **Word Factory**: The configure-once boxing capability that turns
//!   integer literals into typed words, with canonical operation tags so the
//!   optimizer can treat factory calls as foldable intrinsics

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod word;

pub use word::{
    BoxFactory, FactoryOp, FactoryOpcode, PointerBase, PointerWord, RawBoxer, SignedBase,
    SignedWord, UnsignedBase, UnsignedWord, WordBase, WordFactory, WordRuntime,
};

/// Graphite runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
