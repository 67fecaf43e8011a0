//! The mid-level node graph.
//!
//! # Core Components
//!
//! - **Arena** (`arena.rs`): stable-index node storage
//! - **Stamp** (`stamp.rs`): declared type, nullability, constant-ness
//! - **Location** (`location.rs`): conservative memory-location identities
//! - **Node** (`node.rs`): node kinds and role-labeled input edges
//! - **Graph** (`graph.rs`): node ownership, kind indexing, typed constructors
//! - **Schedule** (`schedule.rs`): memory-ordering legality checks
//! - **Kinds** (`kinds.rs`): per-kind semantic handler registration
//!
//! # Design Principles
//!
//! - Stable indices instead of pointers: deletion marks a slot dead and
//!   retires it from the kind index, so edges held by earlier visitors in
//!   the same pass stay valid until the pass completes
//! - Every node kind is enumerable through the kind index; passes never
//!   scan the full graph for the kinds they rewrite

pub mod arena;
pub mod graph;
pub mod kinds;
pub mod location;
pub mod node;
pub mod schedule;
pub mod stamp;

pub use arena::{Arena, Id};
pub use graph::{Graph, GraphPhase};
pub use kinds::{kind_handlers, KindHandlers};
pub use location::LocationIdentity;
pub use node::{Input, InputList, InputRole, Node, NodeFlags, NodeId, NodeKind, NodeKindTag};
pub use schedule::{is_legal_schedule, may_reorder};
pub use stamp::{Nullability, Stamp, ValueKind};
