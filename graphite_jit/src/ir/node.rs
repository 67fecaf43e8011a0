//! Node kinds and role-labeled input edges.
//!
//! A node is a graph vertex with a kind tag, an ordered list of role-labeled
//! input edges, a [`Stamp`] and a [`LocationIdentity`]. Inputs are fixed at
//! construction; the only later mutations are the flag bits set when a pass
//! deletes or lowers the node.
//!
//! Per-kind metadata lives in an explicit registration table (`kinds.rs`),
//! keyed by the data-free [`NodeKindTag`] discriminant.

use bitflags::bitflags;
use smallvec::SmallVec;

use super::arena::Id;
use super::location::LocationIdentity;
use super::stamp::Stamp;

// =============================================================================
// Node ID
// =============================================================================

/// Stable identifier of a node in its graph.
pub type NodeId = Id<Node>;

// =============================================================================
// Input Edges
// =============================================================================

/// The role an input edge plays for its consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputRole {
    /// The object whose state the node observes or mutates.
    Object,
    /// The type descriptor (hub) of an object.
    Hub,
    /// The monitor identity of a lock operation.
    MonitorId,
    /// The address a memory access touches.
    Address,
    /// The value a store writes.
    StoredValue,
}

/// One role-labeled input edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Input {
    /// What this edge means to the consuming node.
    pub role: InputRole,
    /// The producing node.
    pub node: NodeId,
}

impl Input {
    /// Create an input edge.
    #[inline]
    pub const fn new(role: InputRole, node: NodeId) -> Self {
        Input { role, node }
    }
}

/// Ordered input edges, stored inline for the common small arities.
pub type InputList = SmallVec<[Input; 4]>;

// =============================================================================
// Node Flags
// =============================================================================

bitflags! {
    /// Per-node state bits mutated by passes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodeFlags: u8 {
        /// Deleted from the graph; the slot stays allocated so earlier
        /// visitors' edges remain readable until the pass completes.
        const DEAD = 1 << 0;
        /// Translated to platform-level operations.
        const LOWERED = 1 << 1;
    }
}

// =============================================================================
// Node Kinds
// =============================================================================

/// What a node computes, with per-kind payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A compile-time constant with the given raw bits.
    Constant {
        /// The constant's bit pattern.
        bits: u64,
    },
    /// An incoming function parameter.
    Parameter {
        /// Position in the parameter list.
        index: u32,
    },
    /// A memory read from a named location.
    Load,
    /// A memory write to a named location.
    Store,
    /// A cooperative poll site, conventionally placed on loop back-edges.
    Safepoint,
    /// The identity of one monitor acquisition. Materializes as the lock
    /// slot index assigned by the front end.
    MonitorId {
        /// Nesting depth of this acquisition in its frame's lock stack.
        lock_depth: u32,
    },
    /// Acquisition of an object's monitor.
    MonitorEnter,
    /// Symbolic stand-in for a provably non-escaping allocation.
    VirtualObject {
        /// Reference-identity objects can hold locks; value-like
        /// aggregates cannot.
        has_identity: bool,
    },
}

impl NodeKind {
    /// The data-free discriminant used for kind indexing.
    #[inline]
    pub const fn tag(&self) -> NodeKindTag {
        match self {
            NodeKind::Constant { .. } => NodeKindTag::Constant,
            NodeKind::Parameter { .. } => NodeKindTag::Parameter,
            NodeKind::Load => NodeKindTag::Load,
            NodeKind::Store => NodeKindTag::Store,
            NodeKind::Safepoint => NodeKindTag::Safepoint,
            NodeKind::MonitorId { .. } => NodeKindTag::MonitorId,
            NodeKind::MonitorEnter => NodeKindTag::MonitorEnter,
            NodeKind::VirtualObject { .. } => NodeKindTag::VirtualObject,
        }
    }
}

/// Data-free node kind discriminant.
///
/// Keys the graph's kind index and the handler registration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeKindTag {
    /// [`NodeKind::Constant`]
    Constant = 0,
    /// [`NodeKind::Parameter`]
    Parameter = 1,
    /// [`NodeKind::Load`]
    Load = 2,
    /// [`NodeKind::Store`]
    Store = 3,
    /// [`NodeKind::Safepoint`]
    Safepoint = 4,
    /// [`NodeKind::MonitorId`]
    MonitorId = 5,
    /// [`NodeKind::MonitorEnter`]
    MonitorEnter = 6,
    /// [`NodeKind::VirtualObject`]
    VirtualObject = 7,
}

impl NodeKindTag {
    /// Every registered kind, in tag order.
    pub const ALL: [NodeKindTag; 8] = [
        NodeKindTag::Constant,
        NodeKindTag::Parameter,
        NodeKindTag::Load,
        NodeKindTag::Store,
        NodeKindTag::Safepoint,
        NodeKindTag::MonitorId,
        NodeKindTag::MonitorEnter,
        NodeKindTag::VirtualObject,
    ];

    /// Stable name used in diagnostics.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            NodeKindTag::Constant => "constant",
            NodeKindTag::Parameter => "parameter",
            NodeKindTag::Load => "load",
            NodeKindTag::Store => "store",
            NodeKindTag::Safepoint => "safepoint",
            NodeKindTag::MonitorId => "monitor_id",
            NodeKindTag::MonitorEnter => "monitor_enter",
            NodeKindTag::VirtualObject => "virtual_object",
        }
    }
}

// =============================================================================
// Node
// =============================================================================

/// One graph vertex.
///
/// Constructed through the graph's typed constructors, which compute the
/// stamp and enforce per-kind preconditions.
#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    inputs: InputList,
    stamp: Stamp,
    location: LocationIdentity,
    flags: NodeFlags,
}

impl Node {
    /// Assemble a node. Callers are the graph's typed constructors.
    pub(crate) fn new(
        kind: NodeKind,
        inputs: InputList,
        stamp: Stamp,
        location: LocationIdentity,
    ) -> Self {
        Node {
            kind,
            inputs,
            stamp,
            location,
            flags: NodeFlags::empty(),
        }
    }

    /// The node's kind with payload.
    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The data-free kind discriminant.
    #[inline]
    pub fn tag(&self) -> NodeKindTag {
        self.kind.tag()
    }

    /// All input edges in role order.
    #[inline]
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// The first input playing the given role, if present.
    #[inline]
    pub fn input(&self, role: InputRole) -> Option<NodeId> {
        self.inputs
            .iter()
            .find(|input| input.role == role)
            .map(|input| input.node)
    }

    /// The input playing the given role. Absence is a construction defect
    /// and a fatal fault.
    #[inline]
    pub fn expect_input(&self, role: InputRole) -> NodeId {
        match self.input(role) {
            Some(id) => id,
            None => panic!("{} node has no {:?} input", self.tag().name(), role),
        }
    }

    /// The node's stamp.
    #[inline]
    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    /// Which memory the node may touch.
    #[inline]
    pub fn location(&self) -> LocationIdentity {
        self.location
    }

    /// Current flag bits.
    #[inline]
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Whether the node has been deleted.
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.flags.contains(NodeFlags::DEAD)
    }

    /// Whether the node writes memory. An aliases-everything node is
    /// treated as writing everything.
    #[inline]
    pub fn writes_memory(&self) -> bool {
        matches!(self.tag(), NodeKindTag::Store) || self.location.is_any()
    }

    pub(crate) fn set_flag(&mut self, flag: NodeFlags) {
        self.flags.insert(flag);
    }
}

// =============================================================================
// Tests
// =============================================================================
