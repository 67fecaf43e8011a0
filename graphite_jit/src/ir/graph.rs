//! Node ownership, kind indexing, and typed constructors.
//!
//! The graph owns all nodes of one compilation in an arena and keeps an
//! index from kind tag to node ids so passes can enumerate the kinds they
//! rewrite without scanning the full graph.
//!
//! One graph is single-threaded per compilation: every pass takes
//! `&mut Graph`, so sequential pass execution is enforced by construction.
//!
//! # Deletion
//!
//! Deleting a node marks its slot dead and retires it from the kind index.
//! The slot itself survives, so ids captured by earlier visitors in the same
//! pass stay readable until the pass completes.
//!
//! # Phases
//!
//! A graph starts in [`GraphPhase::Mid`]. Lowering flips it to
//! [`GraphPhase::Lowered`], irreversibly; lowered nodes leave the kind index
//! and no longer participate in alias analysis. Constructing or deleting
//! nodes in a lowered graph is a fatal fault.

use rustc_hash::FxHashMap;
use smallvec::smallvec;

use super::arena::Arena;
use super::location::LocationIdentity;
use super::node::{Input, InputRole, Node, NodeFlags, NodeId, NodeKind, NodeKindTag};
use super::stamp::{Nullability, Stamp};

// =============================================================================
// Graph Phase
// =============================================================================

/// Lifecycle phase of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphPhase {
    /// Mid-level: nodes carry alias information and may be rewritten.
    Mid,
    /// Lowered to platform-level operations. Terminal.
    Lowered,
}

// =============================================================================
// Graph
// =============================================================================

/// The mid-level IR graph of one compilation.
pub struct Graph {
    nodes: Arena<Node>,
    /// Kind tag -> live node ids, in creation order.
    kind_index: FxHashMap<NodeKindTag, Vec<NodeId>>,
    phase: GraphPhase,
    live_count: usize,
}

impl Graph {
    /// Create an empty mid-level graph.
    pub fn new() -> Self {
        Graph {
            nodes: Arena::with_capacity(64),
            kind_index: FxHashMap::default(),
            phase: GraphPhase::Mid,
            live_count: 0,
        }
    }

    // =========================================================================
    // Access
    // =========================================================================

    /// The graph's lifecycle phase.
    #[inline]
    pub fn phase(&self) -> GraphPhase {
        self.phase
    }

    /// Get a node by id. Dead nodes stay readable.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Number of slots ever allocated, dead ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of live (non-deleted) nodes.
    #[inline]
    pub fn live_len(&self) -> usize {
        self.live_count
    }

    /// Whether a node has been deleted.
    #[inline]
    pub fn is_deleted(&self, id: NodeId) -> bool {
        self.nodes[id].is_dead()
    }

    /// The input of `id` playing `role`. Absence is a fatal fault.
    #[inline]
    pub fn input_of(&self, id: NodeId, role: InputRole) -> NodeId {
        self.nodes[id].expect_input(role)
    }

    /// Snapshot of all live nodes of one kind, in creation order.
    ///
    /// Returns an owned list so callers may delete nodes while walking it;
    /// deleted entries show up through [`Graph::is_deleted`].
    pub fn nodes_of_kind(&self, tag: NodeKindTag) -> Vec<NodeId> {
        self.kind_index.get(&tag).cloned().unwrap_or_default()
    }

    /// Number of live nodes of one kind.
    #[inline]
    pub fn kind_count(&self, tag: NodeKindTag) -> usize {
        self.kind_index.get(&tag).map_or(0, Vec::len)
    }

    /// Ids of all live nodes in creation order.
    pub fn live_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| !node.is_dead())
            .map(|(id, _)| id)
    }

    // =========================================================================
    // Typed Constructors
    // =========================================================================

    fn insert(&mut self, node: Node) -> NodeId {
        assert_eq!(
            self.phase,
            GraphPhase::Mid,
            "node created in a lowered graph"
        );
        let tag = node.tag();
        let id = self.nodes.alloc(node);
        self.kind_index.entry(tag).or_default().push(id);
        self.live_count += 1;
        id
    }

    /// Add a compile-time constant with the given raw bits.
    pub fn add_constant(&mut self, bits: u64) -> NodeId {
        self.insert(Node::new(
            NodeKind::Constant { bits },
            smallvec![],
            Stamp::word_constant(bits),
            LocationIdentity::None,
        ))
    }

    /// Add an incoming parameter with front-end type knowledge.
    pub fn add_parameter(&mut self, index: u32, stamp: Stamp) -> NodeId {
        self.insert(Node::new(
            NodeKind::Parameter { index },
            smallvec![],
            stamp,
            LocationIdentity::None,
        ))
    }

    /// Add a memory read from `location` at the given address.
    pub fn add_load(&mut self, address: NodeId, location: LocationIdentity) -> NodeId {
        assert!(
            location.touches_memory(),
            "load from a no-memory location"
        );
        self.insert(Node::new(
            NodeKind::Load,
            smallvec![Input::new(InputRole::Address, address)],
            Stamp::word(),
            location,
        ))
    }

    /// Add a memory write of `value` to `location` at the given address.
    pub fn add_store(
        &mut self,
        address: NodeId,
        value: NodeId,
        location: LocationIdentity,
    ) -> NodeId {
        assert!(
            location.touches_memory(),
            "store to a no-memory location"
        );
        self.insert(Node::new(
            NodeKind::Store,
            smallvec![
                Input::new(InputRole::Address, address),
                Input::new(InputRole::StoredValue, value),
            ],
            Stamp::void(),
            location,
        ))
    }

    /// Add a safepoint poll site.
    ///
    /// A safepoint may hand control to the surrounding runtime, so it is a
    /// full barrier like every aliases-everything node.
    pub fn add_safepoint(&mut self) -> NodeId {
        self.insert(Node::new(
            NodeKind::Safepoint,
            smallvec![],
            Stamp::void(),
            LocationIdentity::Any,
        ))
    }

    /// Add the monitor identity for one acquisition site.
    pub fn add_monitor_id(&mut self, lock_depth: u32) -> NodeId {
        self.insert(Node::new(
            NodeKind::MonitorId { lock_depth },
            smallvec![],
            Stamp::word_constant(u64::from(lock_depth)),
            LocationIdentity::None,
        ))
    }

    /// Add a symbolic non-escaping allocation.
    ///
    /// The stamp is non-null: a virtual object stands for an allocation
    /// that is known to have succeeded.
    pub fn add_virtual_object(&mut self, has_identity: bool) -> NodeId {
        self.insert(Node::new(
            NodeKind::VirtualObject { has_identity },
            smallvec![],
            Stamp::object(Nullability::NonNull),
            LocationIdentity::None,
        ))
    }

    /// Add a monitor acquisition over `object`.
    ///
    /// The object's stamp must already be proven non-null; a nullable
    /// object here is a defect in the front end and a fatal fault. The node
    /// aliases everything: the scheduler treats it as a full memory
    /// barrier regardless of which fields the lock logically protects.
    pub fn add_monitor_enter(
        &mut self,
        object: NodeId,
        hub: NodeId,
        monitor_id: NodeId,
    ) -> NodeId {
        let object_stamp = self.nodes[object].stamp();
        assert!(
            object_stamp.is_object(),
            "monitor acquisition over a non-object value"
        );
        assert!(
            object_stamp.is_non_null(),
            "monitor acquisition over a nullable object"
        );
        assert_eq!(
            self.nodes[monitor_id].tag(),
            NodeKindTag::MonitorId,
            "monitor acquisition without a monitor identity"
        );
        self.insert(Node::new(
            NodeKind::MonitorEnter,
            smallvec![
                Input::new(InputRole::Object, object),
                Input::new(InputRole::Hub, hub),
                Input::new(InputRole::MonitorId, monitor_id),
            ],
            Stamp::void(),
            LocationIdentity::Any,
        ))
    }

    // =========================================================================
    // Deletion & Lowering
    // =========================================================================

    /// Delete a node: mark the slot dead and retire it from the kind index.
    ///
    /// Idempotent. The slot stays readable for the remainder of the pass.
    pub fn delete(&mut self, id: NodeId) {
        assert_eq!(
            self.phase,
            GraphPhase::Mid,
            "node deleted in a lowered graph"
        );
        if self.nodes[id].is_dead() {
            return;
        }
        let tag = self.nodes[id].tag();
        self.nodes[id].set_flag(NodeFlags::DEAD);
        if let Some(list) = self.kind_index.get_mut(&tag) {
            list.retain(|&n| n != id);
        }
        self.live_count -= 1;
    }

    /// Flip the graph to [`GraphPhase::Lowered`].
    ///
    /// Marks every live node as lowered and clears the kind index: lowered
    /// nodes are no longer enumerable and no longer participate in alias
    /// analysis. Called by the lowering pass once translation is complete.
    pub(crate) fn seal_lowered(&mut self) {
        assert_eq!(self.phase, GraphPhase::Mid, "graph lowered twice");
        self.phase = GraphPhase::Lowered;
        for id in self.nodes.ids().collect::<Vec<_>>() {
            if !self.nodes[id].is_dead() {
                self.nodes[id].set_flag(NodeFlags::LOWERED);
            }
        }
        self.kind_index.clear();
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn object_param(graph: &mut Graph, index: u32) -> NodeId {
        graph.add_parameter(index, Stamp::object(Nullability::NonNull))
    }

    #[test]
    fn test_kind_index_enumerates_without_scans() {
        let mut graph = Graph::new();
        let addr = graph.add_parameter(0, Stamp::word());
        graph.add_load(addr, LocationIdentity::Named(0));
        graph.add_load(addr, LocationIdentity::Named(1));
        graph.add_safepoint();

        assert_eq!(graph.kind_count(NodeKindTag::Load), 2);
        assert_eq!(graph.kind_count(NodeKindTag::Safepoint), 1);
        assert_eq!(graph.kind_count(NodeKindTag::Store), 0);
        assert_eq!(graph.nodes_of_kind(NodeKindTag::Load).len(), 2);
    }

    #[test]
    fn test_monitor_enter_construction() {
        let mut graph = Graph::new();
        let object = object_param(&mut graph, 0);
        let hub = graph.add_parameter(1, Stamp::word());
        let monitor = graph.add_monitor_id(0);
        let enter = graph.add_monitor_enter(object, hub, monitor);

        let node = graph.node(enter);
        assert_eq!(node.tag(), NodeKindTag::MonitorEnter);
        assert!(node.location().is_any());
        assert_eq!(node.input(InputRole::Object), Some(object));
        assert_eq!(node.input(InputRole::MonitorId), Some(monitor));
    }

    #[test]
    #[should_panic(expected = "nullable object")]
    fn test_monitor_enter_nullable_object_is_fatal() {
        let mut graph = Graph::new();
        let object = graph.add_parameter(0, Stamp::object(Nullability::MaybeNull));
        let hub = graph.add_parameter(1, Stamp::word());
        let monitor = graph.add_monitor_id(0);
        graph.add_monitor_enter(object, hub, monitor);
    }

    #[test]
    #[should_panic(expected = "non-object value")]
    fn test_monitor_enter_word_object_is_fatal() {
        let mut graph = Graph::new();
        let object = graph.add_parameter(0, Stamp::word());
        let hub = graph.add_parameter(1, Stamp::word());
        let monitor = graph.add_monitor_id(0);
        graph.add_monitor_enter(object, hub, monitor);
    }

    #[test]
    #[should_panic(expected = "without a monitor identity")]
    fn test_monitor_enter_bad_identity_is_fatal() {
        let mut graph = Graph::new();
        let object = object_param(&mut graph, 0);
        let hub = graph.add_parameter(1, Stamp::word());
        let not_a_monitor = graph.add_constant(0);
        graph.add_monitor_enter(object, hub, not_a_monitor);
    }

    #[test]
    fn test_delete_retires_from_kind_index() {
        let mut graph = Graph::new();
        let object = object_param(&mut graph, 0);
        let hub = graph.add_parameter(1, Stamp::word());
        let monitor = graph.add_monitor_id(0);
        let enter = graph.add_monitor_enter(object, hub, monitor);
        assert_eq!(graph.live_len(), 4);

        graph.delete(enter);
        assert!(graph.is_deleted(enter));
        assert_eq!(graph.kind_count(NodeKindTag::MonitorEnter), 0);
        assert_eq!(graph.live_len(), 3);

        // Dead slot stays readable: edges held by earlier visitors in the
        // same pass must not dangle.
        assert_eq!(graph.node(enter).input(InputRole::Object), Some(object));

        // Idempotent.
        graph.delete(enter);
        assert_eq!(graph.live_len(), 3);
    }

    #[test]
    fn test_constant_stamp_is_foldable() {
        let mut graph = Graph::new();
        let c = graph.add_constant(0xfeed);
        assert_eq!(graph.node(c).stamp().as_constant(), Some(0xfeed));
    }

    #[test]
    #[should_panic(expected = "no-memory location")]
    fn test_load_requires_memory_location() {
        let mut graph = Graph::new();
        let addr = graph.add_parameter(0, Stamp::word());
        graph.add_load(addr, LocationIdentity::None);
    }
}
