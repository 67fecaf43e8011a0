//! Escape-analysis-driven virtualization of monitor acquisitions.
//!
//! For every lock node, the pass resolves the locked object through the
//! alias map. When the object is a provably non-escaping, identity-bearing
//! virtual object, the acquisition is deleted from the graph and recorded
//! as a virtual lock instead: the effect becomes purely symbolic, tracked
//! only by the compiler.
//!
//! A lock over a value-like virtual object or a still-materialized object
//! is left untouched, and a node whose object has escaped is never deleted
//! regardless of what the alias map claims about its representative.
//!
//! The pass is idempotent: deleted nodes leave the kind index, so a re-run
//! visits nothing and changes nothing.

use rustc_hash::FxHashMap;

use crate::ir::graph::{Graph, GraphPhase};
use crate::ir::kinds::kind_handlers;
use crate::ir::node::{InputRole, Node, NodeId, NodeKind, NodeKindTag};

use super::escape::{AliasMap, EscapeState};

// =============================================================================
// Virtualized Locks
// =============================================================================

/// Virtual locks recorded during one pass: virtual object -> the monitor
/// identities locked on it, in acquisition order.
///
/// Handed to the pipeline so a later pass can re-materialize the locks if
/// the object is discovered to escape after all.
#[derive(Debug, Default)]
pub struct VirtualizedLocks {
    by_object: FxHashMap<NodeId, Vec<NodeId>>,
    total: u64,
}

impl VirtualizedLocks {
    fn add(&mut self, object: NodeId, monitor_id: NodeId) {
        self.by_object.entry(object).or_default().push(monitor_id);
        self.total += 1;
    }

    /// The monitor identities locked on a virtual object, in order.
    pub fn locks_on(&self, object: NodeId) -> &[NodeId] {
        self.by_object.get(&object).map_or(&[], Vec::as_slice)
    }

    /// Number of virtual objects carrying at least one lock.
    pub fn object_count(&self) -> usize {
        self.by_object.len()
    }

    /// Total number of recorded locks.
    pub fn lock_count(&self) -> u64 {
        self.total
    }

    /// Whether no locks were recorded.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

// =============================================================================
// Pass Statistics
// =============================================================================

/// Counters for one virtualization run.
#[derive(Debug, Default, Clone, Copy)]
pub struct VirtualizeStats {
    /// Virtualizable nodes visited.
    pub nodes_visited: u64,
    /// Nodes whose effect became symbolic and were deleted.
    pub nodes_deleted: u64,
    /// Virtual locks recorded.
    pub locks_recorded: u64,
}

// =============================================================================
// Virtualizer Tool
// =============================================================================

/// Pass-local context handed to a node's virtualize handler.
///
/// Exposes alias resolution over the externally supplied map and the two
/// graph mutations a handler may perform: recording a virtual lock and
/// deleting the node under consideration. Borrows die at pass end; the
/// recorded locks survive in the pass result.
pub struct VirtualizerTool<'a> {
    graph: &'a mut Graph,
    aliases: &'a AliasMap,
    locks: &'a mut VirtualizedLocks,
    current: NodeId,
    deleted: bool,
}

impl<'a> VirtualizerTool<'a> {
    fn new(
        graph: &'a mut Graph,
        aliases: &'a AliasMap,
        locks: &'a mut VirtualizedLocks,
        current: NodeId,
    ) -> Self {
        VirtualizerTool {
            graph,
            aliases,
            locks,
            current,
            deleted: false,
        }
    }

    /// The node currently being virtualized.
    #[inline]
    pub fn current(&self) -> NodeId {
        self.current
    }

    /// Read a node.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        self.graph.node(id)
    }

    /// The current virtual-or-materialized representative of a value.
    #[inline]
    pub fn alias(&self, value: NodeId) -> NodeId {
        self.aliases.resolve(value)
    }

    /// The escape state of an allocation.
    #[inline]
    pub fn escape_state(&self, allocation: NodeId) -> EscapeState {
        self.aliases.escape_state(allocation)
    }

    /// Record a virtual lock on an identity-bearing virtual object.
    ///
    /// Locking a value-like aggregate, or anything that is not a virtual
    /// object, is a pass defect and a fatal fault.
    pub fn add_lock(&mut self, object: NodeId, monitor_id: NodeId) {
        assert!(
            matches!(
                self.graph.node(object).kind(),
                NodeKind::VirtualObject { has_identity: true }
            ),
            "virtual lock on a non-identity object"
        );
        self.locks.add(object, monitor_id);
    }

    /// Delete the node currently being virtualized.
    pub fn delete(&mut self) {
        self.graph.delete(self.current);
        self.deleted = true;
    }
}

// =============================================================================
// Monitor Enter Handler
// =============================================================================

/// Virtualize one monitor acquisition.
///
/// Registered for [`NodeKindTag::MonitorEnter`] in the kind table.
pub(crate) fn virtualize_monitor_enter(tool: &mut VirtualizerTool<'_>, id: NodeId) {
    let object = tool.node(id).expect_input(InputRole::Object);
    let monitor_id = tool.node(id).expect_input(InputRole::MonitorId);

    let representative = tool.alias(object);
    let NodeKind::VirtualObject { has_identity } = *tool.node(representative).kind() else {
        // Still materialized: the lock must really be taken.
        return;
    };

    // An escaped object keeps its lock no matter what the alias map claims
    // about its representative. Correctness invariant, not a heuristic.
    if !tool.escape_state(representative).is_virtualizable() {
        return;
    }

    // Value-like aggregates have no monitor to elide.
    if !has_identity {
        return;
    }

    tool.add_lock(representative, monitor_id);
    tool.delete();
}

// =============================================================================
// Virtualization Pass
// =============================================================================

/// Result of one virtualization run.
#[derive(Debug)]
pub struct VirtualizeResult {
    /// Whether any node was rewritten.
    pub changed: bool,
    /// The virtual locks recorded this run.
    pub locks: VirtualizedLocks,
    /// Pass counters.
    pub stats: VirtualizeStats,
}

/// The virtualization pass driver.
///
/// Walks each virtualizable kind through the graph's kind index and hands
/// every live node to its registered handler.
pub struct VirtualizePass;

impl VirtualizePass {
    /// Run virtualization over a mid-level graph.
    pub fn run(graph: &mut Graph, aliases: &AliasMap) -> VirtualizeResult {
        assert_eq!(
            graph.phase(),
            GraphPhase::Mid,
            "virtualization over a lowered graph"
        );

        let mut locks = VirtualizedLocks::default();
        let mut stats = VirtualizeStats::default();
        let mut changed = false;

        for tag in NodeKindTag::ALL {
            let Some(handler) = kind_handlers(tag).virtualize else {
                continue;
            };
            for id in graph.nodes_of_kind(tag) {
                if graph.is_deleted(id) {
                    continue;
                }
                stats.nodes_visited += 1;
                let mut tool = VirtualizerTool::new(graph, aliases, &mut locks, id);
                handler(&mut tool, id);
                if tool.deleted {
                    stats.nodes_deleted += 1;
                    changed = true;
                }
            }
        }

        stats.locks_recorded = locks.lock_count();
        VirtualizeResult {
            changed,
            locks,
            stats,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::stamp::{Nullability, Stamp};

    struct LockFixture {
        graph: Graph,
        object: NodeId,
        monitor: NodeId,
        enter: NodeId,
    }

    /// A monitor acquisition over a non-null object parameter.
    fn lock_fixture() -> LockFixture {
        let mut graph = Graph::new();
        let object = graph.add_parameter(0, Stamp::object(Nullability::NonNull));
        let hub = graph.add_parameter(1, Stamp::word());
        let monitor = graph.add_monitor_id(0);
        let enter = graph.add_monitor_enter(object, hub, monitor);
        LockFixture {
            graph,
            object,
            monitor,
            enter,
        }
    }

    #[test]
    fn test_identity_virtual_lock_is_elided() {
        let mut f = lock_fixture();
        let vobj = f.graph.add_virtual_object(true);

        let mut aliases = AliasMap::new();
        aliases.record_alias(f.object, vobj);
        aliases.record_escape(vobj, EscapeState::NoEscape);

        let result = VirtualizePass::run(&mut f.graph, &aliases);

        assert!(result.changed);
        assert!(f.graph.is_deleted(f.enter));
        assert_eq!(f.graph.kind_count(NodeKindTag::MonitorEnter), 0);
        // Exactly one lock, keyed by the original monitor identity.
        assert_eq!(result.locks.locks_on(vobj), &[f.monitor]);
        assert_eq!(result.locks.lock_count(), 1);
        assert_eq!(result.locks.object_count(), 1);
        assert_eq!(result.stats.nodes_deleted, 1);
    }

    #[test]
    fn test_rerun_is_a_noop() {
        let mut f = lock_fixture();
        let vobj = f.graph.add_virtual_object(true);

        let mut aliases = AliasMap::new();
        aliases.record_alias(f.object, vobj);
        aliases.record_escape(vobj, EscapeState::NoEscape);

        let first = VirtualizePass::run(&mut f.graph, &aliases);
        assert!(first.changed);

        let second = VirtualizePass::run(&mut f.graph, &aliases);
        assert!(!second.changed);
        assert!(second.locks.is_empty());
        assert_eq!(second.stats.nodes_visited, 0);
    }

    #[test]
    fn test_value_like_virtual_object_keeps_its_lock() {
        let mut f = lock_fixture();
        let vobj = f.graph.add_virtual_object(false);

        let mut aliases = AliasMap::new();
        aliases.record_alias(f.object, vobj);
        aliases.record_escape(vobj, EscapeState::NoEscape);

        let result = VirtualizePass::run(&mut f.graph, &aliases);

        assert!(!result.changed);
        assert!(!f.graph.is_deleted(f.enter));
        assert!(result.locks.is_empty());
    }

    #[test]
    fn test_materialized_object_keeps_its_lock() {
        let mut f = lock_fixture();
        // No alias entry: the object resolves to itself, a parameter.
        let aliases = AliasMap::new();

        let result = VirtualizePass::run(&mut f.graph, &aliases);

        assert!(!result.changed);
        assert!(!f.graph.is_deleted(f.enter));
        assert_eq!(f.graph.kind_count(NodeKindTag::MonitorEnter), 1);
        // Inputs are structurally unchanged.
        let node = f.graph.node(f.enter);
        assert_eq!(node.input(InputRole::Object), Some(f.object));
        assert_eq!(node.input(InputRole::MonitorId), Some(f.monitor));
    }

    #[test]
    fn test_escaped_object_is_never_deleted() {
        let mut f = lock_fixture();
        let vobj = f.graph.add_virtual_object(true);

        // The map aliases the object to a virtual representative but also
        // records that the allocation escapes.
        let mut aliases = AliasMap::new();
        aliases.record_alias(f.object, vobj);
        aliases.record_escape(vobj, EscapeState::GlobalEscape);

        let result = VirtualizePass::run(&mut f.graph, &aliases);
        assert!(!result.changed);
        assert!(!f.graph.is_deleted(f.enter));

        // Same for an untracked representative: no entry, no elision.
        let mut f2 = lock_fixture();
        let vobj2 = f2.graph.add_virtual_object(true);
        let mut aliases2 = AliasMap::new();
        aliases2.record_alias(f2.object, vobj2);

        let result2 = VirtualizePass::run(&mut f2.graph, &aliases2);
        assert!(!result2.changed);
        assert!(!f2.graph.is_deleted(f2.enter));
    }

    #[test]
    fn test_two_locks_on_one_virtual_object_stay_ordered() {
        let mut graph = Graph::new();
        let object = graph.add_parameter(0, Stamp::object(Nullability::NonNull));
        let hub = graph.add_parameter(1, Stamp::word());
        let first = graph.add_monitor_id(0);
        let second = graph.add_monitor_id(1);
        graph.add_monitor_enter(object, hub, first);
        graph.add_monitor_enter(object, hub, second);
        let vobj = graph.add_virtual_object(true);

        let mut aliases = AliasMap::new();
        aliases.record_alias(object, vobj);
        aliases.record_escape(vobj, EscapeState::NoEscape);

        let result = VirtualizePass::run(&mut graph, &aliases);
        assert_eq!(result.locks.locks_on(vobj), &[first, second]);
        assert_eq!(result.stats.nodes_deleted, 2);
    }
}
