//! Conservative memory-ordering constraints over node sequences.
//!
//! The checks here answer one question for the scheduler: given the program
//! order the front end produced, which reorderings keep the memory semantics
//! intact?
//!
//! Two independent rules order a pair of nodes:
//!
//! 1. **Data dependence**: a node never moves above a transitive input.
//! 2. **Memory conflict**: an aliases-everything node is a full barrier
//!    that no load or store crosses in either direction; two accesses to
//!    overlapping named locations stay ordered when at least one writes.
//!
//! Everything else may reorder freely.

use rustc_hash::{FxHashMap, FxHashSet};

use super::graph::Graph;
use super::node::{Node, NodeId};

// =============================================================================
// Pairwise Constraints
// =============================================================================

/// Whether `later` transitively consumes the value of `earlier`.
fn depends_on(graph: &Graph, later: NodeId, earlier: NodeId) -> bool {
    let mut visited = FxHashSet::default();
    let mut stack = vec![later];
    while let Some(id) = stack.pop() {
        for input in graph.node(id).inputs() {
            if input.node == earlier {
                return true;
            }
            if visited.insert(input.node) {
                stack.push(input.node);
            }
        }
    }
    false
}

/// Whether the memory effects of `a` and `b` forbid swapping them.
fn memory_conflict(a: &Node, b: &Node) -> bool {
    let (la, lb) = (a.location(), b.location());
    // No load or store crosses a full barrier, in either direction.
    if (la.is_any() && lb.touches_memory()) || (lb.is_any() && la.touches_memory()) {
        return true;
    }
    // Overlapping named locations stay ordered when either side writes.
    la.overlaps(lb) && (a.writes_memory() || b.writes_memory())
}

/// Whether program order must keep `earlier` before `later`.
pub fn must_precede(graph: &Graph, earlier: NodeId, later: NodeId) -> bool {
    depends_on(graph, later, earlier) || memory_conflict(graph.node(earlier), graph.node(later))
}

/// Whether two adjacent nodes may swap positions in a schedule.
pub fn may_reorder(graph: &Graph, a: NodeId, b: NodeId) -> bool {
    !must_precede(graph, a, b) && !must_precede(graph, b, a)
}

// =============================================================================
// Schedule Validation
// =============================================================================

/// Whether `proposed` is a valid reordering of `original`.
///
/// Valid means: the same set of nodes, with every must-precede pair of the
/// original order preserved.
pub fn is_legal_schedule(graph: &Graph, original: &[NodeId], proposed: &[NodeId]) -> bool {
    if original.len() != proposed.len() {
        return false;
    }
    let mut position = FxHashMap::default();
    for (pos, &id) in proposed.iter().enumerate() {
        position.insert(id, pos);
    }
    if original.iter().any(|id| !position.contains_key(id)) {
        return false;
    }
    for (i, &earlier) in original.iter().enumerate() {
        for &later in &original[i + 1..] {
            if must_precede(graph, earlier, later) && position[&earlier] > position[&later] {
                return false;
            }
        }
    }
    true
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::location::LocationIdentity;
    use crate::ir::stamp::{Nullability, Stamp};

    struct BarrierFixture {
        graph: Graph,
        load_before: NodeId,
        barrier: NodeId,
        load_after: NodeId,
    }

    /// An independent load on each side of a monitor acquisition.
    fn barrier_fixture() -> BarrierFixture {
        let mut graph = Graph::new();
        let addr_a = graph.add_parameter(0, Stamp::word());
        let addr_b = graph.add_parameter(1, Stamp::word());
        let object = graph.add_parameter(2, Stamp::object(Nullability::NonNull));
        let hub = graph.add_parameter(3, Stamp::word());
        let monitor = graph.add_monitor_id(0);

        let load_before = graph.add_load(addr_a, LocationIdentity::Named(0));
        let barrier = graph.add_monitor_enter(object, hub, monitor);
        let load_after = graph.add_load(addr_b, LocationIdentity::Named(1));

        BarrierFixture {
            graph,
            load_before,
            barrier,
            load_after,
        }
    }

    #[test]
    fn test_barrier_forbids_crossing_in_both_directions() {
        let f = barrier_fixture();
        assert!(must_precede(&f.graph, f.load_before, f.barrier));
        assert!(must_precede(&f.graph, f.barrier, f.load_after));
        assert!(!may_reorder(&f.graph, f.load_before, f.barrier));
        assert!(!may_reorder(&f.graph, f.barrier, f.load_after));
    }

    #[test]
    fn test_only_original_order_is_legal_around_barrier() {
        let f = barrier_fixture();
        let original = [f.load_before, f.barrier, f.load_after];

        // Every permutation other than the original moves an access across
        // the barrier.
        let permutations = [
            [f.load_before, f.barrier, f.load_after],
            [f.load_before, f.load_after, f.barrier],
            [f.barrier, f.load_before, f.load_after],
            [f.barrier, f.load_after, f.load_before],
            [f.load_after, f.load_before, f.barrier],
            [f.load_after, f.barrier, f.load_before],
        ];
        let legal: Vec<bool> = permutations
            .iter()
            .map(|p| is_legal_schedule(&f.graph, &original, p))
            .collect();
        assert_eq!(legal, vec![true, false, false, false, false, false]);
    }

    #[test]
    fn test_independent_loads_reorder_freely() {
        let mut graph = Graph::new();
        let addr = graph.add_parameter(0, Stamp::word());
        let a = graph.add_load(addr, LocationIdentity::Named(0));
        let b = graph.add_load(addr, LocationIdentity::Named(1));
        assert!(may_reorder(&graph, a, b));
        assert!(is_legal_schedule(&graph, &[a, b], &[b, a]));
    }

    #[test]
    fn test_same_location_loads_reorder_but_store_orders() {
        let mut graph = Graph::new();
        let addr = graph.add_parameter(0, Stamp::word());
        let value = graph.add_constant(7);
        let loc = LocationIdentity::Named(4);

        let load_a = graph.add_load(addr, loc);
        let load_b = graph.add_load(addr, loc);
        assert!(may_reorder(&graph, load_a, load_b));

        let store = graph.add_store(addr, value, loc);
        assert!(!may_reorder(&graph, load_a, store));
        assert!(!may_reorder(&graph, store, load_b));
    }

    #[test]
    fn test_data_dependence_orders() {
        let mut graph = Graph::new();
        let addr = graph.add_parameter(0, Stamp::word());
        let load = graph.add_load(addr, LocationIdentity::Named(0));
        // The load consumes the parameter, transitively ordering them.
        assert!(must_precede(&graph, addr, load));
        assert!(!is_legal_schedule(&graph, &[addr, load], &[load, addr]));
    }

    #[test]
    fn test_schedule_must_be_a_permutation() {
        let mut graph = Graph::new();
        let a = graph.add_constant(1);
        let b = graph.add_constant(2);
        let c = graph.add_constant(3);
        assert!(!is_legal_schedule(&graph, &[a, b], &[a, c]));
        assert!(!is_legal_schedule(&graph, &[a, b], &[a]));
    }
}
