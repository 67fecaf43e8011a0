//! Escape states and the alias map consumed by virtualization.
//!
//! Escape analysis itself runs upstream; this module is the read-only
//! contract it hands to the virtualization pass: which values currently
//! resolve to which representative, and how far each allocation escapes.

use rustc_hash::FxHashMap;

use crate::ir::node::NodeId;

// =============================================================================
// Escape State
// =============================================================================

/// How far an allocation escapes its compilation unit.
///
/// Ordered from least to most escaping; merging two states takes the more
/// conservative one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum EscapeState {
    /// Never visible outside the compiled unit.
    #[default]
    NoEscape,
    /// Passed to a callee but not stored or returned.
    ArgEscape,
    /// Stored to the heap, returned, or otherwise globally visible.
    GlobalEscape,
}

impl EscapeState {
    /// Merge two states, keeping the more conservative.
    #[inline]
    pub fn merge(self, other: EscapeState) -> EscapeState {
        self.max(other)
    }

    /// Whether effects on this allocation may be elided entirely.
    #[inline]
    pub fn is_virtualizable(self) -> bool {
        self == EscapeState::NoEscape
    }
}

// =============================================================================
// Alias Map
// =============================================================================

/// The externally computed alias/escape map.
///
/// Maps each value to its current virtual-or-materialized representative
/// and records the escape state of every tracked allocation. Produced by
/// upstream escape analysis, consumed read-only for the duration of one
/// virtualization pass.
#[derive(Debug, Default)]
pub struct AliasMap {
    /// value -> its current representative (one step).
    aliases: FxHashMap<NodeId, NodeId>,
    /// tracked allocation -> escape state.
    escapes: FxHashMap<NodeId, EscapeState>,
}

impl AliasMap {
    /// Create an empty map.
    pub fn new() -> Self {
        AliasMap::default()
    }

    /// Record that `value` currently stands for `representative`.
    pub fn record_alias(&mut self, value: NodeId, representative: NodeId) {
        assert_ne!(value, representative, "value aliased to itself");
        self.aliases.insert(value, representative);
    }

    /// Record (merging conservatively) the escape state of an allocation.
    pub fn record_escape(&mut self, allocation: NodeId, state: EscapeState) {
        let entry = self.escapes.entry(allocation).or_default();
        *entry = entry.merge(state);
    }

    /// Resolve a value to its final representative, following alias links
    /// transitively. A value with no entry represents itself.
    pub fn resolve(&self, value: NodeId) -> NodeId {
        let mut current = value;
        // Alias chains are short; a defective cyclic map must fault, not
        // hang the compiler.
        let mut steps_left = self.aliases.len() + 1;
        while let Some(&next) = self.aliases.get(&current) {
            assert!(steps_left > 0, "alias map contains a cycle");
            steps_left -= 1;
            current = next;
        }
        current
    }

    /// The escape state of an allocation. Untracked allocations are
    /// reported as [`EscapeState::GlobalEscape`]: nothing may be elided on
    /// the strength of a missing entry.
    pub fn escape_state(&self, allocation: NodeId) -> EscapeState {
        self.escapes
            .get(&allocation)
            .copied()
            .unwrap_or(EscapeState::GlobalEscape)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> NodeId {
        NodeId::new(n)
    }

    #[test]
    fn test_resolve_follows_chains() {
        let mut map = AliasMap::new();
        map.record_alias(id(0), id(1));
        map.record_alias(id(1), id(2));

        assert_eq!(map.resolve(id(0)), id(2));
        assert_eq!(map.resolve(id(1)), id(2));
        // No entry: the value represents itself.
        assert_eq!(map.resolve(id(9)), id(9));
    }

    #[test]
    fn test_escape_merge_is_monotonic() {
        let mut map = AliasMap::new();
        map.record_escape(id(4), EscapeState::NoEscape);
        assert_eq!(map.escape_state(id(4)), EscapeState::NoEscape);

        map.record_escape(id(4), EscapeState::GlobalEscape);
        map.record_escape(id(4), EscapeState::NoEscape);
        // Once escaped, always escaped.
        assert_eq!(map.escape_state(id(4)), EscapeState::GlobalEscape);

        assert_eq!(
            EscapeState::ArgEscape.merge(EscapeState::NoEscape),
            EscapeState::ArgEscape
        );
    }

    #[test]
    fn test_untracked_allocation_is_conservative() {
        let map = AliasMap::new();
        assert_eq!(map.escape_state(id(7)), EscapeState::GlobalEscape);
        assert!(!map.escape_state(id(7)).is_virtualizable());
    }

    #[test]
    #[should_panic(expected = "cycle")]
    fn test_alias_cycle_is_fatal() {
        let mut map = AliasMap::new();
        map.record_alias(id(0), id(1));
        map.record_alias(id(1), id(0));
        map.resolve(id(0));
    }
}
