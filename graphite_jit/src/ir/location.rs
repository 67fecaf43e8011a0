//! Memory-location identities.
//!
//! Each node carries a marker describing which memory it may read or write.
//! The scheduler consults these markers when deciding whether two accesses
//! may be reordered; [`LocationIdentity::Any`] aliases everything and turns
//! its node into a full memory barrier.

use std::fmt;

// =============================================================================
// Location Identity
// =============================================================================

/// Which memory a node may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationIdentity {
    /// Touches no memory at all (pure computation).
    None,
    /// May alias every location. Used conservatively for operations whose
    /// visibility effects span all of memory, e.g. a lock acquisition.
    Any,
    /// One distinct field or slot class, disjoint from every other
    /// `Named` identity.
    Named(u32),
}

impl LocationIdentity {
    /// Whether this identity aliases everything.
    #[inline]
    pub const fn is_any(self) -> bool {
        matches!(self, LocationIdentity::Any)
    }

    /// Whether the node touches memory at all.
    #[inline]
    pub const fn touches_memory(self) -> bool {
        !matches!(self, LocationIdentity::None)
    }

    /// Whether two identities may refer to the same memory.
    ///
    /// `None` overlaps nothing; `Any` overlaps every memory-touching
    /// identity; two `Named` identities overlap only when equal.
    pub fn overlaps(self, other: LocationIdentity) -> bool {
        match (self, other) {
            (LocationIdentity::None, _) | (_, LocationIdentity::None) => false,
            (LocationIdentity::Any, _) | (_, LocationIdentity::Any) => true,
            (LocationIdentity::Named(a), LocationIdentity::Named(b)) => a == b,
        }
    }
}

impl fmt::Display for LocationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationIdentity::None => write!(f, "none"),
            LocationIdentity::Any => write!(f, "any"),
            LocationIdentity::Named(id) => write!(f, "loc{}", id),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_overlaps_all_memory() {
        let any = LocationIdentity::Any;
        assert!(any.overlaps(LocationIdentity::Named(0)));
        assert!(any.overlaps(LocationIdentity::Any));
        assert!(!any.overlaps(LocationIdentity::None));
    }

    #[test]
    fn test_named_disjointness() {
        let a = LocationIdentity::Named(1);
        let b = LocationIdentity::Named(2);
        assert!(a.overlaps(a));
        assert!(!a.overlaps(b));
    }

    #[test]
    fn test_none_touches_nothing() {
        assert!(!LocationIdentity::None.touches_memory());
        assert!(!LocationIdentity::None.overlaps(LocationIdentity::None));
        assert!(LocationIdentity::Any.touches_memory());
        assert!(LocationIdentity::Named(3).touches_memory());
    }
}
