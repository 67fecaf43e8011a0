//! Per-kind semantic handler registration.
//!
//! Each node kind maps to its handlers through this explicit table: an
//! optional virtualize handler consulted by the virtualization pass, and a
//! lowering handler every kind must provide. The table is ordinary static
//! data keyed by [`NodeKindTag`]; adding a kind means adding a variant and
//! a row here, and the exhaustive match keeps the two in sync.

use crate::lower::authority::LoweringAuthority;
use crate::lower::ops::LowOp;
use crate::lower::pass::{self, LowerContext};
use crate::opt::virtualize::{self, VirtualizerTool};

use super::node::{NodeId, NodeKindTag};

// =============================================================================
// Handler Types
// =============================================================================

/// Rewrites one node against the pass-local virtualizer state.
pub type VirtualizeFn = fn(&mut VirtualizerTool<'_>, NodeId);

/// Translates one node into platform-level operations.
pub type LowerFn = fn(&mut LowerContext<'_>, &dyn LoweringAuthority, NodeId, &mut Vec<LowOp>);

/// The semantic handlers registered for one node kind.
pub struct KindHandlers {
    /// Kind name, for diagnostics.
    pub name: &'static str,
    /// Virtualize handler, for kinds the virtualization pass rewrites.
    pub virtualize: Option<VirtualizeFn>,
    /// Lowering handler.
    pub lower: LowerFn,
}

// =============================================================================
// Registration Table
// =============================================================================

static CONSTANT: KindHandlers = KindHandlers {
    name: "constant",
    virtualize: None,
    lower: pass::lower_constant,
};

static PARAMETER: KindHandlers = KindHandlers {
    name: "parameter",
    virtualize: None,
    lower: pass::lower_parameter,
};

static LOAD: KindHandlers = KindHandlers {
    name: "load",
    virtualize: None,
    lower: pass::lower_load,
};

static STORE: KindHandlers = KindHandlers {
    name: "store",
    virtualize: None,
    lower: pass::lower_store,
};

static SAFEPOINT: KindHandlers = KindHandlers {
    name: "safepoint",
    virtualize: None,
    lower: pass::lower_safepoint,
};

static MONITOR_ID: KindHandlers = KindHandlers {
    name: "monitor_id",
    virtualize: None,
    lower: pass::lower_monitor_id,
};

static MONITOR_ENTER: KindHandlers = KindHandlers {
    name: "monitor_enter",
    virtualize: Some(virtualize::virtualize_monitor_enter),
    lower: pass::lower_monitor_enter,
};

static VIRTUAL_OBJECT: KindHandlers = KindHandlers {
    name: "virtual_object",
    virtualize: None,
    lower: pass::lower_virtual_object,
};

/// The handlers registered for a kind.
pub fn kind_handlers(tag: NodeKindTag) -> &'static KindHandlers {
    match tag {
        NodeKindTag::Constant => &CONSTANT,
        NodeKindTag::Parameter => &PARAMETER,
        NodeKindTag::Load => &LOAD,
        NodeKindTag::Store => &STORE,
        NodeKindTag::Safepoint => &SAFEPOINT,
        NodeKindTag::MonitorId => &MONITOR_ID,
        NodeKindTag::MonitorEnter => &MONITOR_ENTER,
        NodeKindTag::VirtualObject => &VIRTUAL_OBJECT,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_is_registered() {
        for tag in NodeKindTag::ALL {
            let handlers = kind_handlers(tag);
            assert_eq!(handlers.name, tag.name());
        }
    }

    #[test]
    fn test_only_monitor_enter_virtualizes() {
        for tag in NodeKindTag::ALL {
            let has_handler = kind_handlers(tag).virtualize.is_some();
            assert_eq!(has_handler, tag == NodeKindTag::MonitorEnter);
        }
    }
}
