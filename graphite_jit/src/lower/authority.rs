//! The swappable lowering authority for monitor acquisitions.
//!
//! A monitor-enter node owns the decision *that* it lowers, but the actual
//! operation sequence belongs to a per-target delegate supplied by the
//! pipeline. Swapping the delegate retargets lock lowering without touching
//! the node or the pass.

use smallvec::smallvec;

use crate::ir::node::{InputRole, NodeId};

use super::ops::{LowOp, RuntimeStub};
use super::pass::LowerContext;

// =============================================================================
// Authority Trait
// =============================================================================

/// Platform-specific construction of monitor-acquisition sequences.
///
/// One authority exists per compilation target and is consumed only by the
/// lowering pass.
pub trait LoweringAuthority {
    /// Target name, for diagnostics.
    fn name(&self) -> &'static str;

    /// Emit the operation sequence for one monitor acquisition.
    fn lower_monitor_enter(&self, cx: &mut LowerContext<'_>, node: NodeId, ops: &mut Vec<LowOp>);
}

// =============================================================================
// Provided Targets
// =============================================================================

/// Inline fast path: compare-and-swap the header word, calling the runtime
/// stub only when the CAS loses.
#[derive(Debug, Clone, Copy)]
pub struct InlineCasLowering {
    /// Byte offset of the lock word in the object header.
    pub header_offset: u32,
}

impl Default for InlineCasLowering {
    fn default() -> Self {
        InlineCasLowering { header_offset: 8 }
    }
}

impl LoweringAuthority for InlineCasLowering {
    fn name(&self) -> &'static str {
        "inline_cas"
    }

    fn lower_monitor_enter(&self, cx: &mut LowerContext<'_>, node: NodeId, ops: &mut Vec<LowOp>) {
        let object = cx.graph().input_of(node, InputRole::Object);
        let monitor = cx.graph().input_of(node, InputRole::MonitorId);

        let obj = cx.vreg(object);
        let lock_bits = cx.vreg(monitor);
        let unlocked = cx.fresh_vreg();
        let swapped = cx.fresh_vreg();
        let done = cx.fresh_label();
        let header = cx.words().unsigned32(self.header_offset);

        // Fast path: an unlocked header word is all-zero; install the lock
        // bits with a single CAS and skip the stub when it wins.
        ops.push(LowOp::MoveConst {
            dst: unlocked,
            value: cx.words().zero(),
        });
        ops.push(LowOp::CasWord {
            dst: swapped,
            base: obj,
            offset: header,
            expected: unlocked,
            update: lock_bits,
        });
        ops.push(LowOp::BranchIfNonZero {
            cond: swapped,
            target: done,
        });
        ops.push(LowOp::CallStub {
            stub: RuntimeStub::MonitorEnter,
            args: smallvec![obj, lock_bits],
        });
        ops.push(LowOp::Bind(done));
    }
}

/// Always call the runtime stub. The conservative target for platforms
/// without a usable inline path.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeCallLowering;

impl LoweringAuthority for RuntimeCallLowering {
    fn name(&self) -> &'static str {
        "runtime_call"
    }

    fn lower_monitor_enter(&self, cx: &mut LowerContext<'_>, node: NodeId, ops: &mut Vec<LowOp>) {
        let object = cx.graph().input_of(node, InputRole::Object);
        let monitor = cx.graph().input_of(node, InputRole::MonitorId);
        ops.push(LowOp::CallStub {
            stub: RuntimeStub::MonitorEnter,
            args: smallvec![cx.vreg(object), cx.vreg(monitor)],
        });
    }
}
