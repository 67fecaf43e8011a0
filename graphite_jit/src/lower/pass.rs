//! The lowering pass: mid-level nodes to platform-level operations.
//!
//! Each node kind owns its translation through the kind registration table;
//! monitor acquisitions delegate sequence construction to the pipeline's
//! [`LoweringAuthority`]. Lowering runs once, only after virtualization has
//! converged, and is irreversible: the graph flips to
//! [`GraphPhase::Lowered`], its kind index empties, and its nodes leave
//! alias analysis for good.

use graphite_core::WordFactory;

use crate::ir::graph::{Graph, GraphPhase};
use crate::ir::kinds::kind_handlers;
use crate::ir::node::{InputRole, NodeId, NodeKind};

use super::authority::LoweringAuthority;
use super::ops::{LowLabel, LowOp, VReg};

// =============================================================================
// Lower Context
// =============================================================================

/// Pass-local state shared by every lowering handler.
///
/// Maps node results to virtual registers (one per arena slot, so the
/// mapping needs no table) and allocates temporaries and labels.
pub struct LowerContext<'a> {
    graph: &'a Graph,
    words: &'a WordFactory,
    next_vreg: u32,
    next_label: u32,
}

impl<'a> LowerContext<'a> {
    fn new(graph: &'a Graph, words: &'a WordFactory) -> Self {
        LowerContext {
            graph,
            words,
            // Temporaries start past the node-result registers.
            next_vreg: graph.len() as u32,
            next_label: 0,
        }
    }

    /// The graph being lowered.
    #[inline]
    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// The word factory for immediates.
    #[inline]
    pub fn words(&self) -> &WordFactory {
        self.words
    }

    /// The virtual register holding a node's result.
    #[inline]
    pub fn vreg(&self, id: NodeId) -> VReg {
        VReg(id.index())
    }

    /// Allocate a temporary register.
    #[inline]
    pub fn fresh_vreg(&mut self) -> VReg {
        let reg = VReg(self.next_vreg);
        self.next_vreg += 1;
        reg
    }

    /// Allocate a local label.
    #[inline]
    pub fn fresh_label(&mut self) -> LowLabel {
        let label = LowLabel(self.next_label);
        self.next_label += 1;
        label
    }
}

// =============================================================================
// Per-Kind Handlers
// =============================================================================

pub(crate) fn lower_constant(
    cx: &mut LowerContext<'_>,
    _authority: &dyn LoweringAuthority,
    id: NodeId,
    ops: &mut Vec<LowOp>,
) {
    let NodeKind::Constant { bits } = *cx.graph().node(id).kind() else {
        panic!("constant handler over a {} node", cx.graph().node(id).tag().name());
    };
    ops.push(LowOp::MoveConst {
        dst: cx.vreg(id),
        value: cx.words().unsigned(bits),
    });
}

pub(crate) fn lower_parameter(
    cx: &mut LowerContext<'_>,
    _authority: &dyn LoweringAuthority,
    id: NodeId,
    ops: &mut Vec<LowOp>,
) {
    let NodeKind::Parameter { index } = *cx.graph().node(id).kind() else {
        panic!("parameter handler over a {} node", cx.graph().node(id).tag().name());
    };
    ops.push(LowOp::LoadParam {
        dst: cx.vreg(id),
        index,
    });
}

pub(crate) fn lower_load(
    cx: &mut LowerContext<'_>,
    _authority: &dyn LoweringAuthority,
    id: NodeId,
    ops: &mut Vec<LowOp>,
) {
    let address = cx.graph().input_of(id, InputRole::Address);
    ops.push(LowOp::LoadWord {
        dst: cx.vreg(id),
        base: cx.vreg(address),
        offset: cx.words().zero(),
    });
}

pub(crate) fn lower_store(
    cx: &mut LowerContext<'_>,
    _authority: &dyn LoweringAuthority,
    id: NodeId,
    ops: &mut Vec<LowOp>,
) {
    let address = cx.graph().input_of(id, InputRole::Address);
    let value = cx.graph().input_of(id, InputRole::StoredValue);
    ops.push(LowOp::StoreWord {
        base: cx.vreg(address),
        offset: cx.words().zero(),
        src: cx.vreg(value),
    });
}

pub(crate) fn lower_safepoint(
    _cx: &mut LowerContext<'_>,
    _authority: &dyn LoweringAuthority,
    _id: NodeId,
    ops: &mut Vec<LowOp>,
) {
    ops.push(LowOp::SafepointPoll);
}

/// A monitor identity materializes as its lock slot index.
pub(crate) fn lower_monitor_id(
    cx: &mut LowerContext<'_>,
    _authority: &dyn LoweringAuthority,
    id: NodeId,
    ops: &mut Vec<LowOp>,
) {
    let NodeKind::MonitorId { lock_depth } = *cx.graph().node(id).kind() else {
        panic!("monitor-id handler over a {} node", cx.graph().node(id).tag().name());
    };
    ops.push(LowOp::MoveConst {
        dst: cx.vreg(id),
        value: cx.words().unsigned32(lock_depth),
    });
}

/// Sequence construction belongs to the per-target authority, not the node.
pub(crate) fn lower_monitor_enter(
    cx: &mut LowerContext<'_>,
    authority: &dyn LoweringAuthority,
    id: NodeId,
    ops: &mut Vec<LowOp>,
) {
    authority.lower_monitor_enter(cx, id, ops);
}

/// A virtual object is a symbolic record; it has no machine footprint.
pub(crate) fn lower_virtual_object(
    _cx: &mut LowerContext<'_>,
    _authority: &dyn LoweringAuthority,
    _id: NodeId,
    _ops: &mut Vec<LowOp>,
) {
}

// =============================================================================
// Lowering Pass
// =============================================================================

/// Counters for one lowering run.
#[derive(Debug, Default, Clone, Copy)]
pub struct LowerStats {
    /// Live nodes translated.
    pub nodes_lowered: u64,
    /// Operations emitted.
    pub ops_emitted: u64,
}

/// The lowered program handed to code generation.
#[derive(Debug)]
pub struct LowProgram {
    /// Operations in program order.
    pub ops: Vec<LowOp>,
    /// Pass counters.
    pub stats: LowerStats,
}

/// The lowering pass driver.
pub struct LowerPass;

impl LowerPass {
    /// Lower every live node of a mid-level graph, in program order.
    ///
    /// Lowering a graph twice is a fatal fault; so is lowering before the
    /// pipeline has let virtualization converge, which the pipeline
    /// enforces by running this pass last.
    pub fn run(
        graph: &mut Graph,
        words: &WordFactory,
        authority: &dyn LoweringAuthority,
    ) -> LowProgram {
        assert_eq!(
            graph.phase(),
            GraphPhase::Mid,
            "lowering an already-lowered graph"
        );

        let live: Vec<NodeId> = graph.live_ids().collect();
        let mut cx = LowerContext::new(graph, words);
        let mut ops = Vec::new();
        let mut stats = LowerStats::default();

        for id in live {
            let handler = kind_handlers(cx.graph().node(id).tag()).lower;
            handler(&mut cx, authority, id, &mut ops);
            stats.nodes_lowered += 1;
        }

        stats.ops_emitted = ops.len() as u64;
        graph.seal_lowered();
        LowProgram { ops, stats }
    }
}

// =============================================================================
// Tests
// =============================================================================
