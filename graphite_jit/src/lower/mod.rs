//! Lowering of surviving mid-level nodes to platform-level operations.
//!
//! - **Ops** (`ops.rs`): the platform-level operation vocabulary
//! - **Authority** (`authority.rs`): the swappable per-target delegate that
//!   owns monitor-acquisition sequences
//! - **Pass** (`pass.rs`): the driver dispatching each kind through the
//!   registration table

pub mod authority;
pub mod ops;
pub mod pass;

pub use authority::{InlineCasLowering, LoweringAuthority, RuntimeCallLowering};
pub use ops::{LowLabel, LowOp, RuntimeStub, VReg};
pub use pass::{LowProgram, LowerContext, LowerPass, LowerStats};
