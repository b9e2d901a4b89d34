//! Execution seam between governance and the components it controls.

use crate::types::ProposalCall;
use lucid_types::Height;

/// Applies the target calls of executed proposals.
///
/// Governance validates every call of a proposal before executing any of
/// them. Executed calls are staged: they take effect together on `commit`
/// and are dropped together on `rollback`, so a proposal is applied in full
/// or not at all.
pub trait TimelockExecutor {
    /// Check that `call` names a known operation with well-formed arguments.
    fn validate_call(&self, call: &ProposalCall) -> anyhow::Result<()>;

    /// Stage `call` at height `now`, on top of the calls staged before it.
    fn execute_call(&mut self, call: &ProposalCall, now: Height) -> anyhow::Result<()>;

    /// Apply every staged call. On error nothing is applied.
    fn commit(&mut self, _now: Height) -> anyhow::Result<()> {
        Ok(())
    }

    /// Drop every staged call.
    fn rollback(&mut self) {}
}

/// Executor for deployments where proposals may only change governance itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTargets;

impl TimelockExecutor for NoTargets {
    fn validate_call(&self, call: &ProposalCall) -> anyhow::Result<()> {
        anyhow::bail!("no executor registered for {}", call.selector())
    }

    fn execute_call(&mut self, call: &ProposalCall, _now: Height) -> anyhow::Result<()> {
        anyhow::bail!("no executor registered for {}", call.selector())
    }
}
