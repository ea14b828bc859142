//! Error types for a rebalancing iteration.

use kairos_netlist::NetlistError;
use kairos_timing::TimingError;

/// Errors that abort a rebalancing iteration.
///
/// Conditions that only stall progress on a single path (an infeasible
/// shift, a deferred or refused write) are reported as decision outcomes,
/// not errors.
#[derive(Debug, thiserror::Error)]
pub enum RebalanceError {
    /// The STA reports could not be turned into paths.
    #[error(transparent)]
    Timing(#[from] TimingError),

    /// The netlist lacks something the reports refer to.
    #[error(transparent)]
    Netlist(#[from] NetlistError),
}

impl RebalanceError {
    /// Returns `true` if the error clears after resynthesizing the design.
    pub fn is_lookup(&self) -> bool {
        matches!(self, RebalanceError::Netlist(e) if e.is_lookup())
    }

    /// Returns `true` if resynthesizing cannot help: no report held a path.
    pub fn ends_run(&self) -> bool {
        matches!(self, RebalanceError::Timing(_))
    }
}
