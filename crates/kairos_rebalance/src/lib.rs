//! Timing-driven pipeline stage rebalancing.
//!
//! Given the violated paths of a synthesized design, moves each affected
//! instance's single enabled pipeline stage one position across the violated
//! boundary, trading latency between adjacent stages until timing closes or
//! the search is found to be cycling.
//!
//! # Usage
//!
//! ```ignore
//! use kairos_rebalance::{run_iteration, ConvergenceTracker, Design, Rebalancer};
//!
//! let mut rebalancer = Rebalancer::new(flow.policy, flow.seed);
//! let mut tracker = ConvergenceTracker::new(flow.kill_threshold, flow.slack_precision);
//! let design = Design { netlist: &netlist, top: &flow.top, names: &flow.netlist_names };
//! let report = run_iteration(&reports, design, &mut rebalancer, &mut tracker, &mut writer)?;
//! if let Some(reason) = report.kill {
//!     eprintln!("cannot close timing at this period: {reason}");
//! }
//! ```
//!
//! # Architecture
//!
//! - [`tracker`]: per-attempt telemetry and cycle detection
//! - [`policy`]: which end of a register-to-register path moves first
//! - [`rebalancer`]: the worst-first shift pass
//! - [`check`]: structural kill conditions
//! - [`engine`]: one iteration end to end

#![warn(missing_docs)]

pub mod check;
pub mod engine;
pub mod error;
pub mod policy;
pub mod rebalancer;
pub mod tracker;

pub use check::structural_kill;
pub use engine::{load_states, run_iteration, Design, IterationReport};
pub use error::RebalanceError;
pub use policy::{neighbour_slacks, ChoiceBasis, Side, SideSelector};
pub use rebalancer::{Decision, FailedShift, MaskChange, Outcome, Rebalancer, StateMap};
pub use tracker::{path_set_hash, ConvergenceTracker, KillReason, Observation};
