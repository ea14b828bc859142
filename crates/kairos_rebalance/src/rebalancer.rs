//! The mask rebalancing heuristic.
//!
//! Violated paths are visited worst-slack first. Each one is fixed by moving
//! one stage across the violated boundary:
//!
//! - input to register: the register's stage moves toward the source, so the
//!   input reaches an earlier register;
//! - register to output: the register's stage moves toward the sink;
//! - register to register: one side moves, chosen by [`SideSelector`], and
//!   the other side is tried if the first move is impossible.
//!
//! At most one change is committed per instance per pass. A later path that
//! touches an instance already changed in this pass is deferred; the next
//! synthesis run will show whether it still needs work.

use crate::policy::{is_port, ChoiceBasis, Side, SideSelector};
use crate::tracker::ConvergenceTracker;
use kairos_common::{PipelineMask, ShiftDirection, ShiftError};
use kairos_config::SidePolicy;
use kairos_netlist::InstanceState;
use kairos_timing::{InstanceRef, ResolvedPath, StageRef};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Current instance states keyed by instance name.
pub type StateMap = HashMap<String, InstanceState>;

/// A committed mask change for one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskChange {
    /// Instance name.
    pub instance: String,
    /// Netlist module of the instance.
    pub module: String,
    /// Key used when patching sources.
    pub instance_id: u64,
    /// The stage that moved.
    pub stage: usize,
    /// Which way it moved.
    pub direction: ShiftDirection,
    /// Mask before the change.
    pub old: PipelineMask,
    /// Mask after the change.
    pub new: PipelineMask,
}

/// A shift that could not be made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedShift {
    /// Instance that was asked to move.
    pub instance: String,
    /// Why it could not.
    pub error: ShiftError,
}

/// What happened to one violated path.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A mask change was committed.
    Shifted {
        /// The change.
        change: MaskChange,
        /// How a register-to-register side was chosen.
        basis: Option<ChoiceBasis>,
    },
    /// An instance on the path already changed this pass.
    Deferred {
        /// The instance that blocked the change.
        instance: String,
    },
    /// No legal shift on either side; left for a later pass.
    Infeasible {
        /// Every shift that was tried.
        attempts: Vec<FailedShift>,
    },
    /// The path has no register to move, or its state is unknown.
    NotActionable,
    /// A change was decided but the sink refused it; the source is unchanged.
    WriteFailed {
        /// The change that was not written.
        change: MaskChange,
        /// Sink error text.
        reason: String,
    },
}

/// One rebalancing decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Path start.
    pub start: InstanceRef,
    /// Path end.
    pub end: InstanceRef,
    /// Path slack.
    pub slack: Option<f64>,
    /// Result.
    pub outcome: Outcome,
}

impl Decision {
    /// The committed change, if any.
    pub fn change(&self) -> Option<&MaskChange> {
        match &self.outcome {
            Outcome::Shifted { change, .. } => Some(change),
            _ => None,
        }
    }
}

/// Runs one rebalancing pass over a deduplicated path set.
#[derive(Debug, Clone)]
pub struct Rebalancer {
    selector: SideSelector,
}

impl Rebalancer {
    /// Creates a rebalancer with the given side policy.
    pub fn new(policy: SidePolicy, seed: Option<u64>) -> Self {
        Self {
            selector: SideSelector::new(policy, seed),
        }
    }

    /// The configured side policy.
    pub fn policy(&self) -> SidePolicy {
        self.selector.policy()
    }

    /// Decides on every violated path in `paths`, worst slack first.
    ///
    /// `states` must hold the current state of every register instance in
    /// `paths`. Register pairs acted on are recorded in `tracker`.
    pub fn rebalance(
        &mut self,
        paths: &[ResolvedPath],
        states: &StateMap,
        tracker: &mut ConvergenceTracker,
    ) -> Vec<Decision> {
        let mut violated: Vec<&ResolvedPath> = paths.iter().filter(|p| p.violated).collect();
        violated.sort_by(|a, b| a.sort_slack().total_cmp(&b.sort_slack()));

        let mut changed: HashSet<String> = HashSet::new();
        let mut decisions = Vec::with_capacity(violated.len());

        for path in violated {
            let outcome = match blocking_instance(path, &changed) {
                Some(instance) => {
                    debug!(%instance, "already changed this pass, deferring");
                    Outcome::Deferred { instance }
                }
                None => self.decide(path, paths, states, tracker),
            };
            if let Outcome::Shifted { change, .. } = &outcome {
                changed.insert(change.instance.clone());
            }
            decisions.push(Decision {
                start: path.start.clone(),
                end: path.end.clone(),
                slack: path.slack,
                outcome,
            });
        }

        decisions
    }

    fn decide(
        &mut self,
        path: &ResolvedPath,
        all: &[ResolvedPath],
        states: &StateMap,
        tracker: &mut ConvergenceTracker,
    ) -> Outcome {
        match (&path.start, &path.end) {
            (InstanceRef::PrimaryInput, InstanceRef::PipelineRegister(end)) => {
                single_shift(end, ShiftDirection::TowardSource, states)
            }
            (InstanceRef::PipelineRegister(start), InstanceRef::PrimaryOutput) => {
                single_shift(start, ShiftDirection::TowardSink, states)
            }
            (InstanceRef::PipelineRegister(start), InstanceRef::PipelineRegister(end)) => {
                let (first, basis) = self.selector.first_side(path, all, tracker);
                tracker.record_attempt(&path.start, &path.end);

                let mut attempts = Vec::new();
                for side in [first, first.other()] {
                    let (target, direction) = match side {
                        Side::Start => (start, ShiftDirection::TowardSink),
                        Side::End => (end, ShiftDirection::TowardSource),
                    };
                    match try_shift(target, direction, states) {
                        Some(Ok(change)) => {
                            return Outcome::Shifted {
                                change,
                                basis: Some(basis),
                            }
                        }
                        Some(Err(failed)) => {
                            debug!(
                                instance = %failed.instance,
                                error = %failed.error,
                                "shift failed, trying the other side"
                            );
                            attempts.push(failed);
                        }
                        None => return Outcome::NotActionable,
                    }
                }
                warn!(start = %path.start, end = %path.end, "no legal shift on either side");
                Outcome::Infeasible { attempts }
            }
            (start, end) => {
                if is_port(start) && is_port(end) {
                    debug!(%start, %end, "port-to-port path, nothing to move");
                }
                Outcome::NotActionable
            }
        }
    }
}

fn single_shift(target: &StageRef, direction: ShiftDirection, states: &StateMap) -> Outcome {
    match try_shift(target, direction, states) {
        Some(Ok(change)) => Outcome::Shifted {
            change,
            basis: None,
        },
        Some(Err(failed)) => {
            warn!(
                instance = %failed.instance,
                error = %failed.error,
                "unable to shift pipeline stage"
            );
            Outcome::Infeasible {
                attempts: vec![failed],
            }
        }
        None => Outcome::NotActionable,
    }
}

/// `None` if there is no state for the target instance.
fn try_shift(
    target: &StageRef,
    direction: ShiftDirection,
    states: &StateMap,
) -> Option<Result<MaskChange, FailedShift>> {
    let Some(state) = states.get(&target.instance) else {
        warn!(instance = %target.instance, "no netlist state for instance");
        return None;
    };
    Some(
        state
            .mask
            .shift(target.stage, direction)
            .map(|new| MaskChange {
                instance: state.instance.clone(),
                module: state.module.clone(),
                instance_id: state.instance_id,
                stage: target.stage,
                direction,
                old: state.mask.clone(),
                new,
            })
            .map_err(|error| FailedShift {
                instance: target.instance.clone(),
                error,
            }),
    )
}

fn blocking_instance(path: &ResolvedPath, changed: &HashSet<String>) -> Option<String> {
    [&path.start, &path.end]
        .into_iter()
        .filter_map(InstanceRef::stage_ref)
        .find(|s| changed.contains(&s.instance))
        .map(|s| s.instance.clone())
}
