//! One rebalancing iteration, from STA reports to patched sources.

use crate::check::structural_kill;
use crate::error::RebalanceError;
use crate::rebalancer::{Decision, MaskChange, Outcome, Rebalancer, StateMap};
use crate::tracker::{ConvergenceTracker, KillReason, Observation};
use kairos_config::NetlistConfig;
use kairos_netlist::{read_instance_state, Netlist, NetlistError};
use kairos_patch::{MaskSink, MaskWrite};
use kairos_timing::{deduplicate, parse_reports, resolve_paths, ResolvedPath};
use tracing::{info, warn};

/// The synthesized design an iteration reads instance state from.
#[derive(Debug, Clone, Copy)]
pub struct Design<'a> {
    /// Parsed netlist.
    pub netlist: &'a Netlist,
    /// Top module name.
    pub top: &'a str,
    /// Netlist naming conventions.
    pub names: &'a NetlistConfig,
}

/// Everything one iteration saw and did.
#[derive(Debug, Clone)]
pub struct IterationReport {
    /// Deduplicated paths, in report order.
    pub paths: Vec<ResolvedPath>,
    /// States of every register instance on those paths.
    pub states: StateMap,
    /// Convergence verdict on this path set.
    pub observation: Observation,
    /// Set if the attempt should be abandoned.
    pub kill: Option<KillReason>,
    /// Per-path decisions; empty when killed.
    pub decisions: Vec<Decision>,
}

impl IterationReport {
    /// Changes committed to the sink.
    pub fn changes(&self) -> impl Iterator<Item = &MaskChange> {
        self.decisions.iter().filter_map(Decision::change)
    }

    /// Number of violated paths.
    pub fn violated(&self) -> usize {
        self.paths.iter().filter(|p| p.violated).count()
    }
}

/// Reads the state of every register instance on `paths`.
///
/// Only lookup failures are returned. An instance whose parameters or
/// tie-offs cannot be interpreted is left out of the map, so paths through
/// it are not acted on.
pub fn load_states(paths: &[ResolvedPath], design: Design<'_>) -> Result<StateMap, NetlistError> {
    let mut states = StateMap::new();
    for stage in paths
        .iter()
        .flat_map(|p| [&p.start, &p.end])
        .filter_map(|r| r.stage_ref())
    {
        if states.contains_key(&stage.instance) {
            continue;
        }
        match read_instance_state(design.netlist, &stage.instance, design.top, design.names) {
            Ok(state) => {
                states.insert(stage.instance.clone(), state);
            }
            Err(e) if e.is_lookup() => return Err(e),
            Err(error) => warn!(instance = %stage.instance, %error, "skipping instance"),
        }
    }
    Ok(states)
}

/// Runs one iteration: parse the reports, read instance state, check for a
/// kill condition, decide, and write every committed change to `sink`.
///
/// Netlist lookup failures are returned as errors and leave the tracker's
/// iteration count untouched; the caller resynthesizes and retries. A write
/// the sink refuses turns that decision into [`Outcome::WriteFailed`] and
/// the remaining changes are still written.
pub fn run_iteration<S: AsRef<str>>(
    reports: &[S],
    design: Design<'_>,
    rebalancer: &mut Rebalancer,
    tracker: &mut ConvergenceTracker,
    sink: &mut dyn MaskSink,
) -> Result<IterationReport, RebalanceError> {
    let raw = parse_reports(reports)?;
    let paths = deduplicate(resolve_paths(&raw));
    let states = load_states(&paths, design)?;

    let observation = tracker.observe(&paths);
    if let Some(reason) = structural_kill(&paths, &states) {
        warn!(%reason, "kill condition met");
        tracker.kill(reason);
    }
    if let Some(reason) = tracker.kill_reason() {
        return Ok(IterationReport {
            paths,
            states,
            observation,
            kill: Some(reason.clone()),
            decisions: Vec::new(),
        });
    }

    let mut decisions = rebalancer.rebalance(&paths, &states, tracker);
    for decision in &mut decisions {
        let Some(change) = decision.change() else {
            continue;
        };
        let write = MaskWrite::new(
            &change.module,
            &change.instance,
            change.instance_id,
            change.new.clone(),
        );
        if let Err(error) = sink.write_mask(&write) {
            warn!(instance = %change.instance, %error, "failed to write pipeline mask");
            decision.outcome = Outcome::WriteFailed {
                change: change.clone(),
                reason: error.to_string(),
            };
            continue;
        }
        info!(
            instance = %change.instance,
            instance_id = change.instance_id,
            old = %change.old,
            new = %change.new,
            "pipeline mask changed"
        );
    }

    Ok(IterationReport {
        paths,
        states,
        observation,
        kill: None,
        decisions,
    })
}
