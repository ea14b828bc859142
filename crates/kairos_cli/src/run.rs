//! `kairos run`: the synthesize/rebalance loop with clock-period sweeping.
//!
//! Each attempt at a clock period backs up the design sources, then
//! alternates between the external synthesis/STA command and one
//! rebalancing iteration until the selected corner meets timing, a kill
//! condition fires, or the iteration budget runs out.

use std::path::Path;
use std::process;

use kairos_common::ClockPeriod;
use kairos_config::ResolvedFlow;
use kairos_netlist::Netlist;
use kairos_patch::SourceBackup;
use kairos_rebalance::{run_iteration, ConvergenceTracker, Design, KillReason, Rebalancer};
use kairos_timing::StaMetrics;
use tracing::{debug, info, warn};

use crate::pipeline::{load_flow, log_paths, read_reports, rebalancer_for, relative, source_writer};
use crate::{GlobalArgs, RunArgs};

/// How one clock-period attempt ended.
#[derive(Debug, Clone, PartialEq)]
enum AttemptEnd {
    /// The corner met timing after this many synthesis runs.
    Closed { iterations: u32 },
    /// A kill condition fired.
    Killed(KillReason),
    /// The iteration budget ran out.
    Exhausted,
}

/// Runs the run command.
///
/// Returns 0 once timing closes and 1 if it cannot be closed.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut flow = load_flow(global)?;
    if let Some(ref period) = args.clock_period {
        flow.clock_period = period.parse()?;
    }
    if let Some(max) = args.max_iterations {
        flow.max_iterations = max.max(1);
    }
    if let Some(policy) = args.policy {
        flow.policy = policy.into();
    }
    flow.increase_clock |= args.increase_clock;

    sweep(&flow, global.quiet)
}

/// Runs attempts at increasing clock periods until one closes timing.
fn sweep(flow: &ResolvedFlow, quiet: bool) -> Result<i32, Box<dyn std::error::Error>> {
    let (mut rebalancer, mut tracker) = rebalancer_for(flow);
    let mut period = flow.clock_period;

    loop {
        info!(%period, mhz = period.mhz(), "starting attempt");
        match attempt(flow, period, &mut rebalancer, &mut tracker)? {
            AttemptEnd::Closed { iterations } => {
                if !quiet {
                    println!(
                        "timing closed at {period} ({:.1} MHz) after {iterations} iterations",
                        period.mhz()
                    );
                }
                return Ok(0);
            }
            AttemptEnd::Killed(reason) => {
                warn!(%period, %reason, "attempt abandoned");
                match next_period(flow, period) {
                    Some(next) => {
                        info!(from = %period, to = %next, "increasing clock period");
                        period = next;
                    }
                    None => {
                        eprintln!("{reason}");
                        eprintln!(
                            "cannot close timing at this period ({period}); the design needs \
                             a structural change or a longer clock period"
                        );
                        return Ok(1);
                    }
                }
            }
            AttemptEnd::Exhausted => {
                eprintln!(
                    "iteration budget of {} exhausted at {period}; sources restored",
                    flow.max_iterations
                );
                return Ok(1);
            }
        }
    }
}

/// The period to retry at after an abandoned attempt, if sweeping allows it.
fn next_period(flow: &ResolvedFlow, current: ClockPeriod) -> Option<ClockPeriod> {
    if !flow.increase_clock {
        return None;
    }
    let next = current + flow.period_step;
    match flow.max_clock_period {
        Some(max) if next > max => None,
        _ => Some(next),
    }
}

/// One attempt at `period`. Sources are restored unless timing closes.
fn attempt(
    flow: &ResolvedFlow,
    period: ClockPeriod,
    rebalancer: &mut Rebalancer,
    tracker: &mut ConvergenceTracker,
) -> Result<AttemptEnd, Box<dyn std::error::Error>> {
    let backup = SourceBackup::take(&flow.sources)?;
    tracker.reset();

    match iterate(flow, period, rebalancer, tracker) {
        Ok(end @ AttemptEnd::Closed { .. }) => {
            backup.discard()?;
            Ok(end)
        }
        Ok(end) => {
            backup.restore()?;
            Ok(end)
        }
        Err(e) => {
            if let Err(restore) = backup.restore() {
                warn!(error = %restore, "failed to restore design sources");
            }
            Err(e)
        }
    }
}

/// Up to `max_iterations` synthesize/rebalance rounds.
///
/// Ends the run on a failed synthesis command, unreadable artifacts, or
/// reports with no paths. A netlist lookup failure only costs the iteration.
fn iterate(
    flow: &ResolvedFlow,
    period: ClockPeriod,
    rebalancer: &mut Rebalancer,
    tracker: &mut ConvergenceTracker,
) -> Result<AttemptEnd, Box<dyn std::error::Error>> {
    let mut writer = source_writer(flow);

    for iteration in 1..=flow.max_iterations {
        synthesize(flow, period, iteration)?;

        let metrics_text = std::fs::read_to_string(&flow.metrics).map_err(|e| {
            format!("cannot read metrics {}: {e}", relative(&flow.metrics, &flow.project_dir))
        })?;
        let corner = StaMetrics::from_json(&metrics_text)?.corner(&flow.corner)?;
        debug!(
            iteration,
            setup_ws = ?corner.setup_ws(),
            hold_ws = ?corner.hold_ws(),
            "corner metrics"
        );
        if !corner.violated() {
            return Ok(AttemptEnd::Closed { iterations: iteration });
        }

        let reports = read_reports(&flow.reports)?;
        let netlist = Netlist::load(&flow.netlist)?;
        let design = Design {
            netlist: &netlist,
            top: &flow.top,
            names: &flow.netlist_names,
        };

        match run_iteration(&reports, design, rebalancer, tracker, &mut writer) {
            Ok(report) => {
                log_paths(&report.paths);
                if let Some(ref reason) = report.kill {
                    return Ok(AttemptEnd::Killed(reason.clone()));
                }
                info!(
                    iteration,
                    violated = report.violated(),
                    changes = report.changes().count(),
                    "iteration complete"
                );
            }
            Err(e) if e.ends_run() => return Err(e.into()),
            Err(e) => {
                warn!(iteration, error = %e, "netlist lookup failed, resynthesizing");
            }
        }
    }

    Ok(AttemptEnd::Exhausted)
}

/// Runs the external synthesis/STA command from the project directory.
fn synthesize(
    flow: &ResolvedFlow,
    period: ClockPeriod,
    iteration: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let command = flow
        .synth_command
        .as_deref()
        .ok_or("flow.synth_command is required for `kairos run`")?;
    debug!(command, iteration, "running synthesis");

    let status = shell(command, &flow.project_dir)
        .env("KAIROS_CLOCK_PERIOD_NS", period.ns().to_string())
        .env("KAIROS_ITERATION", iteration.to_string())
        .env("KAIROS_RUN_DIR", &flow.run_dir)
        .status()
        .map_err(|e| format!("failed to launch `{command}`: {e}"))?;
    if !status.success() {
        return Err(format!("`{command}` failed with {status}").into());
    }
    Ok(())
}

fn shell(command: &str, dir: &Path) -> process::Command {
    let mut cmd = process::Command::new("sh");
    cmd.arg("-c").arg(command).current_dir(dir);
    cmd
}
