//! `kairos step`: one rebalancing iteration on existing STA artifacts.

use std::path::PathBuf;

use kairos_netlist::Netlist;
use kairos_patch::{MaskSink, RecordingSink};
use kairos_rebalance::{run_iteration, Design, Outcome};
use tracing::info;

use crate::pipeline::{load_flow, log_paths, read_reports, rebalancer_for, relative, source_writer};
use crate::{GlobalArgs, StepArgs};

/// Runs the step command.
///
/// Returns 0 when the iteration ran to completion and 2 when a kill
/// condition was met (no sources were patched).
pub fn run(args: &StepArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let mut flow = load_flow(global)?;
    if let Some(policy) = args.policy {
        flow.policy = policy.into();
    }

    let report_paths: Vec<PathBuf> = if args.reports.is_empty() {
        flow.reports.clone()
    } else {
        args.reports.iter().map(PathBuf::from).collect()
    };
    let netlist_path = args
        .netlist
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| flow.netlist.clone());

    let reports = read_reports(&report_paths)?;
    let netlist = Netlist::load(&netlist_path)?;
    info!(
        netlist = %relative(&netlist_path, &flow.project_dir),
        reports = reports.len(),
        "loaded STA artifacts"
    );

    let (mut rebalancer, mut tracker) = rebalancer_for(&flow);
    let mut writer = source_writer(&flow);
    let mut recorder = RecordingSink::default();
    let sink: &mut dyn MaskSink = if args.dry_run {
        &mut recorder
    } else {
        &mut writer
    };

    let design = Design {
        netlist: &netlist,
        top: &flow.top,
        names: &flow.netlist_names,
    };
    let report = run_iteration(&reports, design, &mut rebalancer, &mut tracker, sink)?;
    log_paths(&report.paths);

    if let Some(ref reason) = report.kill {
        eprintln!("kill condition met: {reason}");
        eprintln!("cannot close timing at this period; a structural change is needed");
        return Ok(2);
    }

    if !global.quiet {
        for decision in &report.decisions {
            match decision.outcome {
                Outcome::Shifted { ref change, .. } => println!(
                    "{}: {} -> {} (stage {} {})",
                    change.instance, change.old, change.new, change.stage, change.direction
                ),
                Outcome::Deferred { ref instance } => println!(
                    "{} -> {}: deferred, {instance} already moved",
                    decision.start, decision.end
                ),
                Outcome::Infeasible { ref attempts } => println!(
                    "{} -> {}: no legal shift ({} tried)",
                    decision.start,
                    decision.end,
                    attempts.len()
                ),
                Outcome::WriteFailed {
                    ref change,
                    ref reason,
                } => println!("{}: {} not written: {reason}", change.instance, change.new),
                Outcome::NotActionable => {}
            }
        }
        let changed = report.changes().count();
        if args.dry_run {
            println!("{changed} mask changes (dry run, nothing written)");
        } else {
            println!("{changed} mask changes written");
        }
    }

    Ok(0)
}
