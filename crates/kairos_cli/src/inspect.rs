//! `kairos inspect`: print the deduplicated paths of STA reports together
//! with the current mask of every instance they touch.

use std::path::PathBuf;

use kairos_config::NetlistConfig;
use kairos_netlist::{InstanceState, Netlist};
use kairos_rebalance::{load_states, structural_kill, Design, StateMap};
use kairos_timing::{deduplicate, parse_reports, resolve_paths, PathCheck, StaMetrics, TimingPath};

use crate::pipeline::{load_flow, path_table, read_reports};
use crate::{GlobalArgs, InspectArgs};

/// Runs the inspect command. Returns 0 on success.
pub fn run(args: &InspectArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let (top, names) = match args.top {
        Some(ref top) => (top.clone(), NetlistConfig::default()),
        None => {
            let flow = load_flow(global)?;
            (flow.top, flow.netlist_names)
        }
    };

    let report_paths: Vec<PathBuf> = args.reports.iter().map(PathBuf::from).collect();
    let reports = read_reports(&report_paths)?;
    let netlist = Netlist::load(&PathBuf::from(&args.netlist))?;
    let metrics = match args.metrics {
        Some(ref path) => Some(StaMetrics::from_json(&std::fs::read_to_string(path)?)?),
        None => None,
    };

    let raw = parse_reports(&reports)?;
    let paths = deduplicate(resolve_paths(&raw));
    let design = Design {
        netlist: &netlist,
        top: &top,
        names: &names,
    };
    let states = load_states(&paths, design)?;

    if global.quiet {
        return Ok(0);
    }

    print!("{}", path_table(&paths));
    if !states.is_empty() {
        println!();
        print!("{}", instance_table(&states));
    }
    if let Some(ref metrics) = metrics {
        println!();
        print!("{}", metrics_summary(metrics));
    }

    let violated = paths.iter().filter(|p| p.violated).count();
    println!();
    println!("{} paths, {violated} violated ({})", paths.len(), check_counts(&raw));
    if let Some(reason) = structural_kill(&paths, &states) {
        println!("structural problem: {reason}");
    }

    Ok(0)
}

/// One row per instance, sorted by name.
fn instance_table(states: &StateMap) -> String {
    let mut instances: Vec<&InstanceState> = states.values().collect();
    instances.sort_by(|a, b| a.instance.cmp(&b.instance));

    let mut out = format!(
        "{:<24}  {:<24}  {:>4}  {:>5}  {:>7}  mask\n",
        "instance", "module", "id", "width", "enabled"
    );
    for s in instances {
        out.push_str(&format!(
            "{:<24}  {:<24}  {:>4}  {:>5}  {:>7}  {}\n",
            s.instance, s.module, s.instance_id, s.data_width, s.enabled_stages, s.mask
        ));
    }
    out
}

/// Worst slacks per corner, then the global metrics.
fn metrics_summary(metrics: &StaMetrics) -> String {
    let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |s| format!("{s:.3}"));

    let mut out = format!("{:<24}  {:>10}  {:>10}\n", "corner", "setup ws", "hold ws");
    for name in metrics.corners() {
        let Ok(corner) = metrics.corner(&name) else {
            continue;
        };
        let mark = if corner.violated() { "  (VIOLATED)" } else { "" };
        out.push_str(&format!(
            "{name:<24}  {:>10}  {:>10}{mark}\n",
            fmt(corner.setup_ws()),
            fmt(corner.hold_ws())
        ));
    }
    for (key, value) in metrics.global() {
        out.push_str(&format!("{key} = {value}\n"));
    }
    out
}

/// e.g. `3 setup, 1 hold` over the raw report paths.
fn check_counts(raw: &[TimingPath]) -> String {
    let count = |check| raw.iter().filter(|p| p.check == Some(check)).count();
    let unknown = raw.iter().filter(|p| p.check.is_none()).count();
    let mut out = format!(
        "{} setup, {} hold",
        count(PathCheck::Setup),
        count(PathCheck::Hold)
    );
    if unknown > 0 {
        out.push_str(&format!(", {unknown} unlabelled"));
    }
    out
}
