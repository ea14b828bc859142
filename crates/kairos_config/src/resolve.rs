//! Flow resolution: turning a parsed config into absolute artifact paths.

use crate::error::ConfigError;
use crate::types::{KairosConfig, NetlistConfig, SidePolicy};
use kairos_common::ClockPeriod;
use std::path::{Path, PathBuf};

/// A fully resolved flow with every path made absolute against the project
/// directory and `{corner}` substituted in report paths.
#[derive(Debug, Clone)]
pub struct ResolvedFlow {
    /// The project directory containing `kairos.toml`.
    pub project_dir: PathBuf,
    /// Top module name in the netlist.
    pub top: String,
    /// Patchable design sources.
    pub sources: Vec<PathBuf>,
    /// Read-only library sources.
    pub libraries: Vec<PathBuf>,
    /// Directory the external flow writes into.
    pub run_dir: PathBuf,
    /// Structural netlist JSON.
    pub netlist: PathBuf,
    /// Consolidated STA metrics JSON.
    pub metrics: PathBuf,
    /// STA report files for the selected corner.
    pub reports: Vec<PathBuf>,
    /// Selected STA corner.
    pub corner: String,
    /// External synthesis/STA command, if any.
    pub synth_command: Option<String>,
    /// Starting clock period.
    pub clock_period: ClockPeriod,
    /// Sweep increment.
    pub period_step: ClockPeriod,
    /// Sweep upper bound.
    pub max_clock_period: Option<ClockPeriod>,
    /// Iteration budget per attempt.
    pub max_iterations: u32,
    /// Whether to sweep the period on non-convergence.
    pub increase_clock: bool,
    /// Side-selection policy.
    pub policy: SidePolicy,
    /// Convergence kill threshold.
    pub kill_threshold: u32,
    /// Slack rounding used for path-set hashing.
    pub slack_precision: u32,
    /// Random tie-break seed.
    pub seed: Option<u64>,
    /// Mask `localparam` name in design sources.
    pub mask_param: String,
    /// Key parameter name in design sources.
    pub id_param: String,
    /// Netlist naming conventions.
    pub netlist_names: NetlistConfig,
}

/// Resolves `config` against `project_dir`.
///
/// Relative paths in `[design]` are taken from the project directory; relative
/// artifact paths in `[flow]` are taken from the run directory.
pub fn resolve_flow(config: &KairosConfig, project_dir: &Path) -> Result<ResolvedFlow, ConfigError> {
    let anchor = |p: &str| {
        let path = PathBuf::from(p);
        if path.is_absolute() {
            path
        } else {
            project_dir.join(path)
        }
    };

    let flow = &config.flow;
    let run_dir = anchor(&flow.run_dir);
    let in_run = |p: &str| {
        let path = PathBuf::from(p.replace("{corner}", &flow.corner));
        if path.is_absolute() {
            path
        } else {
            run_dir.join(path)
        }
    };

    if flow.corner.is_empty() {
        return Err(ConfigError::MissingField("flow.corner".to_string()));
    }

    Ok(ResolvedFlow {
        project_dir: project_dir.to_path_buf(),
        top: config.project.top.clone(),
        sources: config.design.sources.iter().map(|s| anchor(s)).collect(),
        libraries: config.design.libraries.iter().map(|s| anchor(s)).collect(),
        netlist: in_run(&flow.netlist),
        metrics: in_run(&flow.metrics),
        reports: flow.reports.iter().map(|r| in_run(r)).collect(),
        run_dir,
        corner: flow.corner.clone(),
        synth_command: flow.synth_command.clone(),
        clock_period: flow.clock_period,
        period_step: flow.period_step,
        max_clock_period: flow.max_clock_period,
        max_iterations: flow.max_iterations,
        increase_clock: flow.increase_clock,
        policy: config.rebalance.policy,
        kill_threshold: config.rebalance.kill_threshold,
        slack_precision: config.rebalance.slack_precision,
        seed: config.rebalance.seed,
        mask_param: config.rebalance.mask_param.clone(),
        id_param: config.rebalance.id_param.clone(),
        netlist_names: config.netlist.clone(),
    })
}
