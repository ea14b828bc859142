//! Configuration types deserialized from `kairos.toml`.

use kairos_common::ClockPeriod;
use serde::Deserialize;

/// The top-level project configuration parsed from `kairos.toml`.
#[derive(Debug, Deserialize)]
pub struct KairosConfig {
    /// Core project metadata (name, top module).
    pub project: ProjectMeta,
    /// Design source files.
    pub design: DesignConfig,
    /// External synthesis/STA flow and clock-period sweep settings.
    #[serde(default)]
    pub flow: FlowConfig,
    /// Rebalancing heuristic settings.
    #[serde(default)]
    pub rebalance: RebalanceConfig,
    /// Netlist naming conventions for stage-enable tie-offs.
    #[serde(default)]
    pub netlist: NetlistConfig,
}

/// Core project metadata required in every `kairos.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// Name of the top module in the synthesized netlist.
    pub top: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
}

/// The design files the rebalancer may read and patch.
#[derive(Debug, Deserialize)]
pub struct DesignConfig {
    /// Source files holding the per-design mask-selection expressions.
    /// These are backed up and patched.
    pub sources: Vec<String>,
    /// Library files passed to synthesis but never patched.
    #[serde(default)]
    pub libraries: Vec<String>,
}

/// Settings for the outer synthesis/STA loop.
#[derive(Debug, Deserialize)]
pub struct FlowConfig {
    /// Starting clock period.
    #[serde(default = "default_clock_period")]
    pub clock_period: ClockPeriod,
    /// Amount added to the period each time an attempt is abandoned.
    #[serde(default = "default_period_step")]
    pub period_step: ClockPeriod,
    /// Upper bound on the swept period.
    #[serde(default)]
    pub max_clock_period: Option<ClockPeriod>,
    /// Iteration budget per clock-period attempt.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Whether to sweep the clock period when an attempt stops converging.
    #[serde(default)]
    pub increase_clock: bool,
    /// STA corner whose metrics and reports drive rebalancing.
    #[serde(default = "default_corner")]
    pub corner: String,
    /// Directory the external flow writes its artifacts into.
    #[serde(default = "default_run_dir")]
    pub run_dir: String,
    /// Shell command that synthesizes the design and runs STA.
    #[serde(default)]
    pub synth_command: Option<String>,
    /// Structural netlist JSON, relative to `run_dir`.
    #[serde(default = "default_netlist")]
    pub netlist: String,
    /// Consolidated STA metrics JSON, relative to `run_dir`.
    #[serde(default = "default_metrics")]
    pub metrics: String,
    /// STA report files, relative to `run_dir`. `{corner}` is substituted.
    #[serde(default = "default_reports")]
    pub reports: Vec<String>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            clock_period: default_clock_period(),
            period_step: default_period_step(),
            max_clock_period: None,
            max_iterations: default_max_iterations(),
            increase_clock: false,
            corner: default_corner(),
            run_dir: default_run_dir(),
            synth_command: None,
            netlist: default_netlist(),
            metrics: default_metrics(),
            reports: default_reports(),
        }
    }
}

fn default_clock_period() -> ClockPeriod {
    ClockPeriod::from_ns(10.0)
}

fn default_period_step() -> ClockPeriod {
    ClockPeriod::from_ns(0.2)
}

fn default_max_iterations() -> u32 {
    50
}

fn default_corner() -> String {
    "nom_ss_100C_1v60".to_string()
}

fn default_run_dir() -> String {
    "openlane_run".to_string()
}

fn default_netlist() -> String {
    "raw_netlist.json".to_string()
}

fn default_metrics() -> String {
    "state_out.json".to_string()
}

fn default_reports() -> Vec<String> {
    vec!["{corner}/max.rpt".to_string(), "{corner}/min.rpt".to_string()]
}

/// How the rebalancer picks which side of a register-to-register path to shift.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SidePolicy {
    /// Shift the side whose neighbouring path has the larger slack (default).
    #[default]
    SlackComparison,
    /// Always try the startpoint first, falling back to the endpoint.
    NoSlackAssumption,
    /// Pick a side uniformly at random. Also used automatically for pairs
    /// that were already attempted without closing the violation.
    RandomTiebreak,
}

/// Rebalancing heuristic and source-patching settings.
#[derive(Debug, Deserialize)]
pub struct RebalanceConfig {
    /// Side-selection policy for register-to-register paths.
    #[serde(default)]
    pub policy: SidePolicy,
    /// Number of recurrences of the same path set that raises the kill flag.
    #[serde(default = "default_kill_threshold")]
    pub kill_threshold: u32,
    /// Decimal places slack is rounded to before hashing a path set.
    #[serde(default = "default_slack_precision")]
    pub slack_precision: u32,
    /// Seed for the random tie-break. Unseeded runs draw from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Name of the `localparam` holding the per-instance mask selection.
    #[serde(default = "default_mask_param")]
    pub mask_param: String,
    /// Name of the parameter the mask selection is keyed on.
    #[serde(default = "default_id_param")]
    pub id_param: String,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            policy: SidePolicy::default(),
            kill_threshold: default_kill_threshold(),
            slack_precision: default_slack_precision(),
            seed: None,
            mask_param: default_mask_param(),
            id_param: default_id_param(),
        }
    }
}

fn default_kill_threshold() -> u32 {
    5
}

fn default_slack_precision() -> u32 {
    3
}

fn default_mask_param() -> String {
    "PIPELINE_STAGE_MASK".to_string()
}

fn default_id_param() -> String {
    "INSTANCE_ID".to_string()
}

/// Parameter and cell naming used when reading masks back from the netlist.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NetlistConfig {
    /// Data width parameter name.
    #[serde(default = "default_width_param")]
    pub width_param: String,
    /// Instance id parameter name.
    #[serde(default = "default_id_param")]
    pub id_param: String,
    /// Enabled-stage count parameter name.
    #[serde(default = "default_enabled_param")]
    pub enabled_param: String,
    /// Substring identifying a stage-enable tie-off cell type.
    #[serde(default = "default_enable_cell")]
    pub enable_cell: String,
}

impl Default for NetlistConfig {
    fn default() -> Self {
        Self {
            width_param: default_width_param(),
            id_param: default_id_param(),
            enabled_param: default_enabled_param(),
            enable_cell: default_enable_cell(),
        }
    }
}

fn default_width_param() -> String {
    "DATAWIDTH".to_string()
}

fn default_enabled_param() -> String {
    "NUM_PIPELINE_STAGES".to_string()
}

fn default_enable_cell() -> String {
    "ENABLE".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    const MINIMAL: &str = r#"
[project]
name = "mult"
top = "top_mult"

[design]
sources = ["rtl/mult.sv"]
"#;

    #[test]
    fn side_policy_all_variants() {
        for (input, expected) in [
            ("slack_comparison", SidePolicy::SlackComparison),
            ("no_slack_assumption", SidePolicy::NoSlackAssumption),
            ("random_tiebreak", SidePolicy::RandomTiebreak),
        ] {
            let toml = format!("{MINIMAL}\n[rebalance]\npolicy = \"{input}\"\n");
            let config = load_config_from_str(&toml).unwrap();
            assert_eq!(config.rebalance.policy, expected);
        }
    }

    #[test]
    fn unknown_policy_rejected() {
        let toml = format!("{MINIMAL}\n[rebalance]\npolicy = \"coin_flip\"\n");
        assert!(load_config_from_str(&toml).is_err());
    }

    #[test]
    fn flow_defaults() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.flow.clock_period.ns(), 10.0);
        assert_eq!(config.flow.period_step.ns(), 0.2);
        assert_eq!(config.flow.max_iterations, 50);
        assert!(!config.flow.increase_clock);
        assert_eq!(config.flow.corner, "nom_ss_100C_1v60");
        assert_eq!(config.flow.reports.len(), 2);
        assert!(config.flow.synth_command.is_none());
    }

    #[test]
    fn clock_period_number_or_string() {
        let a = format!("{MINIMAL}\n[flow]\nclock_period = 4.7\n");
        let b = format!("{MINIMAL}\n[flow]\nclock_period = \"4700ps\"\n");
        let a = load_config_from_str(&a).unwrap();
        let b = load_config_from_str(&b).unwrap();
        assert!((a.flow.clock_period.ns() - b.flow.clock_period.ns()).abs() < 1e-9);
    }

    #[test]
    fn netlist_defaults() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.netlist, NetlistConfig::default());
        assert_eq!(config.netlist.enable_cell, "ENABLE");
        assert_eq!(config.rebalance.mask_param, "PIPELINE_STAGE_MASK");
    }
}
