//! Configuration file discovery, loading, and validation.

use crate::error::ConfigError;
use crate::types::KairosConfig;
use std::path::{Path, PathBuf};

/// File name of the project configuration.
pub const CONFIG_FILE_NAME: &str = "kairos.toml";

/// Loads and validates a `kairos.toml` configuration from a project directory.
pub fn load_config(project_dir: &Path) -> Result<KairosConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE_NAME);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `kairos.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<KairosConfig, ConfigError> {
    let config: KairosConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Walks up from `start` looking for the nearest directory containing `kairos.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE_NAME).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ConfigError::NotFound(start.display().to_string()));
        }
    }
}

fn validate_config(config: &KairosConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.top.is_empty() {
        return Err(ConfigError::MissingField("project.top".to_string()));
    }
    if config.design.sources.is_empty() {
        return Err(ConfigError::MissingField("design.sources".to_string()));
    }
    if config.flow.max_iterations == 0 {
        return Err(ConfigError::ValidationError(
            "flow.max_iterations must be at least 1".to_string(),
        ));
    }
    if let Some(max) = config.flow.max_clock_period {
        if max < config.flow.clock_period {
            return Err(ConfigError::ValidationError(format!(
                "flow.max_clock_period ({max}) is below flow.clock_period ({})",
                config.flow.clock_period
            )));
        }
    }
    if config.flow.reports.is_empty() {
        return Err(ConfigError::MissingField("flow.reports".to_string()));
    }
    if config.rebalance.kill_threshold == 0 {
        return Err(ConfigError::ValidationError(
            "rebalance.kill_threshold must be at least 1".to_string(),
        ));
    }
    if config.rebalance.slack_precision > 9 {
        return Err(ConfigError::ValidationError(
            "rebalance.slack_precision must be at most 9".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SidePolicy;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "mult_addertree"
top = "top_mult_addertree"

[design]
sources = ["rtl/array_multiplier.sv"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "mult_addertree");
        assert_eq!(config.project.top, "top_mult_addertree");
        assert_eq!(config.design.sources, vec!["rtl/array_multiplier.sv"]);
        assert!(config.design.libraries.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "mult_addertree"
top = "top_mult_addertree"
description = "multiplier feeding an adder tree"

[design]
sources = ["rtl/array_multiplier.sv", "rtl/AdderTree.sv", "rtl/top.sv"]
libraries = ["lib/pipeline_stage.sv"]

[flow]
clock_period = "4.7ns"
period_step = "0.2ns"
max_clock_period = "8ns"
max_iterations = 20
increase_clock = true
corner = "nom_tt_025C_1v80"
run_dir = "runs/latest"
synth_command = "make sta"
netlist = "netlist.json"
metrics = "metrics.json"
reports = ["{corner}/max.rpt"]

[rebalance]
policy = "no_slack_assumption"
kill_threshold = 3
slack_precision = 2
seed = 7
mask_param = "STAGE_MASK"
id_param = "ID"

[netlist]
width_param = "WIDTH"
id_param = "ID"
enabled_param = "STAGES"
enable_cell = "TIE"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.design.sources.len(), 3);
        assert_eq!(config.flow.max_iterations, 20);
        assert!(config.flow.increase_clock);
        assert_eq!(config.flow.synth_command.as_deref(), Some("make sta"));
        assert_eq!(config.flow.max_clock_period.map(|p| p.ns()), Some(8.0));
        assert_eq!(config.rebalance.policy, SidePolicy::NoSlackAssumption);
        assert_eq!(config.rebalance.kill_threshold, 3);
        assert_eq!(config.rebalance.seed, Some(7));
        assert_eq!(config.rebalance.mask_param, "STAGE_MASK");
        assert_eq!(config.netlist.enable_cell, "TIE");
    }

    #[test]
    fn missing_top_errors() {
        let toml = r#"
[project]
name = "test"
top = ""

[design]
sources = ["a.sv"]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn missing_sources_errors() {
        let toml = r#"
[project]
name = "test"
top = "top"

[design]
sources = []
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "design.sources"));
    }

    #[test]
    fn zero_kill_threshold_errors() {
        let toml = r#"
[project]
name = "test"
top = "top"

[design]
sources = ["a.sv"]

[rebalance]
kill_threshold = 0
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn max_period_below_start_errors() {
        let toml = r#"
[project]
name = "test"
top = "top"

[design]
sources = ["a.sv"]

[flow]
clock_period = "5ns"
max_clock_period = "4ns"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let toml = "this is not valid toml {{{}}}";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn find_root_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "").unwrap();
        let nested = dir.path().join("rtl").join("sub");
        std::fs::create_dir_all(&nested).unwrap();
        let root = find_project_root(&nested).unwrap();
        assert_eq!(root, dir.path());
    }

    #[test]
    fn find_root_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_project_root(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
