//! Shared helpers for CLI commands.
//!
//! Project root resolution, flow loading, report reading, and the path
//! table printed by `inspect`, `step`, and `run`.

use std::path::{Path, PathBuf};

use kairos_config::{find_project_root, load_config, resolve_flow, ResolvedFlow};
use kairos_patch::{MaskExpression, SourceMaskWriter};
use kairos_rebalance::{ConvergenceTracker, Rebalancer};
use kairos_timing::ResolvedPath;
use tracing::info;

use crate::GlobalArgs;

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory looking for `kairos.toml`.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(p.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")))
        } else {
            Ok(p)
        }
    } else {
        Ok(find_project_root(&std::env::current_dir()?)?)
    }
}

/// Loads `kairos.toml` and resolves it against the project directory.
pub fn load_flow(global: &GlobalArgs) -> Result<ResolvedFlow, Box<dyn std::error::Error>> {
    let root = resolve_project_root(global)?;
    let config = load_config(&root)?;
    Ok(resolve_flow(&config, &root)?)
}

/// Reads every report file into memory.
pub fn read_reports(paths: &[PathBuf]) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    paths
        .iter()
        .map(|p| {
            std::fs::read_to_string(p).map_err(|e| -> Box<dyn std::error::Error> {
                format!("cannot read report {}: {e}", p.display()).into()
            })
        })
        .collect()
}

/// Builds a rebalancer and a fresh tracker for `flow`.
pub fn rebalancer_for(flow: &ResolvedFlow) -> (Rebalancer, ConvergenceTracker) {
    (
        Rebalancer::new(flow.policy, flow.seed),
        ConvergenceTracker::new(flow.kill_threshold, flow.slack_precision),
    )
}

/// Source writer over the flow's patchable design sources; libraries are
/// only consulted to explain a module that cannot be patched.
pub fn source_writer(flow: &ResolvedFlow) -> SourceMaskWriter {
    SourceMaskWriter::new(
        flow.sources.clone(),
        MaskExpression::new(&flow.mask_param, &flow.id_param),
    )
    .with_libraries(flow.libraries.clone())
}

/// Formats the deduplicated path table, worst slack first.
pub fn path_table(paths: &[ResolvedPath]) -> String {
    let mut rows: Vec<&ResolvedPath> = paths.iter().collect();
    rows.sort_by(|a, b| a.sort_slack().total_cmp(&b.sort_slack()));

    let mut out = format!("{:>10}  {:<40}  {}\n", "slack", "startpoint", "endpoint");
    for p in rows {
        let slack = match p.slack {
            Some(s) => format!("{s:.3}"),
            None => "?".to_string(),
        };
        let mark = if p.violated { " (VIOLATED)" } else { "" };
        out.push_str(&format!(
            "{slack:>10}  {:<40}  {}{mark}\n",
            p.start.to_string(),
            p.end
        ));
    }
    out
}

/// Logs the path table at `info`, one line per path.
pub fn log_paths(paths: &[ResolvedPath]) {
    info!(count = paths.len(), "all register paths");
    for line in path_table(paths).lines().skip(1) {
        info!("{line}");
    }
}

/// Displays `path` relative to `base` where possible.
pub fn relative(path: &Path, base: &Path) -> String {
    kairos_patch::display_path(path, base).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_timing::{InstanceRef, StageRef};

    fn reg(instance: &str, stage: usize) -> InstanceRef {
        InstanceRef::PipelineRegister(StageRef {
            module: "mod".to_string(),
            instance: instance.to_string(),
            stage,
        })
    }

    #[test]
    fn config_file_resolves_to_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("kairos.toml");
        std::fs::write(&file, "").unwrap();
        let global = GlobalArgs {
            quiet: false,
            verbose: 0,
            config: Some(file.to_string_lossy().into_owned()),
        };
        assert_eq!(resolve_project_root(&global).unwrap(), dir.path());
    }

    #[test]
    fn config_directory_is_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let global = GlobalArgs {
            quiet: false,
            verbose: 0,
            config: Some(dir.path().to_string_lossy().into_owned()),
        };
        assert_eq!(resolve_project_root(&global).unwrap(), dir.path());
    }

    #[test]
    fn table_is_sorted_worst_first() {
        let paths = vec![
            ResolvedPath {
                start: reg("a", 1),
                end: reg("b", 0),
                slack: Some(0.25),
                violated: false,
            },
            ResolvedPath {
                start: InstanceRef::PrimaryInput,
                end: reg("a", 2),
                slack: Some(-0.1),
                violated: true,
            },
            ResolvedPath {
                start: reg("b", 3),
                end: InstanceRef::PrimaryOutput,
                slack: None,
                violated: false,
            },
        ];
        let table = path_table(&paths);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("INPUT") && lines[1].ends_with("(VIOLATED)"));
        assert!(lines[1].trim_start().starts_with("-0.100"));
        assert!(lines[2].contains("mod:a[1]"));
        assert!(lines[3].trim_start().starts_with('?'));
        assert!(lines[3].ends_with("OUTPUT"));
    }

    #[test]
    fn missing_report_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_reports(&[dir.path().join("max.rpt")]).unwrap_err();
        assert!(err.to_string().contains("max.rpt"));
    }
}
