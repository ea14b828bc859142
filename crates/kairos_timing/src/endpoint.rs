//! Resolution of raw path endpoint names to pipeline-stage instances.
//!
//! Pipeline registers follow a fixed naming convention in the synthesized
//! design: `<instance-path><sep><module>_pipeline_stage[<N>]`, where the
//! separator is `.` or `/` (tried in that order) and `N` is the 0-based stage
//! index counted from the source of the datapath. Anything else is either a
//! primary port sentinel or a register the rebalancer does not track.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Startpoint name used for every primary input.
pub const INPUT_SENTINEL: &str = "INPUT";

/// Endpoint name used for every primary output.
pub const OUTPUT_SENTINEL: &str = "OUTPUT";

/// Marker between the module name and the stage index.
const STAGE_MARKER: &str = "_pipeline_stage[";

/// Whether a name is the launching or capturing end of a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndpointRole {
    /// Path startpoint.
    Start,
    /// Path endpoint.
    End,
}

/// A specific stage of a specific pipelined instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageRef {
    /// Module (cell type) name.
    pub module: String,
    /// Hierarchical instance name within the top module.
    pub instance: String,
    /// 0-based stage index, 0 = nearest the source.
    pub stage: usize,
}

impl fmt::Display for StageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}[{}]", self.module, self.instance, self.stage)
    }
}

/// What a path endpoint name refers to.
///
/// Equality and hashing cover the full value, so two pipeline registers are
/// the same key only if module, instance, and stage all match.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstanceRef {
    /// A primary input of the top module.
    PrimaryInput,
    /// A primary output of the top module.
    PrimaryOutput,
    /// A register belonging to a tracked pipeline stage.
    PipelineRegister(StageRef),
    /// A register outside the naming convention; not actionable.
    UnresolvedRegister,
}

impl InstanceRef {
    /// Resolves a raw signal-path string seen in the given role.
    pub fn resolve(raw: &str, role: EndpointRole) -> Self {
        if let Some(stage_ref) = match_stage_name(raw) {
            return InstanceRef::PipelineRegister(stage_ref);
        }
        match role {
            EndpointRole::Start if raw == INPUT_SENTINEL => InstanceRef::PrimaryInput,
            EndpointRole::End if raw == OUTPUT_SENTINEL => InstanceRef::PrimaryOutput,
            _ => InstanceRef::UnresolvedRegister,
        }
    }

    /// Returns the stage reference for a pipeline register.
    pub fn stage_ref(&self) -> Option<&StageRef> {
        match self {
            InstanceRef::PipelineRegister(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `false` for registers the rebalancer cannot act on.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, InstanceRef::UnresolvedRegister)
    }

    /// Canonical text key used when hashing path sets.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceRef::PrimaryInput => f.write_str(INPUT_SENTINEL),
            InstanceRef::PrimaryOutput => f.write_str(OUTPUT_SENTINEL),
            InstanceRef::PipelineRegister(s) => write!(f, "{s}"),
            InstanceRef::UnresolvedRegister => f.write_str("REGISTER"),
        }
    }
}

/// Matches the first `<instance><sep><module>_pipeline_stage[<N>]` segment.
///
/// Backslash escapes (`\[`, `\]`) are removed first, and anything after the
/// closing bracket (a pin name such as `/D`) is ignored.
fn match_stage_name(raw: &str) -> Option<StageRef> {
    let name: String = raw.chars().filter(|c| *c != '\\').collect();

    let mut search_from = 0;
    while let Some(found) = name[search_from..].find(STAGE_MARKER) {
        let marker = search_from + found;
        search_from = marker + STAGE_MARKER.len();

        let digits_start = marker + STAGE_MARKER.len();
        let Some(close) = name[digits_start..].find(']') else {
            continue;
        };
        let Ok(stage) = name[digits_start..digits_start + close].parse::<usize>() else {
            continue;
        };

        let prefix = &name[..marker];
        if let Some(stage_ref) = split_instance(prefix, '.', stage)
            .or_else(|| split_instance(prefix, '/', stage))
        {
            return Some(stage_ref);
        }
    }
    None
}

fn split_instance(prefix: &str, sep: char, stage: usize) -> Option<StageRef> {
    let (instance, module) = prefix.rsplit_once(sep)?;
    if instance.is_empty() || module.is_empty() || module.contains('.') {
        return None;
    }
    Some(StageRef {
        module: module.to_string(),
        instance: instance.to_string(),
        stage,
    })
}
