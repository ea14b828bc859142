//! Collapsing physically duplicated timing paths.
//!
//! A wide datapath produces one reported path per bit between the same two
//! pipeline stages. The rebalancer only cares about the logical pair, so all
//! paths sharing `(start, end)` collapse into their worst-slack member.

use crate::endpoint::{EndpointRole, InstanceRef};
use crate::report::TimingPath;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A timing path with both ends resolved to [`InstanceRef`]s.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPath {
    /// Resolved startpoint.
    pub start: InstanceRef,
    /// Resolved endpoint.
    pub end: InstanceRef,
    /// Slack; `None` if the report's slack line was unparsable.
    pub slack: Option<f64>,
    /// Whether this path (or any path merged into it) violates timing.
    pub violated: bool,
}

impl ResolvedPath {
    /// Resolves both ends of a parsed path.
    pub fn from_timing_path(path: &TimingPath) -> Self {
        Self {
            start: InstanceRef::resolve(&path.startpoint, EndpointRole::Start),
            end: InstanceRef::resolve(&path.endpoint, EndpointRole::End),
            slack: path.slack,
            violated: path.violated,
        }
    }

    /// Slack for ordering, with unknown slack sorting after every known value.
    pub fn sort_slack(&self) -> f64 {
        self.slack.unwrap_or(f64::INFINITY)
    }
}

/// Resolves every parsed path, preserving order.
pub fn resolve_paths(paths: &[TimingPath]) -> Vec<ResolvedPath> {
    paths.iter().map(ResolvedPath::from_timing_path).collect()
}

/// Groups paths by `(start, end)` and keeps the minimum-slack member of each
/// group, OR-ing `violated` across the group.
///
/// Paths with an [`InstanceRef::UnresolvedRegister`] end are dropped. The
/// output is in first-occurrence order of each group.
pub fn deduplicate<I>(paths: I) -> Vec<ResolvedPath>
where
    I: IntoIterator<Item = ResolvedPath>,
{
    let mut out: Vec<ResolvedPath> = Vec::new();
    let mut index: HashMap<(InstanceRef, InstanceRef), usize> = HashMap::new();

    for path in paths {
        if !path.start.is_actionable() || !path.end.is_actionable() {
            continue;
        }
        let key = (path.start.clone(), path.end.clone());
        match index.get(&key) {
            Some(&i) => {
                let best = &mut out[i];
                let violated = best.violated || path.violated;
                if path.sort_slack() < best.sort_slack() {
                    *best = path;
                }
                best.violated = violated;
            }
            None => {
                index.insert(key, out.len());
                out.push(path);
            }
        }
    }

    out
}
