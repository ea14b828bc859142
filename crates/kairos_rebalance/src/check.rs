//! Structural kill check.
//!
//! A primary input should only ever reach the enabled stage nearest the
//! input, and a primary output should only be driven from the enabled stage
//! nearest the output. A reported path that contradicts the instance's mask
//! means stage moves alone cannot fix the design.

use crate::rebalancer::StateMap;
use crate::tracker::KillReason;
use kairos_timing::{InstanceRef, ResolvedPath};

/// Returns the first path that violates the port-to-register structure.
pub fn structural_kill(paths: &[ResolvedPath], states: &StateMap) -> Option<KillReason> {
    paths.iter().find_map(|path| match (&path.start, &path.end) {
        (InstanceRef::PrimaryInput, InstanceRef::PipelineRegister(end)) => {
            let state = states.get(&end.instance)?;
            state
                .mask
                .any_enabled_below(end.stage)
                .then(|| KillReason::InputRegisterNotClosest {
                    instance: end.instance.clone(),
                    stage: end.stage,
                })
        }
        (InstanceRef::PipelineRegister(start), InstanceRef::PrimaryOutput) => {
            let state = states.get(&start.instance)?;
            state
                .mask
                .any_enabled_above(start.stage)
                .then(|| KillReason::RegisterOutputNotClosest {
                    instance: start.instance.clone(),
                    stage: start.stage,
                })
        }
        _ => None,
    })
}
