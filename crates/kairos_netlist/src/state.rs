//! Reading the current pipeline mask of an instance from the netlist.

use crate::error::NetlistError;
use crate::netlist::{parse_param, Cell, Netlist, NetlistModule};
use kairos_common::PipelineMask;
use kairos_config::NetlistConfig;
use std::collections::BTreeMap;
use tracing::debug;

const STAGE_MARKER: &str = "_pipeline_stage";

/// The synthesized pipeline configuration of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceState {
    /// Instance name under the top module.
    pub instance: String,
    /// Netlist module the instance elaborates to.
    pub module: String,
    /// Datapath width.
    pub data_width: u64,
    /// Key used when patching the mask into design sources.
    pub instance_id: u64,
    /// Value of the enabled-stage count parameter.
    pub enabled_stages: u64,
    /// Current mask, highest stage first.
    pub mask: PipelineMask,
}

impl InstanceState {
    /// Total number of candidate stages.
    pub fn stage_count(&self) -> usize {
        self.mask.len()
    }
}

/// Reads `instance`'s parameters and stage-enable tie-offs.
///
/// The instance is looked up under `top`; its module must carry the width,
/// id and enabled-count parameters named in `names`, and its sub-cells named
/// `..._pipeline_stage[k]...` with an enable type supply bit `k` of the mask.
pub fn read_instance_state(
    netlist: &Netlist,
    instance: &str,
    top: &str,
    names: &NetlistConfig,
) -> Result<InstanceState, NetlistError> {
    let cell = netlist.find_cell(top, instance)?;
    let module_name = cell.cell_type.as_str();
    let module = netlist.module(module_name)?;

    let data_width = param(cell, module, module_name, &names.width_param)?;
    let instance_id = param(cell, module, module_name, &names.id_param)?;
    let enabled_stages = param(cell, module, module_name, &names.enabled_param)?;
    let mask = read_mask(module, module_name, &names.enable_cell)?;

    debug!(
        instance,
        module = module_name,
        instance_id,
        mask = %mask,
        "read instance state"
    );

    Ok(InstanceState {
        instance: instance.to_string(),
        module: module_name.to_string(),
        data_width,
        instance_id,
        enabled_stages,
        mask,
    })
}

/// Instance override first, then the module's elaborated default.
fn param(cell: &Cell, module: &NetlistModule, module_name: &str, name: &str) -> Result<u64, NetlistError> {
    let value = cell
        .parameters
        .get(name)
        .or_else(|| module.parameter_default_values.get(name))
        .ok_or_else(|| NetlistError::MissingParameter {
            module: module_name.to_string(),
            param: name.to_string(),
        })?;
    parse_param(value).ok_or_else(|| NetlistError::InvalidParameter {
        module: module_name.to_string(),
        param: name.to_string(),
        value: value.to_string(),
    })
}

fn read_mask(module: &NetlistModule, module_name: &str, enable_cell: &str) -> Result<PipelineMask, NetlistError> {
    let malformed = |reason: String| NetlistError::MalformedMask {
        module: module_name.to_string(),
        reason,
    };

    let mut stages: BTreeMap<usize, bool> = BTreeMap::new();
    for (name, cell) in &module.cells {
        if !cell.cell_type.contains(enable_cell) {
            continue;
        }
        let Some(stage) = stage_index(name) else {
            continue;
        };
        let bit = match cell.cell_type.chars().last() {
            Some('1') => true,
            Some('0') => false,
            _ => {
                return Err(malformed(format!(
                    "enable cell '{name}' has no constant value in type '{}'",
                    cell.cell_type
                )))
            }
        };
        if let Some(previous) = stages.insert(stage, bit) {
            if previous != bit {
                return Err(malformed(format!("stage {stage} is tied both on and off")));
            }
        }
    }

    let count = match stages.keys().next_back() {
        Some(&highest) => highest + 1,
        None => return Err(malformed("no stage enable cells".to_string())),
    };
    if stages.len() != count {
        let missing = (0..count).find(|s| !stages.contains_key(s)).unwrap_or(0);
        return Err(malformed(format!("stage {missing} has no enable cell")));
    }

    // stages iterate lowest first; masks are written highest first
    let bits: Vec<bool> = stages.values().rev().copied().collect();
    PipelineMask::from_bits(bits).map_err(|e| malformed(e.to_string()))
}

/// Extracts `k` from a cell name containing `_pipeline_stage[k]`.
fn stage_index(name: &str) -> Option<usize> {
    let name: String = name.chars().filter(|c| *c != '\\').collect();
    let after = &name[name.find(STAGE_MARKER)? + STAGE_MARKER.len()..];
    let open = after.find('[')?;
    let close = after[open..].find(']')? + open;
    after[open + 1..close].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn netlist(mask_types: &[(&str, &str)], params: &str) -> Netlist {
        let cells: Vec<String> = mask_types
            .iter()
            .map(|(name, ty)| format!(r#""{name}": {{ "type": "{ty}" }}"#))
            .collect();
        Netlist::from_json(&format!(
            r#"{{ "modules": {{
                "top": {{ "cells": {{ "reg_a": {{ "type": "$paramod\\mod\\INSTANCE_ID=3" }} }} }},
                "$paramod\\mod\\INSTANCE_ID=3": {{
                    "parameter_default_values": {{ {params} }},
                    "cells": {{ {} }}
                }}
            }} }}"#,
            cells.join(",")
        ))
        .unwrap()
    }

    const PARAMS: &str =
        r#""DATAWIDTH": "00001000", "INSTANCE_ID": "00000011", "NUM_PIPELINE_STAGES": "101""#;

    fn five_stages(active: usize) -> Vec<(String, String)> {
        (0..5)
            .map(|k| {
                (
                    format!("mod_pipeline_stage[{k}].en"),
                    format!("STAGE_ENABLE_{}", u8::from(k == active)),
                )
            })
            .collect()
    }

    fn build(active: usize) -> Netlist {
        let owned = five_stages(active);
        let cells: Vec<(&str, &str)> = owned.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        netlist(&cells, PARAMS)
    }

    #[test]
    fn reads_mask_highest_first() {
        let state = read_instance_state(&build(2), "reg_a", "top", &NetlistConfig::default()).unwrap();
        assert_eq!(state.mask.to_string(), "00100");
        assert_eq!(state.instance_id, 3);
        assert_eq!(state.data_width, 8);
        assert_eq!(state.enabled_stages, 5);
        assert_eq!(state.stage_count(), 5);
        assert_eq!(state.module, "$paramod\\mod\\INSTANCE_ID=3");
    }

    #[test]
    fn stage_zero_is_last_position() {
        let state = read_instance_state(&build(0), "reg_a", "top", &NetlistConfig::default()).unwrap();
        assert_eq!(state.mask.to_string(), "00001");
    }

    #[test]
    fn missing_parameter_is_lookup_error() {
        let n = netlist(&[("mod_pipeline_stage[0]", "ENABLE_1")], r#""DATAWIDTH": "1""#);
        let err = read_instance_state(&n, "reg_a", "top", &NetlistConfig::default()).unwrap_err();
        assert!(matches!(err, NetlistError::MissingParameter { ref param, .. } if param == "INSTANCE_ID"));
        assert!(err.is_lookup());
    }

    #[test]
    fn unknown_instance_is_lookup_error() {
        let err = read_instance_state(&build(1), "reg_b", "top", &NetlistConfig::default()).unwrap_err();
        assert!(err.is_lookup());
    }

    #[test]
    fn two_active_stages_is_malformed() {
        let n = netlist(
            &[("m_pipeline_stage[0]", "ENABLE_1"), ("m_pipeline_stage[1]", "ENABLE_1")],
            PARAMS,
        );
        let err = read_instance_state(&n, "reg_a", "top", &NetlistConfig::default()).unwrap_err();
        assert!(matches!(err, NetlistError::MalformedMask { .. }));
        assert!(!err.is_lookup());
    }

    #[test]
    fn gap_in_stages_is_malformed() {
        let n = netlist(
            &[("m_pipeline_stage[0]", "ENABLE_1"), ("m_pipeline_stage[2]", "ENABLE_0")],
            PARAMS,
        );
        let err = read_instance_state(&n, "reg_a", "top", &NetlistConfig::default()).unwrap_err();
        assert!(matches!(err, NetlistError::MalformedMask { ref reason, .. } if reason.contains("stage 1")));
    }

    #[test]
    fn non_enable_cells_are_ignored() {
        let n = netlist(
            &[
                ("m_pipeline_stage[0]", "ENABLE_0"),
                ("m_pipeline_stage[1]", "ENABLE_1"),
                ("m_pipeline_stage[1].q", "DFF_P"),
                ("adder", "$add"),
            ],
            PARAMS,
        );
        let state = read_instance_state(&n, "reg_a", "top", &NetlistConfig::default()).unwrap();
        assert_eq!(state.mask.to_string(), "10");
    }

    #[test]
    fn custom_parameter_names() {
        let n = netlist(
            &[("m_pipeline_stage[0]", "TIE_1")],
            r#""W": "1", "KEY": "111", "N": "1""#,
        );
        let names = NetlistConfig {
            width_param: "W".to_string(),
            id_param: "KEY".to_string(),
            enabled_param: "N".to_string(),
            enable_cell: "TIE".to_string(),
        };
        let state = read_instance_state(&n, "reg_a", "top", &names).unwrap();
        assert_eq!(state.instance_id, 7);
        assert_eq!(state.mask.to_string(), "1");
    }

    #[test]
    fn stage_index_parsing() {
        assert_eq!(stage_index("mod_pipeline_stage[4]"), Some(4));
        assert_eq!(stage_index(r"\mod_pipeline_stage\[12\].en"), Some(12));
        assert_eq!(stage_index("mod_pipeline_stage"), None);
        assert_eq!(stage_index("other[1]"), None);
    }
}
