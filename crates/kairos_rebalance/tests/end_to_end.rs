use kairos_config::{NetlistConfig, SidePolicy};
use kairos_netlist::Netlist;
use kairos_patch::{MaskExpression, SourceMaskWriter};
use kairos_rebalance::{
    run_iteration, ConvergenceTracker, Design, KillReason, Observation, Rebalancer,
};
use kairos_timing::{InstanceRef, StageRef};
use std::fs;
use std::path::Path;

const MAX_RPT: &str = r#"
===========================================================================
report_checks -path_delay max (Setup)
============================================================================
Startpoint: din[3] (input port clocked by clk)
Endpoint: reg_a.mod_pipeline_stage[2]
          (rising edge-triggered flip-flop clocked by clk)
Path Group: clk
Path Type: max

Fanout     Cap    Slew   Delay    Time   Description
-----------------------------------------------------------------------------
                  0.00    0.00    0.00   clock clk (rise edge)
                          1.00    1.00 ^ input external delay
                                  4.25   data arrival time
                                  4.20   data required time
-----------------------------------------------------------------------------
                                 -0.05   slack (VIOLATED)
"#;

const MOD_SV: &str = "module mod #(
    parameter INSTANCE_ID = 0,
    parameter NUM_PIPELINE_STAGES = 1
) (
    input  logic clk,
    input  logic [7:0] d,
    output logic [7:0] q
);
    localparam PIPELINE_STAGE_MASK = 5'b00001;
endmodule
";

fn netlist_json(instance: &str, module: &str, id: &str, active: &[usize]) -> String {
    let cells: Vec<String> = (0..5)
        .map(|k| {
            format!(
                r#""{module}_pipeline_stage[{k}].u_en": {{ "type": "STAGE_ENABLE_{}" }}"#,
                u8::from(active.contains(&k))
            )
        })
        .collect();
    format!(
        r#"{{
  "creator": "Yosys 0.38",
  "modules": {{
    "top": {{ "cells": {{ "{instance}": {{ "type": "{module}" }} }} }},
    "{module}": {{
      "parameter_default_values": {{
        "DATAWIDTH": "00000000000000000000000000001000",
        "INSTANCE_ID": "{id}",
        "NUM_PIPELINE_STAGES": "00000000000000000000000000000101"
      }},
      "cells": {{ {} }}
    }}
  }}
}}"#,
        cells.join(",\n        ")
    )
}

fn setup(dir: &Path, netlist: &str) -> (Netlist, SourceMaskWriter, std::path::PathBuf) {
    let src = dir.join("mod.sv");
    fs::write(&src, MOD_SV).unwrap();
    let netlist_path = dir.join("raw_netlist.json");
    fs::write(&netlist_path, netlist).unwrap();
    let netlist = Netlist::load(&netlist_path).unwrap();
    let writer = SourceMaskWriter::new(vec![src.clone()], MaskExpression::default());
    (netlist, writer, src)
}

#[test]
fn input_violation_moves_stage_toward_source() {
    let dir = tempfile::tempdir().unwrap();
    let (netlist, mut writer, src) = setup(
        dir.path(),
        &netlist_json("reg_a", "mod", "00000000000000000000000000000100", &[2]),
    );
    let names = NetlistConfig::default();
    let design = Design {
        netlist: &netlist,
        top: "top",
        names: &names,
    };
    let mut rebalancer = Rebalancer::new(SidePolicy::SlackComparison, Some(3));
    let mut tracker = ConvergenceTracker::new(5, 3);

    let report = run_iteration(&[MAX_RPT], design, &mut rebalancer, &mut tracker, &mut writer).unwrap();

    assert_eq!(report.paths.len(), 1);
    assert_eq!(report.paths[0].start, InstanceRef::PrimaryInput);
    assert_eq!(
        report.paths[0].end,
        InstanceRef::PipelineRegister(StageRef {
            module: "mod".to_string(),
            instance: "reg_a".to_string(),
            stage: 2,
        })
    );
    assert_eq!(report.states["reg_a"].mask.to_string(), "00100");

    let changes: Vec<_> = report.changes().collect();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].old.to_string(), "00100");
    assert_eq!(changes[0].new.to_string(), "00010");

    let patched = fs::read_to_string(&src).unwrap();
    assert!(patched.contains(
        "localparam PIPELINE_STAGE_MASK = (INSTANCE_ID == 4) ? 5'b00010 : 5'b00001;"
    ));
    assert_eq!(
        writer.read_mask("mod", 4).unwrap(),
        Some("00010".parse().unwrap())
    );
}

#[test]
fn unchanged_path_set_kills_on_fifth_recurrence() {
    // both registers sit at the ends of their masks, so no shift is possible
    // and every iteration sees the same path set
    let rpt = "Startpoint: reg_a.mod_pipeline_stage[4] (rising edge-triggered flip-flop)
Endpoint: reg_b.mod_pipeline_stage[0] (rising edge-triggered flip-flop)
Path Type: max
  -0.30   slack (VIOLATED)
";
    let json = r#"{
  "modules": {
    "top": { "cells": {
      "reg_a": { "type": "mod_a" },
      "reg_b": { "type": "mod_b" }
    } },
    "mod_a": {
      "parameter_default_values": { "DATAWIDTH": "1000", "INSTANCE_ID": "1", "NUM_PIPELINE_STAGES": "1" },
      "cells": {
        "mod_pipeline_stage[0].en": { "type": "ENABLE_0" },
        "mod_pipeline_stage[1].en": { "type": "ENABLE_0" },
        "mod_pipeline_stage[2].en": { "type": "ENABLE_0" },
        "mod_pipeline_stage[3].en": { "type": "ENABLE_0" },
        "mod_pipeline_stage[4].en": { "type": "ENABLE_1" }
      }
    },
    "mod_b": {
      "parameter_default_values": { "DATAWIDTH": "1000", "INSTANCE_ID": "10", "NUM_PIPELINE_STAGES": "1" },
      "cells": {
        "mod_pipeline_stage[0].en": { "type": "ENABLE_1" },
        "mod_pipeline_stage[1].en": { "type": "ENABLE_0" }
      }
    }
  }
}"#;
    let dir = tempfile::tempdir().unwrap();
    let (netlist, mut writer, src) = setup(dir.path(), json);
    let names = NetlistConfig::default();
    let design = Design {
        netlist: &netlist,
        top: "top",
        names: &names,
    };
    let mut rebalancer = Rebalancer::new(SidePolicy::NoSlackAssumption, None);
    let mut tracker = ConvergenceTracker::new(5, 3);

    let first = run_iteration(&[rpt], design, &mut rebalancer, &mut tracker, &mut writer).unwrap();
    assert_eq!(first.observation, Observation::New);
    assert_eq!(first.changes().count(), 0);

    for recurrence in 1..5 {
        let report = run_iteration(&[rpt], design, &mut rebalancer, &mut tracker, &mut writer).unwrap();
        assert_eq!(report.observation, Observation::Repeat(recurrence));
        assert!(report.kill.is_none(), "killed at recurrence {recurrence}");
    }

    let fifth = run_iteration(&[rpt], design, &mut rebalancer, &mut tracker, &mut writer).unwrap();
    assert_eq!(fifth.observation, Observation::Repeat(5));
    assert_eq!(fifth.kill, Some(KillReason::ConvergenceExceeded { repeats: 5 }));

    // nothing was ever patched
    assert_eq!(fs::read_to_string(&src).unwrap(), MOD_SV);
}

#[test]
fn missing_instance_is_recoverable_by_resynthesis() {
    let dir = tempfile::tempdir().unwrap();
    let (netlist, mut writer, _) = setup(
        dir.path(),
        &netlist_json("reg_z", "mod", "1", &[2]),
    );
    let names = NetlistConfig::default();
    let design = Design {
        netlist: &netlist,
        top: "top",
        names: &names,
    };
    let mut rebalancer = Rebalancer::new(SidePolicy::SlackComparison, None);
    let mut tracker = ConvergenceTracker::new(5, 3);

    let err = run_iteration(&[MAX_RPT], design, &mut rebalancer, &mut tracker, &mut writer).unwrap_err();
    assert!(err.is_lookup());
}
