//! STA path report parser.
//!
//! Parses OpenSTA-style path reports into [`TimingPath`] records. A report is
//! a sequence of blocks, each starting with `Startpoint:` and containing an
//! `Endpoint:` line, optional `Path Group:` / `Path Type:` lines, a delay
//! table, and a trailing `<float> slack` line:
//!
//! ```text
//! Startpoint: a[3] (input port clocked by clk)
//! Endpoint: mul1.array_multiplier_pipeline_stage[2]
//!           (rising edge-triggered flip-flop clocked by clk)
//! Path Group: clk
//! Path Type: max
//!
//! Fanout     Cap    Slew   Delay    Time   Description
//! ...
//!          -0.05   slack (VIOLATED)
//! ```
//!
//! The parser is line-based and only looks at the handful of lines it needs;
//! the delay table is skipped.

use crate::endpoint::{INPUT_SENTINEL, OUTPUT_SENTINEL};
use crate::error::TimingError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Marker that opens every path block.
const STARTPOINT: &str = "Startpoint:";

/// Marker for the capturing end of a path.
const ENDPOINT: &str = "Endpoint:";

/// Marker for the analysis type of a path.
const PATH_TYPE: &str = "Path Type:";

/// Which timing check a path was reported for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathCheck {
    /// `Path Type: max`, a setup check.
    Setup,
    /// `Path Type: min`, a hold check.
    Hold,
}

/// A single timing path extracted from a report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimingPath {
    /// Launching point, or [`INPUT_SENTINEL`] for a primary input.
    pub startpoint: String,
    /// Capturing point, or [`OUTPUT_SENTINEL`] for a primary output.
    pub endpoint: String,
    /// Slack in report time units. `None` if the slack line was unparsable.
    pub slack: Option<f64>,
    /// `true` iff the slack is known and negative.
    pub violated: bool,
    /// Setup or hold, when the block carries a `Path Type:` line.
    pub check: Option<PathCheck>,
}

impl TimingPath {
    /// Creates a path record, deriving `violated` from `slack`.
    pub fn new(startpoint: impl Into<String>, endpoint: impl Into<String>, slack: Option<f64>) -> Self {
        Self {
            startpoint: startpoint.into(),
            endpoint: endpoint.into(),
            slack,
            violated: slack.is_some_and(|s| s < 0.0),
            check: None,
        }
    }
}

/// Parses a single report. See [`parse_reports`].
pub fn parse_report(text: &str) -> Result<Vec<TimingPath>, TimingError> {
    parse_reports(&[text])
}

/// Parses several reports (e.g. max and min) into one ordered path list.
///
/// Paths keep report order, then block order within each report. Fails with
/// [`TimingError::NoPaths`] only if no report contains a `Startpoint:` block.
pub fn parse_reports<S: AsRef<str>>(texts: &[S]) -> Result<Vec<TimingPath>, TimingError> {
    let mut paths = Vec::new();
    for text in texts {
        for block in split_blocks(text.as_ref()) {
            paths.push(parse_block(block));
        }
    }
    if paths.is_empty() {
        return Err(TimingError::NoPaths);
    }
    debug!(count = paths.len(), "parsed timing paths");
    Ok(paths)
}

/// Splits report text into blocks that each begin with `Startpoint:`.
fn split_blocks(text: &str) -> Vec<&str> {
    let starts: Vec<usize> = text.match_indices(STARTPOINT).map(|(i, _)| i).collect();
    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(text.len());
            text[start..end].trim_end()
        })
        .collect()
}

fn parse_block(block: &str) -> TimingPath {
    let lines: Vec<&str> = block.lines().collect();

    let (start_name, start_kind) = labelled_point(&lines, STARTPOINT).unwrap_or_default();
    let (end_name, end_kind) = labelled_point(&lines, ENDPOINT).unwrap_or_default();

    let startpoint = if start_kind.as_deref() == Some("input") {
        INPUT_SENTINEL.to_string()
    } else {
        start_name
    };
    let endpoint = if end_kind.as_deref() == Some("output") {
        OUTPUT_SENTINEL.to_string()
    } else {
        end_name
    };

    let slack = match last_slack(&lines) {
        Some(Some(value)) => Some(value),
        Some(None) => {
            warn!(startpoint = %startpoint, endpoint = %endpoint, "unparsable slack value");
            None
        }
        None => {
            warn!(startpoint = %startpoint, endpoint = %endpoint, "path block has no slack line");
            None
        }
    };

    let check = lines.iter().find_map(|l| {
        let rest = l.trim_start().strip_prefix(PATH_TYPE)?;
        match rest.trim() {
            "max" => Some(PathCheck::Setup),
            "min" => Some(PathCheck::Hold),
            _ => None,
        }
    });

    TimingPath {
        violated: slack.is_some_and(|s| s < 0.0),
        startpoint,
        endpoint,
        slack,
        check,
    }
}

/// Finds `<label> <name> [(<kind> ...)]` and returns the name and the first
/// word of the parenthetical, which may sit on the following line.
fn labelled_point(lines: &[&str], label: &str) -> Option<(String, Option<String>)> {
    let idx = lines
        .iter()
        .position(|l| l.trim_start().starts_with(label))?;
    let rest = lines[idx].trim_start()[label.len()..].trim_start();
    let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let name = &rest[..name_end];
    if name.is_empty() {
        return None;
    }

    let after = rest[name_end..].trim();
    let annotation = if after.is_empty() {
        lines.get(idx + 1).map(|next| next.trim())
    } else {
        Some(after)
    };
    let kind = annotation
        .and_then(|a| a.strip_prefix('('))
        .map(|a| {
            a.chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect::<String>()
        })
        .filter(|k| !k.is_empty());

    Some((name.to_string(), kind))
}

/// Returns the value on the last `<number> slack` line. The outer `Option`
/// is whether such a line exists; the inner one whether its number parsed.
fn last_slack(lines: &[&str]) -> Option<Option<f64>> {
    lines.iter().rev().find_map(|line| {
        let mut tokens = line.split_whitespace();
        let value = tokens.next()?;
        let label = tokens.next()?;
        let numeric_shape = value
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-' || c == '.');
        (label.starts_with("slack") && numeric_shape).then(|| value.parse::<f64>().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT_TO_REG: &str = r#"
===========================================================================
report_checks -path_delay max (Setup)
============================================================================
Startpoint: a[3] (input port clocked by clk)
Endpoint: reg_a.mod_pipeline_stage[2]
          (rising edge-triggered flip-flop clocked by clk)
Path Group: clk
Path Type: max

Fanout     Cap    Slew   Delay    Time   Description
-----------------------------------------------------------------------------
                  0.00    0.00    0.00   clock clk (rise edge)
                          0.00    0.00   clock network delay (ideal)
                          1.00    1.00 ^ input external delay
                                  4.25   data arrival time

                  0.00    4.70    4.70   clock clk (rise edge)
                                  4.20   data required time
-----------------------------------------------------------------------------
                                  4.20   data required time
                                 -4.25   data arrival time
-----------------------------------------------------------------------------
                                 -0.05   slack (VIOLATED)
"#;

    #[test]
    fn input_startpoint_is_normalized() {
        let paths = parse_report(INPUT_TO_REG).unwrap();
        assert_eq!(paths.len(), 1);
        let p = &paths[0];
        assert_eq!(p.startpoint, INPUT_SENTINEL);
        assert_eq!(p.endpoint, "reg_a.mod_pipeline_stage[2]");
        assert_eq!(p.slack, Some(-0.05));
        assert!(p.violated);
        assert_eq!(p.check, Some(PathCheck::Setup));
    }

    #[test]
    fn output_annotation_on_next_line() {
        let report = r#"
Startpoint: u1.add_pipeline_stage[0]
            (rising edge-triggered flip-flop clocked by clk)
Endpoint: sum[7]
          (output port clocked by clk)
Path Group: clk
Path Type: min

   0.12   slack (MET)
"#;
        let paths = parse_report(report).unwrap();
        assert_eq!(paths[0].startpoint, "u1.add_pipeline_stage[0]");
        assert_eq!(paths[0].endpoint, OUTPUT_SENTINEL);
        assert_eq!(paths[0].slack, Some(0.12));
        assert!(!paths[0].violated);
        assert_eq!(paths[0].check, Some(PathCheck::Hold));
    }

    #[test]
    fn input_annotation_only_applies_to_startpoint() {
        let report = "Startpoint: x (output port)\nEndpoint: y (input port)\n 0.5 slack\n";
        let paths = parse_report(report).unwrap();
        assert_eq!(paths[0].startpoint, "x");
        assert_eq!(paths[0].endpoint, "y");
    }

    #[test]
    fn last_slack_line_wins() {
        let report = r#"
Startpoint: r1.m_pipeline_stage[0] (rising edge-triggered flip-flop)
Endpoint: r2.m_pipeline_stage[1] (rising edge-triggered flip-flop)
   0.40   slack (MET)
Corner: ss
  -0.20   slack (VIOLATED)
"#;
        let paths = parse_report(report).unwrap();
        assert_eq!(paths[0].slack, Some(-0.20));
        assert!(paths[0].violated);
    }

    #[test]
    fn unparsable_slack_is_not_fatal() {
        let report = r#"
Startpoint: a (input port)
Endpoint: b (output port)
   -.-   slack (VIOLATED)

Startpoint: c (input port)
Endpoint: d (output port)
   -1.5  slack (VIOLATED)
"#;
        let paths = parse_report(report).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].slack, None);
        assert!(!paths[0].violated);
        assert_eq!(paths[1].slack, Some(-1.5));
    }

    #[test]
    fn missing_slack_line_yields_none() {
        let paths = parse_report("Startpoint: a (input port)\nEndpoint: b\n").unwrap();
        assert_eq!(paths[0].slack, None);
    }

    #[test]
    fn data_arrival_lines_are_not_slack() {
        let lines = ["  4.25   data arrival time", "  4.20   data required time"];
        assert_eq!(last_slack(&lines), None);
    }

    #[test]
    fn multiple_reports_concatenate_in_order() {
        let max = "Startpoint: a (input port)\nEndpoint: b\n -0.1 slack\n";
        let min = "Startpoint: c\nEndpoint: d (output port)\n 0.2 slack\n";
        let paths = parse_reports(&[max, min]).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].startpoint, INPUT_SENTINEL);
        assert_eq!(paths[1].endpoint, OUTPUT_SENTINEL);
    }

    #[test]
    fn no_blocks_anywhere_is_an_error() {
        let result = parse_reports(&["", "nothing to see"]);
        assert!(matches!(result, Err(TimingError::NoPaths)));
    }

    #[test]
    fn one_empty_report_among_many_is_fine() {
        let paths = parse_reports(&["", "Startpoint: a\nEndpoint: b\n 1.0 slack\n"]).unwrap();
        assert_eq!(paths.len(), 1);
    }

    #[test]
    fn new_derives_violated() {
        assert!(TimingPath::new("a", "b", Some(-0.01)).violated);
        assert!(!TimingPath::new("a", "b", Some(0.0)).violated);
        assert!(!TimingPath::new("a", "b", None).violated);
    }
}
