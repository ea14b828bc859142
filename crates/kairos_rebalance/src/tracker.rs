//! Per-attempt convergence tracking.
//!
//! A [`ConvergenceTracker`] lives for one clock-period attempt. It fingerprints
//! the deduplicated path set of every iteration; when the same set keeps
//! coming back the heuristic is cycling, and after enough recurrences the
//! attempt is killed. It also remembers which register pairs have already
//! been acted on, which the random tie-break policy consults.

use kairos_common::ContentHash;
use kairos_timing::{InstanceRef, ResolvedPath};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Why an attempt at the current clock period was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillReason {
    /// The same path set recurred `repeats` times.
    ConvergenceExceeded {
        /// Recurrence count when the threshold was reached.
        repeats: u32,
    },
    /// A primary input reaches a stage that is not the instance's first
    /// enabled one.
    InputRegisterNotClosest {
        /// Affected instance.
        instance: String,
        /// Stage the path ends at.
        stage: usize,
    },
    /// A primary output is reached from a stage that is not the instance's
    /// last enabled one.
    RegisterOutputNotClosest {
        /// Affected instance.
        instance: String,
        /// Stage the path starts at.
        stage: usize,
    },
}

impl fmt::Display for KillReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KillReason::ConvergenceExceeded { repeats } => {
                write!(f, "path set repeated {repeats} times without closing timing")
            }
            KillReason::InputRegisterNotClosest { instance, stage } => write!(
                f,
                "input reaches {instance} stage {stage}, which is not the stage closest to the input"
            ),
            KillReason::RegisterOutputNotClosest { instance, stage } => write!(
                f,
                "output is driven from {instance} stage {stage}, which is not the stage closest to the output"
            ),
        }
    }
}

/// What [`ConvergenceTracker::observe`] concluded about a path set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First time this set was seen in the attempt.
    New,
    /// Seen before; carries the updated recurrence count.
    Repeat(u32),
}

/// Mutable state for one clock-period attempt.
#[derive(Debug, Clone)]
pub struct ConvergenceTracker {
    kill_threshold: u32,
    slack_precision: u32,
    seen: HashSet<ContentHash>,
    attempted: HashSet<(InstanceRef, InstanceRef)>,
    repeats: u32,
    iterations: u32,
    kill: Option<KillReason>,
}

impl ConvergenceTracker {
    /// Creates a tracker that kills after `kill_threshold` recurrences and
    /// hashes slack rounded to `slack_precision` decimals.
    pub fn new(kill_threshold: u32, slack_precision: u32) -> Self {
        Self {
            kill_threshold: kill_threshold.max(1),
            slack_precision,
            seen: HashSet::new(),
            attempted: HashSet::new(),
            repeats: 0,
            iterations: 0,
            kill: None,
        }
    }

    /// Clears all state for a new attempt at a different clock period.
    pub fn reset(&mut self) {
        self.seen.clear();
        self.attempted.clear();
        self.repeats = 0;
        self.iterations = 0;
        self.kill = None;
    }

    /// Counts an iteration and records the path set's fingerprint.
    ///
    /// Every recurrence of an already-seen set increments the repeat counter;
    /// reaching the threshold sets the kill flag.
    pub fn observe(&mut self, paths: &[ResolvedPath]) -> Observation {
        self.iterations += 1;
        let hash = path_set_hash(paths, self.slack_precision);
        if self.seen.insert(hash) {
            debug!(%hash, iteration = self.iterations, "new path set");
            return Observation::New;
        }
        self.repeats += 1;
        warn!(
            %hash,
            repeats = self.repeats,
            threshold = self.kill_threshold,
            "path set seen before"
        );
        if self.repeats >= self.kill_threshold {
            self.kill(KillReason::ConvergenceExceeded {
                repeats: self.repeats,
            });
        }
        Observation::Repeat(self.repeats)
    }

    /// Sets the kill flag. The first reason given is kept.
    pub fn kill(&mut self, reason: KillReason) {
        if self.kill.is_none() {
            self.kill = Some(reason);
        }
    }

    /// Whether the attempt should be abandoned.
    pub fn is_killed(&self) -> bool {
        self.kill.is_some()
    }

    /// The reason the attempt was killed, if it was.
    pub fn kill_reason(&self) -> Option<&KillReason> {
        self.kill.as_ref()
    }

    /// Iterations observed since the last reset.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Recurrences counted since the last reset.
    pub fn repeats(&self) -> u32 {
        self.repeats
    }

    /// Records that a `(start, end)` pair has been acted on.
    pub fn record_attempt(&mut self, start: &InstanceRef, end: &InstanceRef) {
        self.attempted.insert((start.clone(), end.clone()));
    }

    /// Whether a `(start, end)` pair was acted on earlier in this attempt.
    pub fn was_attempted(&self, start: &InstanceRef, end: &InstanceRef) -> bool {
        self.attempted.contains(&(start.clone(), end.clone()))
    }
}

/// Order-independent fingerprint of a path set.
///
/// Each path becomes a `start|end|slack` record with slack rounded to
/// `precision` decimals; records are sorted before hashing.
pub fn path_set_hash(paths: &[ResolvedPath], precision: u32) -> ContentHash {
    let mut records: Vec<String> = paths
        .iter()
        .map(|p| format!("{}|{}|{}", p.start.key(), p.end.key(), slack_key(p.slack, precision)))
        .collect();
    records.sort();
    ContentHash::from_records(records)
}

fn slack_key(slack: Option<f64>, precision: u32) -> String {
    match slack {
        Some(s) => {
            let scale = 10f64.powi(precision as i32);
            let rounded = (s * scale).round() / scale;
            // fold -0.0 into 0.0
            let rounded = if rounded == 0.0 { 0.0 } else { rounded };
            format!("{:.*}", precision as usize, rounded)
        }
        None => "none".to_string(),
    }
}
