//! Side selection for register-to-register paths.
//!
//! A violated path between two pipeline registers can be fixed from either
//! end: move the launching register one stage toward the sink, or move the
//! capturing register one stage toward the source. Which to try first is a
//! [`SidePolicy`] decision; the other side is always the fallback.

use crate::tracker::ConvergenceTracker;
use kairos_config::SidePolicy;
use kairos_timing::{InstanceRef, ResolvedPath};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One end of a timing path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The launching register.
    Start,
    /// The capturing register.
    End,
}

impl Side {
    /// Returns the other end.
    pub fn other(self) -> Self {
        match self {
            Side::Start => Side::End,
            Side::End => Side::Start,
        }
    }
}

/// How the first side was picked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChoiceBasis {
    /// Compared the worst slack of the neighbouring paths.
    SlackComparison {
        /// Worst slack of paths ending at this path's start.
        start_neighbour: f64,
        /// Worst slack of paths starting at this path's end.
        end_neighbour: f64,
    },
    /// Fixed start-first order.
    StartFirst,
    /// Coin flip after an earlier attempt on the same pair.
    Random,
}

/// Picks which end of a register-to-register path to shift first.
#[derive(Debug, Clone)]
pub struct SideSelector {
    policy: SidePolicy,
    rng: StdRng,
}

impl SideSelector {
    /// Creates a selector. `seed` makes random tie-breaks reproducible.
    pub fn new(policy: SidePolicy, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { policy, rng }
    }

    /// The configured policy.
    pub fn policy(&self) -> SidePolicy {
        self.policy
    }

    /// Chooses the first side to try for `path`, given every path of the
    /// iteration for neighbour lookup.
    pub fn first_side(
        &mut self,
        path: &ResolvedPath,
        all: &[ResolvedPath],
        tracker: &ConvergenceTracker,
    ) -> (Side, ChoiceBasis) {
        match self.policy {
            SidePolicy::NoSlackAssumption => (Side::Start, ChoiceBasis::StartFirst),
            SidePolicy::RandomTiebreak if tracker.was_attempted(&path.start, &path.end) => {
                let side = if self.rng.gen_bool(0.5) { Side::Start } else { Side::End };
                (side, ChoiceBasis::Random)
            }
            SidePolicy::SlackComparison | SidePolicy::RandomTiebreak => {
                let (start_neighbour, end_neighbour) = neighbour_slacks(path, all);
                let side = if start_neighbour >= end_neighbour {
                    Side::Start
                } else {
                    Side::End
                };
                (
                    side,
                    ChoiceBasis::SlackComparison {
                        start_neighbour,
                        end_neighbour,
                    },
                )
            }
        }
    }
}

/// Worst slack of the paths that end at `path.start` and of the paths that
/// start at `path.end`. A side with no neighbouring path gets `+inf`.
pub fn neighbour_slacks(path: &ResolvedPath, all: &[ResolvedPath]) -> (f64, f64) {
    (
        worst(all, |p| p.end == path.start),
        worst(all, |p| p.start == path.end),
    )
}

fn worst(all: &[ResolvedPath], pred: impl Fn(&ResolvedPath) -> bool) -> f64 {
    all.iter()
        .filter(|p| pred(p))
        .map(ResolvedPath::sort_slack)
        .fold(f64::INFINITY, f64::min)
}

/// Whether an endpoint is a primary port rather than a register.
pub(crate) fn is_port(r: &InstanceRef) -> bool {
    matches!(r, InstanceRef::PrimaryInput | InstanceRef::PrimaryOutput)
}
