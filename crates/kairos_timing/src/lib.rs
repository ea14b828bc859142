//! STA report ingestion for the kairos pipeline rebalancer.
//!
//! This crate turns externally produced static timing analysis artifacts into
//! the typed records the rebalancer works on. It does not analyze timing
//! itself; slack values are taken from the reports as-is.
//!
//! # Usage
//!
//! ```ignore
//! use kairos_timing::{parse_reports, resolve_paths, deduplicate};
//!
//! let paths = parse_reports(&[max_rpt, min_rpt])?;
//! let simplified = deduplicate(resolve_paths(&paths));
//! for p in simplified.iter().filter(|p| p.violated) {
//!     println!("{} -> {}: {:?}", p.start, p.end, p.slack);
//! }
//! ```
//!
//! # Architecture
//!
//! - [`report`]: `Startpoint:` block parser producing [`TimingPath`]s
//! - [`endpoint`]: pipeline-stage naming convention resolver ([`InstanceRef`])
//! - [`dedup`]: collapses duplicated paths to one worst-case record
//! - [`metrics`]: consolidated per-corner STA metrics

#![warn(missing_docs)]

pub mod dedup;
pub mod endpoint;
pub mod error;
pub mod metrics;
pub mod report;

pub use dedup::{deduplicate, resolve_paths, ResolvedPath};
pub use endpoint::{EndpointRole, InstanceRef, StageRef, INPUT_SENTINEL, OUTPUT_SENTINEL};
pub use error::TimingError;
pub use metrics::{CornerMetrics, StaMetrics};
pub use report::{parse_report, parse_reports, PathCheck, TimingPath};
