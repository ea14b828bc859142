//! Design source patching for the kairos pipeline rebalancer.
//!
//! Mask decisions are persisted by editing one `localparam` per pipelined
//! module: a conditional expression keyed by instance id that selects each
//! instance's stage mask. This crate finds the declaring source file, edits
//! that expression idempotently, and manages the per-attempt backups that let
//! an abandoned clock period be rolled back wholesale.
//!
//! # Architecture
//!
//! - [`expr`]: text-level branch insertion and replacement
//! - [`locate`]: module name to source file
//! - [`writer`]: the [`MaskSink`] seam and its file-backed implementation
//! - [`backup`]: `<stem>_backup.<ext>` copies with restore and discard

#![warn(missing_docs)]

pub mod backup;
pub mod error;
pub mod expr;
pub mod locate;
pub mod writer;

pub use backup::{backup_path, SourceBackup};
pub use error::PatchError;
pub use expr::MaskExpression;
pub use locate::{base_module_name, display_path, locate_module_source};
pub use writer::{MaskSink, MaskWrite, RecordingSink, SourceMaskWriter};
