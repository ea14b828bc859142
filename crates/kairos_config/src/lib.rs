//! Parsing and validation of `kairos.toml` project configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`KairosConfig`], then resolves it against the project directory into a
//! [`ResolvedFlow`] with absolute paths for the rebalancing loop.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{find_project_root, load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{resolve_flow, ResolvedFlow};
pub use types::*;
