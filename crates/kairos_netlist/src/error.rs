//! Error types for netlist access.

use std::path::PathBuf;

/// Errors that can occur while reading pipeline state from a netlist.
#[derive(Debug, thiserror::Error)]
pub enum NetlistError {
    /// The netlist file could not be read.
    #[error("failed to read netlist {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The netlist is not valid JSON or does not have the expected shape.
    #[error("malformed netlist JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A module referenced by name is not in the netlist.
    #[error("module '{0}' not found in netlist")]
    UnknownModule(String),

    /// The instance is not a cell of the top module.
    #[error("instance '{instance}' not found under '{top}'")]
    UnknownInstance {
        /// The instance that was looked up.
        instance: String,
        /// The top module searched.
        top: String,
    },

    /// A required parameter is absent from the instance's module.
    #[error("module '{module}' has no parameter '{param}'")]
    MissingParameter {
        /// The module searched.
        module: String,
        /// The missing parameter name.
        param: String,
    },

    /// A parameter value is not a binary string or an integer.
    #[error("parameter '{param}' of '{module}' has invalid value {value}")]
    InvalidParameter {
        /// The module holding the parameter.
        module: String,
        /// The parameter name.
        param: String,
        /// The raw JSON value.
        value: String,
    },

    /// The stage-enable tie-offs do not form a valid single-hot mask.
    #[error("malformed pipeline mask in '{module}': {reason}")]
    MalformedMask {
        /// The module whose tie-offs were read.
        module: String,
        /// What was wrong.
        reason: String,
    },
}

impl NetlistError {
    /// Returns `true` for lookup failures: something the current design should
    /// contain is missing from the netlist. These are cleared by resynthesis.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            NetlistError::UnknownModule(_)
                | NetlistError::UnknownInstance { .. }
                | NetlistError::MissingParameter { .. }
        )
    }
}
