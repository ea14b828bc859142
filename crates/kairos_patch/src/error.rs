//! Error types for design source patching.

use std::path::PathBuf;

/// Errors that can occur while locating, patching, or backing up sources.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// A source or backup file could not be read or written.
    #[error("source I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file has no `localparam <mask_param> = ...;` declaration.
    #[error("no '{param}' declaration in {path}")]
    MaskDeclNotFound {
        /// The mask parameter searched for.
        param: String,
        /// The file searched.
        path: PathBuf,
    },

    /// No design source declares the module.
    #[error("no design source declares module '{0}'")]
    ModuleSourceNotFound(String),

    /// The module is declared only in a read-only library file.
    #[error("module '{module}' is declared in library {path}, which is never patched")]
    ReadOnlyModule {
        /// The module looked up.
        module: String,
        /// The library declaring it.
        path: PathBuf,
    },
}

impl PatchError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        PatchError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = PatchError::Io {
            path: PathBuf::from("rtl/top.sv"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("source I/O error"));
        assert!(msg.contains("rtl/top.sv"));
    }

    #[test]
    fn decl_not_found_display() {
        let err = PatchError::MaskDeclNotFound {
            param: "PIPELINE_STAGE_MASK".to_string(),
            path: PathBuf::from("stage.sv"),
        };
        assert_eq!(
            err.to_string(),
            "no 'PIPELINE_STAGE_MASK' declaration in stage.sv"
        );
    }
}
