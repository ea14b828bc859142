//! Applying mask decisions to design sources.
//!
//! The rebalancer hands every committed decision to a [`MaskSink`]. The
//! file-backed [`SourceMaskWriter`] patches the declaring module's source;
//! [`RecordingSink`] only keeps the writes, for dry runs and tests.

use crate::error::PatchError;
use crate::expr::MaskExpression;
use crate::locate::{base_module_name, declares_module, locate_module_source};
use kairos_common::PipelineMask;
use std::path::PathBuf;
use tracing::debug;

/// One mask update for one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskWrite {
    /// Netlist module of the instance.
    pub module: String,
    /// Instance name, for logging.
    pub instance: String,
    /// Key of the branch to write.
    pub instance_id: u64,
    /// New mask.
    pub mask: PipelineMask,
}

impl MaskWrite {
    /// Creates a write record.
    pub fn new(module: &str, instance: &str, instance_id: u64, mask: PipelineMask) -> Self {
        Self {
            module: module.to_string(),
            instance: instance.to_string(),
            instance_id,
            mask,
        }
    }
}

/// Destination for committed mask decisions.
pub trait MaskSink {
    /// Persists one mask update.
    fn write_mask(&mut self, write: &MaskWrite) -> Result<(), PatchError>;
}

/// Patches mask branches into the design source that declares each module.
#[derive(Debug, Clone)]
pub struct SourceMaskWriter {
    sources: Vec<PathBuf>,
    libraries: Vec<PathBuf>,
    expr: MaskExpression,
}

impl SourceMaskWriter {
    /// Creates a writer over the patchable `sources`.
    pub fn new(sources: Vec<PathBuf>, expr: MaskExpression) -> Self {
        Self {
            sources,
            libraries: Vec::new(),
            expr,
        }
    }

    /// Read-only files consulted when no design source declares a module,
    /// so the failure can name the library that does.
    pub fn with_libraries(mut self, libraries: Vec<PathBuf>) -> Self {
        self.libraries = libraries;
        self
    }

    fn source_for(&self, module: &str) -> Result<PathBuf, PatchError> {
        match locate_module_source(module, &self.sources) {
            Err(PatchError::ModuleSourceNotFound(base)) => {
                for library in &self.libraries {
                    let content =
                        std::fs::read_to_string(library).map_err(|e| PatchError::io(library, e))?;
                    if declares_module(&content, &base) {
                        return Err(PatchError::ReadOnlyModule {
                            module: base,
                            path: library.clone(),
                        });
                    }
                }
                Err(PatchError::ModuleSourceNotFound(base))
            }
            found => found,
        }
    }

    /// Reads back the mask currently selected for `instance_id` in the
    /// source declaring `module`.
    pub fn read_mask(&self, module: &str, instance_id: u64) -> Result<Option<PipelineMask>, PatchError> {
        let path = self.source_for(module)?;
        let content = std::fs::read_to_string(&path).map_err(|e| PatchError::io(&path, e))?;
        if !self.expr.is_declared_in(&content) {
            return Err(PatchError::MaskDeclNotFound {
                param: self.expr.mask_param.clone(),
                path,
            });
        }
        Ok(self.expr.read(&content, instance_id))
    }
}

impl MaskSink for SourceMaskWriter {
    fn write_mask(&mut self, write: &MaskWrite) -> Result<(), PatchError> {
        let path = self.source_for(&write.module)?;
        let content = std::fs::read_to_string(&path).map_err(|e| PatchError::io(&path, e))?;
        let patched = self
            .expr
            .patch(&content, write.instance_id, &write.mask)
            .ok_or_else(|| PatchError::MaskDeclNotFound {
                param: self.expr.mask_param.clone(),
                path: path.clone(),
            })?;
        if patched != content {
            std::fs::write(&path, patched).map_err(|e| PatchError::io(&path, e))?;
        }
        debug!(
            module = base_module_name(&write.module),
            instance_id = write.instance_id,
            path = %path.display(),
            "patched mask branch"
        );
        Ok(())
    }
}

/// A sink that records writes without touching any file.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    /// Every write received, in order.
    pub writes: Vec<MaskWrite>,
}

impl MaskSink for RecordingSink {
    fn write_mask(&mut self, write: &MaskWrite) -> Result<(), PatchError> {
        self.writes.push(write.clone());
        Ok(())
    }
}
