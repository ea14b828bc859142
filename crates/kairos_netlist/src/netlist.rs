//! Yosys-style JSON netlist model.
//!
//! Only the parts the rebalancer reads are modelled:
//!
//! ```text
//! { "modules": { "<name>": {
//!     "parameter_default_values": { "<param>": "<binary string>" },
//!     "cells": { "<instance>": { "type": "<module>", "parameters": { ... } } }
//! } } }
//! ```
//!
//! Unknown keys (ports, netnames, connections) are ignored.

use crate::error::NetlistError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// A parsed structural netlist.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Netlist {
    /// Modules keyed by (possibly derived) module name.
    #[serde(default)]
    pub modules: BTreeMap<String, NetlistModule>,
}

/// One module definition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetlistModule {
    /// Parameter values this module was elaborated with.
    #[serde(default)]
    pub parameter_default_values: BTreeMap<String, Value>,
    /// Sub-cells keyed by instance name.
    #[serde(default)]
    pub cells: BTreeMap<String, Cell>,
}

/// A cell instance inside a module.
#[derive(Debug, Clone, Deserialize)]
pub struct Cell {
    /// The instantiated module or primitive type.
    #[serde(rename = "type")]
    pub cell_type: String,
    /// Parameter overrides on this instance.
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
}

impl Netlist {
    /// Parses a netlist from JSON text.
    pub fn from_json(text: &str) -> Result<Self, NetlistError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a netlist file.
    pub fn load(path: &Path) -> Result<Self, NetlistError> {
        let text = std::fs::read_to_string(path).map_err(|source| NetlistError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Looks up a module by name.
    pub fn module(&self, name: &str) -> Result<&NetlistModule, NetlistError> {
        self.modules
            .get(name)
            .ok_or_else(|| NetlistError::UnknownModule(name.to_string()))
    }

    /// Finds a cell below `top` by hierarchical instance name.
    ///
    /// The name is first tried as a direct child of `top`; otherwise it is
    /// split on `.` (then `/`) and walked one level at a time.
    pub fn find_cell(&self, top: &str, instance: &str) -> Result<&Cell, NetlistError> {
        let top_module = self.module(top)?;
        if let Some(cell) = child(top_module, instance) {
            return Ok(cell);
        }
        for sep in ['.', '/'] {
            if instance.contains(sep) {
                if let Some(cell) = self.walk(top_module, instance.split(sep)) {
                    return Ok(cell);
                }
            }
        }
        Err(NetlistError::UnknownInstance {
            instance: instance.to_string(),
            top: top.to_string(),
        })
    }

    fn walk<'a, 'n>(
        &'n self,
        top: &'n NetlistModule,
        segments: impl Iterator<Item = &'a str>,
    ) -> Option<&'n Cell> {
        let mut module = top;
        let mut cell: Option<&'n Cell> = None;
        for segment in segments {
            if let Some(parent) = cell {
                module = self.modules.get(&parent.cell_type)?;
            }
            cell = Some(child(module, segment)?);
        }
        cell
    }
}

/// Direct child lookup, tolerating a leading backslash on escaped names.
fn child<'n>(module: &'n NetlistModule, name: &str) -> Option<&'n Cell> {
    module.cells.get(name).or_else(|| {
        module
            .cells
            .iter()
            .find(|(k, _)| k.trim_start_matches('\\') == name)
            .map(|(_, c)| c)
    })
}

/// Parses a Yosys parameter value: a binary string (`"00000101"`), or a
/// plain JSON integer.
pub fn parse_param(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.len() > 64 || !s.chars().all(|c| c == '0' || c == '1') {
                return None;
            }
            u64::from_str_radix(s, 2).ok()
        }
        _ => None,
    }
}
