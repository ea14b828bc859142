//! Finding the design source that declares a module.

use crate::error::PatchError;
use std::path::{Path, PathBuf};

/// Strips synthesizer decoration from a netlist module name.
///
/// Parameterized modules appear as `$paramod\<name>\<PARAM>=<value>...` (or
/// `$paramod$<hash>\<name>`); the plain name is the first `\`-separated part
/// after the prefix.
pub fn base_module_name(name: &str) -> &str {
    if name.starts_with("$paramod") {
        name.split('\\').nth(1).unwrap_or(name)
    } else {
        name.trim_start_matches('\\')
    }
}

/// Returns the first file in `files` that declares `module <name>`.
///
/// `name` may be a decorated netlist module name; see [`base_module_name`].
pub fn locate_module_source(name: &str, files: &[PathBuf]) -> Result<PathBuf, PatchError> {
    let base = base_module_name(name);
    for file in files {
        let content = std::fs::read_to_string(file).map_err(|e| PatchError::io(file, e))?;
        if declares_module(&content, base) {
            return Ok(file.clone());
        }
    }
    Err(PatchError::ModuleSourceNotFound(base.to_string()))
}

/// Returns `true` if `content` contains a `module <name>` header.
pub fn declares_module(content: &str, name: &str) -> bool {
    content.lines().any(|line| {
        let mut tokens = line
            .split(|c: char| c.is_whitespace() || c == '#' || c == '(' || c == ';')
            .filter(|t| !t.is_empty());
        matches!(
            (tokens.next(), tokens.next()),
            (Some("module"), Some(n)) if n == name
        )
    })
}

/// Returns `path` relative to `base` for display, or `path` itself.
pub fn display_path<'p>(path: &'p Path, base: &Path) -> &'p Path {
    path.strip_prefix(base).unwrap_or(path)
}
