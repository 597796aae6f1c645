//! Path → inode resolution.
//!
//! Resolution always starts at the root inode and decodes one directory table
//! per component. Nothing is cached between calls.

use std::path::{Component, Path};

use crate::error::{EmuFsError, EmuFsResult};
use crate::fs::EmuFs;
use crate::ids::InodeId;
use crate::store::BlobStore;

/// Normalize a path into its components.
///
/// Relative paths are taken from the root. `.` is dropped, `..` pops a
/// component (never above the root), repeated slashes collapse.
pub(crate) fn components(path: &Path) -> EmuFsResult<Vec<String>> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                parts.pop();
            }
            Component::Normal(name) => {
                let name = name
                    .to_str()
                    .ok_or_else(|| EmuFsError::invalid_path(path.display().to_string()))?;
                parts.push(name.to_string());
            }
        }
    }
    Ok(parts)
}

/// Absolute display form of normalized components (`/` for the root).
pub(crate) fn path_string(parts: &[String]) -> String {
    format!("/{}", parts.join("/"))
}

impl<S: BlobStore> EmuFs<S> {
    /// Resolve a path to its inode id, or `None` if any component is missing.
    ///
    /// A file in the middle of the path is `NotADirectory`.
    pub fn resolve(&self, path: impl AsRef<Path>) -> EmuFsResult<Option<InodeId>> {
        self.resolve_components(&components(path.as_ref())?)
    }

    pub(crate) fn resolve_components(&self, parts: &[String]) -> EmuFsResult<Option<InodeId>> {
        let Some((last, dirs)) = parts.split_last() else {
            return Ok(Some(InodeId::root()));
        };

        let mut current = InodeId::root();
        let mut entries = self.read_dir_table_at(&current, &[])?;
        for (depth, part) in dirs.iter().enumerate() {
            let Some(next) = entries.get(part) else {
                tracing::trace!(path = %path_string(parts), missing = %part, "resolve miss");
                return Ok(None);
            };
            current = next.clone();
            entries = self.read_dir_table_at(&current, &parts[..=depth])?;
        }

        let found = entries.get(last).cloned();
        tracing::trace!(path = %path_string(parts), inode = ?found, "resolved");
        Ok(found)
    }
}
