//! Directory entry tables.
//!
//! A directory's data blob is a JSON object mapping child names to child inode
//! ids. Insertion order is kept so listings come back in creation order.

use indexmap::IndexMap;

use crate::error::{EmuFsError, EmuFsResult};
use crate::ids::{DataId, InodeId};

/// Decoded name → inode id mapping of one directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirTable {
    entries: IndexMap<String, InodeId>,
}

impl DirTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a directory data blob.
    pub fn decode(id: &DataId, bytes: &[u8]) -> EmuFsResult<Self> {
        let entries = serde_json::from_slice(bytes).map_err(|source| {
            EmuFsError::CorruptDirectory {
                id: id.to_string(),
                source,
            }
        })?;
        Ok(Self { entries })
    }

    /// Encode to a directory data blob. An empty table is `{}`.
    pub fn encode(&self) -> Vec<u8> {
        // A map of strings always serializes.
        serde_json::to_vec(&self.entries).unwrap_or_else(|_| b"{}".to_vec())
    }

    /// Look up a child by name.
    pub fn get(&self, name: &str) -> Option<&InodeId> {
        self.entries.get(name)
    }

    /// Insert or replace a child. Returns the id previously bound to `name`.
    pub fn insert(&mut self, name: impl Into<String>, child: InodeId) -> Option<InodeId> {
        self.entries.insert(name.into(), child)
    }

    /// Remove a child, keeping the order of the remaining entries.
    pub fn remove(&mut self, name: &str) -> Option<InodeId> {
        self.entries.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Child names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(name, inode id)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &InodeId)> {
        self.entries.iter().map(|(name, id)| (name.as_str(), id))
    }
}
