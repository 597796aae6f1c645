//! Filesystem configuration.
//!
//! Every field has a default matching the archives produced by the browser
//! emulator, so an empty TOML file (or no file at all) is a valid config:
//!
//! ```toml
//! blob_dir = "indexeddb"
//! dir_mode = 0o755
//! file_mode = 0o644
//! compression = "stored"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EmuFsResult;
use crate::inode::{DIR_TAG, FILE_TAG, KIND_MASK};

/// Default sub-directory of an extracted archive that holds the blobs.
pub const DEFAULT_BLOB_DIR: &str = "indexeddb";

/// Compression used for entries of saved archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// No compression.
    #[default]
    Stored,
    /// Deflate.
    Deflated,
}

/// Filesystem configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmuFsConfig {
    /// Blob directory inside the archive.
    pub blob_dir: String,
    /// Permission bits for new directories.
    pub dir_mode: u16,
    /// Permission bits for new files.
    pub file_mode: u16,
    /// Entry compression for saved archives.
    pub compression: Compression,
}

impl Default for EmuFsConfig {
    fn default() -> Self {
        Self {
            blob_dir: DEFAULT_BLOB_DIR.to_string(),
            dir_mode: 0o755,
            file_mode: 0o644,
            compression: Compression::Stored,
        }
    }
}

impl EmuFsConfig {
    /// Load a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> EmuFsResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parse TOML text.
    pub fn from_toml(text: &str) -> EmuFsResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Full mode word for a new directory. Kind bits in `dir_mode` are ignored.
    pub fn new_dir_mode(&self) -> u16 {
        DIR_TAG | (self.dir_mode & !KIND_MASK)
    }

    /// Full mode word for a new file.
    pub fn new_file_mode(&self) -> u16 {
        FILE_TAG | (self.file_mode & !KIND_MASK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EmuFsConfig::default();
        assert_eq!(config.blob_dir, "indexeddb");
        assert_eq!(config.new_dir_mode(), DIR_TAG | 0o755);
        assert_eq!(config.new_file_mode(), FILE_TAG | 0o644);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(EmuFsConfig::from_toml("").unwrap(), EmuFsConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = EmuFsConfig::from_toml(
            r#"
            file_mode = 0o600
            compression = "deflated"
            "#,
        )
        .unwrap();
        assert_eq!(config.blob_dir, "indexeddb");
        assert_eq!(config.compression, Compression::Deflated);
        assert_eq!(config.new_file_mode(), FILE_TAG | 0o600);
    }

    #[test]
    fn test_bad_toml() {
        assert!(EmuFsConfig::from_toml("dir_mode = \"rwx\"").is_err());
    }
}
