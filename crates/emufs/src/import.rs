//! Copying host directory trees into the filesystem.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{EmuFsError, EmuFsResult};
use crate::fs::EmuFs;
use crate::resolve::{components, path_string};
use crate::store::BlobStore;

/// Counts from [`EmuFs::import_tree`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub dirs: usize,
    pub files: usize,
    /// Symlinks and other special files, which are not copied.
    pub skipped: usize,
}

impl<S: BlobStore> EmuFs<S> {
    /// Replace the contents of directory `inner` with the host tree at `host`.
    ///
    /// `host` must be a directory; nothing is touched otherwise. An existing
    /// `inner` is emptied first (it must be a directory); a missing one is
    /// created, so its parent must exist. Symlinks are not followed.
    pub fn import_tree(
        &self,
        host: impl AsRef<Path>,
        inner: impl AsRef<Path>,
    ) -> EmuFsResult<ImportSummary> {
        let host = host.as_ref();
        let parts = components(inner.as_ref())?;
        let base = PathBuf::from(path_string(&parts));

        if !std::fs::metadata(host)?.is_dir() {
            return Err(EmuFsError::not_a_directory(host.display().to_string()));
        }

        match self.resolve_components(&parts)? {
            Some(id) => {
                if !self.read_inode(&id)?.is_dir() {
                    return Err(EmuFsError::not_a_directory(path_string(&parts)));
                }
                self.clear_dir(&base)?;
            }
            None => {
                self.mkdir(&base)?;
            }
        }

        let mut summary = ImportSummary::default();
        for entry in WalkDir::new(host).min_depth(1).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            let relative = entry
                .path()
                .strip_prefix(host)
                .map_err(|_| EmuFsError::invalid_path(entry.path().display().to_string()))?;
            let target = base.join(relative);

            let file_type = entry.file_type();
            if file_type.is_dir() {
                self.mkdir(&target)?;
                summary.dirs += 1;
            } else if file_type.is_file() {
                let data = std::fs::read(entry.path())?;
                self.write_file(&target, &data)?;
                summary.files += 1;
            } else {
                tracing::warn!(path = %entry.path().display(), "skipping special file");
                summary.skipped += 1;
                continue;
            }
            tracing::debug!(path = %target.display(), "imported");
        }

        tracing::info!(
            into = %base.display(),
            dirs = summary.dirs,
            files = summary.files,
            "import complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmuFsConfig;
    use crate::store::MemoryBlobStore;
    use tempfile::TempDir;

    fn host_tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("cpu")).unwrap();
        std::fs::write(tmp.path().join("cpu/alu.js"), b"alu").unwrap();
        std::fs::write(tmp.path().join("main.js"), b"main").unwrap();
        tmp
    }

    #[test]
    fn test_import_into_new_directory() {
        let fs = EmuFs::init(MemoryBlobStore::new(), EmuFsConfig::default()).unwrap();
        let host = host_tree();

        let summary = fs.import_tree(host.path(), "/code").unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                dirs: 1,
                files: 2,
                skipped: 0
            }
        );
        assert_eq!(fs.listdir("/code").unwrap(), vec!["cpu", "main.js"]);
        assert_eq!(fs.read_file("/code/cpu/alu.js").unwrap(), b"alu");
    }

    #[test]
    fn test_import_replaces_contents() {
        let fs = EmuFs::init(MemoryBlobStore::new(), EmuFsConfig::default()).unwrap();
        fs.mkdir("/code").unwrap();
        fs.write_file("/code/stale.js", b"old").unwrap();
        let id = fs.resolve("/code").unwrap();

        fs.import_tree(host_tree().path(), "/code").unwrap();
        assert_eq!(fs.resolve("/code").unwrap(), id);
        assert!(!fs.exists("/code/stale.js").unwrap());
        assert_eq!(fs.read_file("/code/main.js").unwrap(), b"main");
        assert!(fs.check().unwrap().is_clean());
    }

    #[test]
    fn test_import_onto_file() {
        let fs = EmuFs::init(MemoryBlobStore::new(), EmuFsConfig::default()).unwrap();
        fs.write_file("/f", b"x").unwrap();
        let err = fs.import_tree(host_tree().path(), "/f").unwrap_err();
        assert!(matches!(err, EmuFsError::NotADirectory(_)));
    }

    #[test]
    fn test_import_from_host_file_leaves_target() {
        let fs = EmuFs::init(MemoryBlobStore::new(), EmuFsConfig::default()).unwrap();
        fs.mkdir("/code").unwrap();
        fs.write_file("/code/keep.js", b"keep").unwrap();
        let host = host_tree();

        let err = fs.import_tree(host.path().join("main.js"), "/code").unwrap_err();
        assert!(matches!(err, EmuFsError::NotADirectory(_)));
        assert_eq!(fs.listdir("/code").unwrap(), vec!["keep.js"]);
        assert_eq!(fs.read_file("/code/keep.js").unwrap(), b"keep");
    }

    #[test]
    fn test_import_from_missing_host_leaves_target() {
        let fs = EmuFs::init(MemoryBlobStore::new(), EmuFsConfig::default()).unwrap();
        fs.mkdir("/code").unwrap();
        fs.write_file("/code/keep.js", b"keep").unwrap();
        let host = host_tree();

        let err = fs.import_tree(host.path().join("absent"), "/code").unwrap_err();
        assert!(matches!(err, EmuFsError::Io(e) if e.kind() == std::io::ErrorKind::NotFound));
        assert_eq!(fs.listdir("/code").unwrap(), vec!["keep.js"]);

        // A missing target is not created either.
        assert!(fs.import_tree(host.path().join("absent"), "/new").is_err());
        assert!(!fs.exists("/new").unwrap());
    }
}
