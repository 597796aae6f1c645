//! Zip archive container.
//!
//! An [`Archive`] is a zip file extracted into a private temporary directory.
//! The filesystem lives in `<tmp>/<blob_dir>` as a [`DirBlobStore`]; every
//! other file in the archive rides along untouched and is written back on
//! [`Archive::save`].

use std::fs::File;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempDir};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::config::{Compression, EmuFsConfig};
use crate::error::{EmuFsError, EmuFsResult};
use crate::fs::EmuFs;
use crate::store::DirBlobStore;

impl From<Compression> for CompressionMethod {
    fn from(compression: Compression) -> Self {
        match compression {
            Compression::Stored => CompressionMethod::Stored,
            Compression::Deflated => CompressionMethod::Deflated,
        }
    }
}

/// An extracted archive and the filesystem inside it.
///
/// Dropping (or [`close`](Archive::close)-ing) discards the extracted
/// directory. Unsaved changes are lost.
#[derive(Debug)]
pub struct Archive {
    tmp: TempDir,
    fs: EmuFs<DirBlobStore>,
}

impl Archive {
    /// Extract an archive. Fails with `NoSuchDirectory("/")` when it holds no
    /// root inode.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: EmuFsConfig) -> EmuFsResult<Self> {
        let tmp = TempDir::new()?;
        let mut zip = ZipArchive::new(File::open(path.as_ref())?)?;
        zip.extract(tmp.path())?;
        tracing::debug!(entries = zip.len(), dir = %tmp.path().display(), "extracted");

        let store = DirBlobStore::new(tmp.path().join(&config.blob_dir));
        let fs = EmuFs::new(store, config);
        if !fs.has_root() {
            return Err(EmuFsError::no_such_directory("/"));
        }
        Ok(Self { tmp, fs })
    }

    /// Start a new, empty archive with a formatted root.
    pub fn create(config: EmuFsConfig) -> EmuFsResult<Self> {
        let tmp = TempDir::new()?;
        let store = DirBlobStore::create(tmp.path().join(&config.blob_dir))?;
        let fs = EmuFs::init(store, config)?;
        Ok(Self { tmp, fs })
    }

    /// The filesystem.
    pub fn fs(&self) -> &EmuFs<DirBlobStore> {
        &self.fs
    }

    /// The extracted directory.
    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    /// Write every extracted file into a new zip archive at `dest`.
    ///
    /// The archive is assembled next to `dest` and renamed into place, so
    /// `dest` may be the archive this one was opened from.
    #[tracing::instrument(skip_all, fields(dest = %dest.as_ref().display()))]
    pub fn save(&self, dest: impl AsRef<Path>) -> EmuFsResult<()> {
        let dest = dest.as_ref();
        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let out = NamedTempFile::new_in(&parent)?;

        let options = SimpleFileOptions::default()
            .compression_method(self.fs.config().compression.into());
        let mut writer = ZipWriter::new(out.reopen()?);
        let mut count = 0usize;

        for entry in WalkDir::new(self.tmp.path()).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(self.tmp.path())
                .map_err(|_| EmuFsError::invalid_path(entry.path().display().to_string()))?;
            let name = zip_name(relative)?;

            writer.start_file(name, options)?;
            let mut file = File::open(entry.path())?;
            std::io::copy(&mut file, &mut writer)?;
            count += 1;
        }
        writer.finish()?;

        out.persist(dest).map_err(|e| e.error)?;
        tracing::info!(files = count, "saved archive");
        Ok(())
    }

    /// Discard the extracted directory.
    pub fn close(self) -> EmuFsResult<()> {
        self.tmp.close()?;
        Ok(())
    }
}

/// Forward-slash archive name for a relative path.
fn zip_name(relative: &Path) -> EmuFsResult<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| EmuFsError::invalid_path(relative.display().to_string()))?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zip_name() {
        assert_eq!(
            zip_name(Path::new("indexeddb").join("Lw==").as_path()).unwrap(),
            "indexeddb/Lw=="
        );
    }

    #[test]
    fn test_create_formats_root() {
        let archive = Archive::create(EmuFsConfig::default()).unwrap();
        assert!(archive.fs().has_root());
        assert!(archive.root().join("indexeddb").join("Lw==").is_file());
        archive.close().unwrap();
    }

    #[test]
    fn test_open_without_root() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.zip");
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        writer
            .start_file("readme.txt", SimpleFileOptions::default())
            .unwrap();
        writer.finish().unwrap();

        let err = Archive::open(&path, EmuFsConfig::default()).unwrap_err();
        assert!(matches!(err, EmuFsError::NoSuchDirectory(p) if p == "/"));
    }
}
