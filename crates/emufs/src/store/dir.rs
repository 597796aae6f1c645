//! Directory-backed blob store.
//!
//! Each blob is one file directly inside `root`. The file name is the standard
//! base64 encoding of the key's bytes, so the root inode `/` lives in `Lw==`.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::{BlobStore, validate_flags};
use crate::types::OpenFlags;

/// Directory-backed blob store.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    /// Use an existing blob directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Use a blob directory, creating it (and its parents) if needed.
    pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Physical file name for a key.
    pub fn encode_key(key: &str) -> String {
        STANDARD.encode(key.as_bytes())
    }

    /// Key for a physical file name, if it is one of ours.
    pub fn decode_key(file_name: &str) -> Option<String> {
        let bytes = STANDARD.decode(file_name).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Physical path of a key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(Self::encode_key(key))
    }
}

impl BlobStore for DirBlobStore {
    type Stream = File;

    fn read(&self, key: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(key))
    }

    fn write(&self, key: &str, data: &[u8]) -> io::Result<()> {
        fs::write(self.path_for(key), data)
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        fs::remove_file(self.path_for(key))
    }

    fn open(&self, key: &str, flags: &OpenFlags) -> io::Result<File> {
        validate_flags(flags)?;

        OpenOptions::new()
            .read(flags.read)
            .write(flags.write)
            .append(flags.append)
            .truncate(flags.truncate)
            .create(flags.create && !flags.exclusive)
            .create_new(flags.create && flags.exclusive)
            .open(self.path_for(key))
    }

    fn keys(&self) -> io::Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().to_str().and_then(Self::decode_key) {
                Some(key) => keys.push(key),
                None => tracing::trace!(
                    file = %entry.path().display(),
                    "skipping non-blob file"
                ),
            }
        }
        Ok(keys)
    }

    fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom, Write};
    use tempfile::TempDir;

    #[test]
    fn test_key_encoding() {
        assert_eq!(DirBlobStore::encode_key("/"), "Lw==");
        assert_eq!(DirBlobStore::decode_key("Lw==").as_deref(), Some("/"));
        assert_eq!(DirBlobStore::decode_key("not base64!"), None);
    }

    #[test]
    fn test_blob_files_use_encoded_names() {
        let tmp = TempDir::new().unwrap();
        let store = DirBlobStore::new(tmp.path());
        store.write("/", b"root").unwrap();

        assert_eq!(fs::read(tmp.path().join("Lw==")).unwrap(), b"root");
        assert_eq!(store.keys().unwrap(), vec!["/".to_string()]);
    }

    #[test]
    fn test_read_write_delete() {
        let tmp = TempDir::new().unwrap();
        let store = DirBlobStore::new(tmp.path());

        store.write("a", b"1").unwrap();
        assert!(store.exists("a"));
        assert_eq!(store.read("a").unwrap(), b"1");

        store.delete("a").unwrap();
        assert!(!store.exists("a"));
        assert_eq!(
            store.delete("a").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_stream_semantics() {
        let tmp = TempDir::new().unwrap();
        let store = DirBlobStore::new(tmp.path());
        store.write("k", b"abc").unwrap();

        let mut f = store.open("k", &OpenFlags::append()).unwrap();
        f.write_all(b"def").unwrap();
        f.seek(SeekFrom::Start(0)).unwrap();
        let mut out = Vec::new();
        f.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcdef");

        let err = store.open("k", &OpenFlags::create_exclusive()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_create_makes_directory() {
        let tmp = TempDir::new().unwrap();
        let store = DirBlobStore::create(tmp.path().join("nested/blobs")).unwrap();
        store.write("k", b"v").unwrap();
        assert!(store.root().join("aw==").is_file());
    }
}
