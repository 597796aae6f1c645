//! In-memory blob store.
//!
//! Used for scratch filesystems and testing. All data is ephemeral.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{BlobStore, validate_flags};
use crate::types::OpenFlags;

type Blobs = Arc<RwLock<HashMap<String, Vec<u8>>>>;

/// In-memory blob store.
///
/// Clones share the same map, so a store handed to a filesystem can still be
/// inspected from outside.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Blobs,
}

impl MemoryBlobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs stored.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

fn not_found(key: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no blob: {key}"))
}

impl BlobStore for MemoryBlobStore {
    type Stream = MemoryBlob;

    fn read(&self, key: &str) -> io::Result<Vec<u8>> {
        self.blobs.read().get(key).cloned().ok_or_else(|| not_found(key))
    }

    fn write(&self, key: &str, data: &[u8]) -> io::Result<()> {
        self.blobs.write().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        self.blobs
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| not_found(key))
    }

    fn open(&self, key: &str, flags: &OpenFlags) -> io::Result<MemoryBlob> {
        validate_flags(flags)?;

        let mut blobs = self.blobs.write();
        match blobs.get_mut(key) {
            Some(_) if flags.create && flags.exclusive => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("blob exists: {key}"),
                ));
            }
            Some(data) => {
                if flags.truncate {
                    data.clear();
                }
            }
            None if flags.create => {
                blobs.insert(key.to_string(), Vec::new());
            }
            None => return Err(not_found(key)),
        }

        Ok(MemoryBlob {
            blobs: Arc::clone(&self.blobs),
            key: key.to_string(),
            pos: 0,
            flags: *flags,
        })
    }

    fn keys(&self) -> io::Result<Vec<String>> {
        Ok(self.blobs.read().keys().cloned().collect())
    }

    fn exists(&self, key: &str) -> bool {
        self.blobs.read().contains_key(key)
    }
}

/// Cursor over one blob of a [`MemoryBlobStore`].
///
/// Reads and writes go straight to the shared map; there is no buffering.
#[derive(Debug)]
pub struct MemoryBlob {
    blobs: Blobs,
    key: String,
    pos: u64,
    flags: OpenFlags,
}

impl MemoryBlob {
    fn denied(&self, what: &str) -> io::Error {
        io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("blob {} not opened for {what}", self.key),
        )
    }
}

impl Read for MemoryBlob {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.flags.read {
            return Err(self.denied("reading"));
        }
        let blobs = self.blobs.read();
        let data = blobs.get(&self.key).ok_or_else(|| not_found(&self.key))?;

        let start = (self.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for MemoryBlob {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.flags.writes() {
            return Err(self.denied("writing"));
        }
        let mut blobs = self.blobs.write();
        let data = blobs
            .get_mut(&self.key)
            .ok_or_else(|| not_found(&self.key))?;

        if self.flags.append {
            self.pos = data.len() as u64;
        }
        // Blobs back inodes with a 32-bit size field.
        let end = self.pos.saturating_add(buf.len() as u64);
        if end > u64::from(u32::MAX) {
            return Err(io::Error::new(
                io::ErrorKind::FileTooLarge,
                format!("write would grow blob {} to {end} bytes", self.key),
            ));
        }
        let start = self.pos as usize;
        let end = end as usize;
        // Writing past the end zero-fills the gap
        if end > data.len() {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        self.pos = end as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryBlob {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = self
            .blobs
            .read()
            .get(&self.key)
            .map(|d| d.len() as i64)
            .ok_or_else(|| not_found(&self.key))?;

        let target = match pos {
            SeekFrom::Start(n) => Some(n as i64),
            SeekFrom::End(delta) => len.checked_add(delta),
            SeekFrom::Current(delta) => (self.pos as i64).checked_add(delta),
        };
        match target {
            Some(n) if n >= 0 => {
                self.pos = n as u64;
                Ok(self.pos)
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative position",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_delete() {
        let store = MemoryBlobStore::new();
        store.write("k", b"hello").unwrap();
        assert_eq!(store.read("k").unwrap(), b"hello");
        assert!(store.exists("k"));

        store.delete("k").unwrap();
        assert!(!store.exists("k"));
        assert_eq!(
            store.read("k").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        assert_eq!(
            store.delete("k").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_clones_share_blobs() {
        let store = MemoryBlobStore::new();
        let other = store.clone();
        store.write("k", b"x").unwrap();
        assert_eq!(other.read("k").unwrap(), b"x");
        assert_eq!(other.len(), 1);
    }

    #[test]
    fn test_stream_write_then_read() {
        let store = MemoryBlobStore::new();
        let mut blob = store.open("k", &OpenFlags::create()).unwrap();
        blob.write_all(b"hello world").unwrap();
        blob.seek(SeekFrom::Start(6)).unwrap();

        let mut out = String::new();
        blob.read_to_string(&mut out).unwrap();
        assert_eq!(out, "world");
        assert_eq!(store.read("k").unwrap(), b"hello world");
    }

    #[test]
    fn test_append_always_writes_at_end() {
        let store = MemoryBlobStore::new();
        store.write("k", b"abc").unwrap();

        let mut blob = store.open("k", &OpenFlags::append()).unwrap();
        blob.seek(SeekFrom::Start(0)).unwrap();
        blob.write_all(b"def").unwrap();
        assert_eq!(store.read("k").unwrap(), b"abcdef");
    }

    #[test]
    fn test_truncate_and_exclusive() {
        let store = MemoryBlobStore::new();
        store.write("k", b"abc").unwrap();

        store.open("k", &OpenFlags::create_truncate()).unwrap();
        assert!(store.read("k").unwrap().is_empty());

        let err = store.open("k", &OpenFlags::create_exclusive()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_open_missing_without_create() {
        let store = MemoryBlobStore::new();
        let err = store.open("missing", &OpenFlags::read()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_read_only_stream_rejects_writes() {
        let store = MemoryBlobStore::new();
        store.write("k", b"abc").unwrap();
        let mut blob = store.open("k", &OpenFlags::read()).unwrap();
        assert_eq!(
            blob.write(b"x").unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn test_write_past_end_zero_fills() {
        let store = MemoryBlobStore::new();
        let mut blob = store.open("k", &OpenFlags::create()).unwrap();
        blob.seek(SeekFrom::Start(3)).unwrap();
        blob.write_all(b"x").unwrap();
        assert_eq!(store.read("k").unwrap(), b"\0\0\0x");
    }

    #[test]
    fn test_write_far_past_end_is_rejected() {
        let store = MemoryBlobStore::new();
        store.write("k", b"abc").unwrap();

        let mut blob = store.open("k", &OpenFlags::write()).unwrap();
        blob.seek(SeekFrom::Start(u64::from(u32::MAX))).unwrap();
        let err = blob.write(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::FileTooLarge);
        assert_eq!(store.read("k").unwrap(), b"abc");
    }
}
