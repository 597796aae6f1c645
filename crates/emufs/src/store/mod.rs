//! Blob stores.
//!
//! The filesystem keeps every inode record and data blob under a flat string
//! key. A [`BlobStore`] is the only thing that touches storage:
//!
//! - [`DirBlobStore`] - one file per key in a directory (extracted archives)
//! - [`MemoryBlobStore`] - shared in-memory map (scratch filesystems, testing)
//!
//! Stores are synchronous and take `&self`; a store that needs mutation uses
//! interior mutability.

mod dir;
mod memory;

use std::io::{self, Read, Seek, Write};

pub use dir::DirBlobStore;
pub use memory::{MemoryBlob, MemoryBlobStore};

use crate::types::OpenFlags;

/// Flat key → bytes storage.
pub trait BlobStore {
    /// Cursor over one blob, returned by [`BlobStore::open`].
    type Stream: Read + Write + Seek;

    /// Read a whole blob. A missing key is `io::ErrorKind::NotFound`.
    fn read(&self, key: &str) -> io::Result<Vec<u8>>;

    /// Replace a whole blob, creating it if needed.
    fn write(&self, key: &str, data: &[u8]) -> io::Result<()>;

    /// Delete a blob. A missing key is `io::ErrorKind::NotFound`.
    fn delete(&self, key: &str) -> io::Result<()>;

    /// Open a cursor over a blob with fopen semantics for `flags`.
    fn open(&self, key: &str, flags: &OpenFlags) -> io::Result<Self::Stream>;

    /// Every key currently stored, in no particular order.
    fn keys(&self) -> io::Result<Vec<String>>;

    /// Check if a key exists.
    fn exists(&self, key: &str) -> bool {
        self.read(key).is_ok()
    }
}

/// Reject flag combinations std's `OpenOptions` also rejects.
pub(crate) fn validate_flags(flags: &OpenFlags) -> io::Result<()> {
    if !flags.read && !flags.writes() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "open needs read, write or append access",
        ));
    }
    if (flags.create || flags.truncate) && !flags.writes() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "create and truncate need write access",
        ));
    }
    Ok(())
}
