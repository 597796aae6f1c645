//! # emufs
//!
//! Inode filesystem stored as flat blobs, as found in the `indexeddb/`
//! directory of browser-emulator disk archives.
//!
//! Key components:
//!
//! - [`BlobStore`] - Flat key → bytes storage ([`DirBlobStore`], [`MemoryBlobStore`])
//! - [`Inode`] - Fixed 30-byte header plus the data blob id
//! - [`DirTable`] - Insertion-ordered JSON name → inode id map
//! - [`EmuFs`] - Path operations: stat, mkdir, unlink, listdir, walk, chmod, open
//! - [`FileHandle`] - `Read`/`Write`/`Seek` over a file blob, keeping its inode in step
//! - [`Archive`] - Zip container extracted to a temporary directory
//!
//! ## Layout
//!
//! The root directory's inode lives under the reserved key `/`. Every other
//! inode and every data blob is keyed by a random UUID. A directory's data
//! blob is its entry table; a file's data blob is its contents.
//!
//! ```no_run
//! use emufs::{Archive, EmuFsConfig};
//!
//! let archive = Archive::open("disk.zip", EmuFsConfig::default())?;
//! for name in archive.fs().listdir("/")? {
//!     println!("{name}");
//! }
//! # Ok::<(), emufs::EmuFsError>(())
//! ```

pub mod archive;
pub mod check;
pub mod config;
pub mod dir_table;
mod error;
pub mod fs;
pub mod handle;
pub mod ids;
pub mod import;
pub mod inode;
mod resolve;
pub mod store;
mod types;
pub mod walk;

pub use archive::Archive;
pub use check::{CheckReport, SizeMismatch};
pub use config::{Compression, EmuFsConfig};
pub use dir_table::DirTable;
pub use error::{EmuFsError, EmuFsResult};
pub use fs::EmuFs;
pub use handle::FileHandle;
pub use ids::{DataId, InodeId, ROOT_INODE_ID};
pub use import::ImportSummary;
pub use inode::{DIR_TAG, FILE_TAG, Inode, KIND_MASK, PERM_MASK, Stat};
pub use store::{BlobStore, DirBlobStore, MemoryBlob, MemoryBlobStore};
pub use types::OpenFlags;
pub use walk::{Walk, WalkEntry};
