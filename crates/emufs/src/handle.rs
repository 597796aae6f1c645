//! File handles.
//!
//! A [`FileHandle`] is a cursor over one file's data blob that keeps the
//! owning inode in step with it: every read persists a new `atime`, every
//! write persists the blob's full length as `size` plus new `mtime`/`ctime`.
//! There is no batching; each call re-reads and re-writes the inode record.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{EmuFsError, EmuFsResult};
use crate::fs::{EmuFs, blob_size};
use crate::ids::InodeId;
use crate::inode::Stat;
use crate::resolve::{components, path_string};
use crate::store::{BlobStore, validate_flags};
use crate::types::OpenFlags;

/// An open file. The blob stream is released when the handle is dropped.
pub struct FileHandle<'a, S: BlobStore> {
    fs: &'a EmuFs<S>,
    inode_id: InodeId,
    stream: S::Stream,
}

impl<S: BlobStore> std::fmt::Debug for FileHandle<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("inode_id", &self.inode_id)
            .finish_non_exhaustive()
    }
}

impl<'a, S: BlobStore> FileHandle<'a, S> {
    pub(crate) fn open(fs: &'a EmuFs<S>, path: &Path, flags: OpenFlags) -> EmuFsResult<Self> {
        validate_flags(&flags)?;
        let parts = components(path)?;

        let existing = fs.resolve_components(&parts)?;
        if flags.exclusive && existing.is_some() {
            return Err(EmuFsError::already_exists(path_string(&parts)));
        }

        let inode_id = match existing {
            Some(id) => id,
            None if !flags.create => return Err(EmuFsError::no_such_file(path_string(&parts))),
            None => {
                // An empty path always resolves to the root, so there is a last component.
                let Some((name, parent_parts)) = parts.split_last() else {
                    return Err(EmuFsError::is_a_directory("/"));
                };
                let parent = fs
                    .resolve_components(parent_parts)?
                    .ok_or_else(|| EmuFsError::no_such_directory(path_string(parent_parts)))?;
                let mode = fs.config().new_file_mode();
                let id = fs.allocate(&parent, parent_parts, name, mode, &[])?;
                tracing::debug!(path = %path_string(&parts), inode = %id, "created file");
                id
            }
        };

        let inode = fs.read_inode(&inode_id)?;
        if inode.is_dir() {
            return Err(EmuFsError::is_a_directory(path_string(&parts)));
        }

        // Exclusivity was settled at the inode level; the data blob exists by now.
        let blob_flags = OpenFlags {
            exclusive: false,
            ..flags
        };
        let stream = fs.store().open(inode.data_id.as_str(), &blob_flags)?;

        let mut handle = Self {
            fs,
            inode_id,
            stream,
        };
        if flags.truncate {
            handle.sync_after_write()?;
        }
        Ok(handle)
    }

    /// Inode id of the open file.
    pub fn inode_id(&self) -> &InodeId {
        &self.inode_id
    }

    /// Current metadata of the open file.
    pub fn stat(&self) -> EmuFsResult<Stat> {
        let inode = self.fs.read_inode(&self.inode_id)?;
        Ok(Stat::from_inode(self.inode_id.clone(), &inode))
    }

    /// Read up to `max` bytes from the cursor. Fewer at end of data.
    pub fn read_bytes(&mut self, max: usize) -> EmuFsResult<Vec<u8>> {
        self.touch_accessed()?;
        let mut out = Vec::new();
        (&mut self.stream).take(max as u64).read_to_end(&mut out)?;
        Ok(out)
    }

    /// Read everything from the cursor to the end of data.
    pub fn read_all(&mut self) -> EmuFsResult<Vec<u8>> {
        self.touch_accessed()?;
        let mut out = Vec::new();
        self.stream.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Flush and release the handle.
    pub fn close(mut self) -> EmuFsResult<()> {
        self.stream.flush()?;
        Ok(())
    }

    fn touch_accessed(&self) -> EmuFsResult<()> {
        let mut inode = self.fs.read_inode(&self.inode_id)?;
        inode.touch_accessed();
        self.fs.write_inode(&self.inode_id, &inode)
    }

    /// Record the blob's full length (not just the bytes written) and bump
    /// `mtime`/`ctime`. The cursor is left where it was.
    fn sync_after_write(&mut self) -> EmuFsResult<()> {
        let cursor = self.stream.stream_position()?;
        let end = self.stream.seek(SeekFrom::End(0))?;
        self.stream.seek(SeekFrom::Start(cursor))?;

        let mut inode = self.fs.read_inode(&self.inode_id)?;
        inode.size = blob_size(end)?;
        inode.touch_modified(true);
        self.fs.write_inode(&self.inode_id, &inode)
    }
}

impl<S: BlobStore> Read for FileHandle<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.touch_accessed()?;
        self.stream.read(buf)
    }
}

impl<S: BlobStore> Write for FileHandle<'_, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.stream.write(buf)?;
        self.sync_after_write()?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl<S: BlobStore> Seek for FileHandle<'_, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.stream.seek(pos)
    }
}
