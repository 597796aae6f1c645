//! Filesystem façade.
//!
//! [`EmuFs`] composes the resolver, the inode codec and directory tables on
//! top of a [`BlobStore`]. Every operation is a full round-trip to the store:
//! inode records and directory tables are read, modified and written back with
//! nothing held in between.

use std::io::{Read, Write};
use std::path::Path;

use crate::config::EmuFsConfig;
use crate::dir_table::DirTable;
use crate::error::{EmuFsError, EmuFsResult};
use crate::handle::FileHandle;
use crate::ids::{DataId, InodeId};
use crate::inode::{Inode, Stat};
use crate::resolve::{components, path_string};
use crate::store::BlobStore;
use crate::types::OpenFlags;
use crate::walk::{Walk, WalkEntry};

/// Convert a blob length to the inode's 32-bit size field.
pub(crate) fn blob_size(len: u64) -> EmuFsResult<u32> {
    u32::try_from(len).map_err(|_| EmuFsError::FileTooLarge(len))
}

/// Inode filesystem over a flat blob store.
#[derive(Debug)]
pub struct EmuFs<S> {
    store: S,
    config: EmuFsConfig,
}

impl<S: BlobStore> EmuFs<S> {
    /// Wrap a store that already holds a root directory.
    pub fn new(store: S, config: EmuFsConfig) -> Self {
        Self { store, config }
    }

    /// Wrap a store, writing an empty root directory if it has none.
    pub fn init(store: S, config: EmuFsConfig) -> EmuFsResult<Self> {
        let fs = Self::new(store, config);
        let root = InodeId::root();
        if !fs.store.exists(root.as_str()) {
            let data_id = DataId::generate();
            let table = DirTable::new().encode();
            let inode = Inode::new(
                data_id.clone(),
                blob_size(table.len() as u64)?,
                fs.config.new_dir_mode(),
            );
            fs.store.write(data_id.as_str(), &table)?;
            fs.write_inode(&root, &inode)?;
            tracing::debug!(data = %data_id, "formatted root directory");
        }
        Ok(fs)
    }

    /// Check whether the store holds a root inode.
    pub fn has_root(&self) -> bool {
        self.store.exists(InodeId::root().as_str())
    }

    /// Get the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    pub fn config(&self) -> &EmuFsConfig {
        &self.config
    }

    /// Unwrap into the underlying store.
    pub fn into_store(self) -> S {
        self.store
    }

    // ========================================================================
    // Inode and directory-table plumbing
    // ========================================================================

    pub(crate) fn read_inode(&self, id: &InodeId) -> EmuFsResult<Inode> {
        let bytes = self.store.read(id.as_str())?;
        Inode::decode(id, &bytes)
    }

    pub(crate) fn write_inode(&self, id: &InodeId, inode: &Inode) -> EmuFsResult<()> {
        self.store.write(id.as_str(), &inode.encode())?;
        Ok(())
    }

    /// Decode the entry table of a directory inode.
    ///
    /// `parts` names the directory in the `NotADirectory` error.
    pub(crate) fn read_dir_table_at(
        &self,
        id: &InodeId,
        parts: &[String],
    ) -> EmuFsResult<DirTable> {
        let inode = self.read_inode(id)?;
        self.dir_table_of(&inode, parts)
    }

    fn dir_table_of(&self, inode: &Inode, parts: &[String]) -> EmuFsResult<DirTable> {
        if !inode.is_dir() {
            return Err(EmuFsError::not_a_directory(path_string(parts)));
        }
        let bytes = self.store.read(inode.data_id.as_str())?;
        DirTable::decode(&inode.data_id, &bytes)
    }

    /// Read-modify-write one directory table, refreshing the directory
    /// inode's size and times to match the rewritten blob.
    fn update_dir_table<T>(
        &self,
        dir: &InodeId,
        parts: &[String],
        mutate: impl FnOnce(&mut DirTable) -> EmuFsResult<T>,
    ) -> EmuFsResult<T> {
        let mut inode = self.read_inode(dir)?;
        let mut table = self.dir_table_of(&inode, parts)?;
        let out = mutate(&mut table)?;

        let bytes = table.encode();
        self.store.write(inode.data_id.as_str(), &bytes)?;
        inode.size = blob_size(bytes.len() as u64)?;
        inode.touch_modified(true);
        self.write_inode(dir, &inode)?;
        Ok(out)
    }

    fn add_dir_entry(
        &self,
        dir: &InodeId,
        parts: &[String],
        name: &str,
        child: InodeId,
    ) -> EmuFsResult<Option<InodeId>> {
        self.update_dir_table(dir, parts, |table| Ok(table.insert(name, child)))
    }

    fn remove_dir_entry(
        &self,
        dir: &InodeId,
        parts: &[String],
        name: &str,
    ) -> EmuFsResult<InodeId> {
        self.update_dir_table(dir, parts, |table| {
            table.remove(name).ok_or_else(|| {
                let mut full = parts.to_vec();
                full.push(name.to_string());
                EmuFsError::no_such_entry(path_string(&full))
            })
        })
    }

    /// Create a new inode with `data` as its blob and link it into `parent`.
    ///
    /// Writes data blob, then inode record, then the parent entry, so a
    /// failure part-way leaves only unreachable blobs behind.
    pub(crate) fn allocate(
        &self,
        parent: &InodeId,
        parent_parts: &[String],
        name: &str,
        mode: u16,
        data: &[u8],
    ) -> EmuFsResult<InodeId> {
        let id = InodeId::generate();
        let data_id = DataId::generate();
        let inode = Inode::new(data_id.clone(), blob_size(data.len() as u64)?, mode);

        self.store.write(data_id.as_str(), data)?;
        self.write_inode(&id, &inode)?;
        self.add_dir_entry(parent, parent_parts, name, id.clone())?;
        Ok(id)
    }

    /// Names and kinds of a directory's children, in table order.
    pub(crate) fn scan_dir(
        &self,
        id: &InodeId,
        parts: &[String],
    ) -> EmuFsResult<(Vec<(String, InodeId)>, Vec<String>)> {
        let table = self.read_dir_table_at(id, parts)?;
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for (name, child) in table.iter() {
            if self.read_inode(child)?.is_dir() {
                dirs.push((name.to_string(), child.clone()));
            } else {
                files.push(name.to_string());
            }
        }
        Ok((dirs, files))
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Stat a path. `None` if it does not resolve.
    pub fn stat(&self, path: impl AsRef<Path>) -> EmuFsResult<Option<Stat>> {
        let Some(id) = self.resolve(path)? else {
            return Ok(None);
        };
        let inode = self.read_inode(&id)?;
        Ok(Some(Stat::from_inode(id, &inode)))
    }

    /// Check if a path exists.
    pub fn exists(&self, path: impl AsRef<Path>) -> EmuFsResult<bool> {
        Ok(self.resolve(path)?.is_some())
    }

    /// Create a directory. The parent must exist; the name must be free.
    pub fn mkdir(&self, path: impl AsRef<Path>) -> EmuFsResult<InodeId> {
        let parts = components(path.as_ref())?;
        let Some((name, parent_parts)) = parts.split_last() else {
            return Err(EmuFsError::already_exists("/"));
        };

        let parent = self
            .resolve_components(parent_parts)?
            .ok_or_else(|| EmuFsError::no_such_directory(path_string(parent_parts)))?;
        if self.read_dir_table_at(&parent, parent_parts)?.contains(name) {
            return Err(EmuFsError::already_exists(path_string(&parts)));
        }

        let table = DirTable::new().encode();
        let id = self.allocate(&parent, parent_parts, name, self.config.new_dir_mode(), &table)?;
        tracing::debug!(path = %path_string(&parts), inode = %id, "mkdir");
        Ok(id)
    }

    /// Remove a file or an empty directory.
    pub fn unlink(&self, path: impl AsRef<Path>) -> EmuFsResult<()> {
        let parts = components(path.as_ref())?;
        let Some((name, parent_parts)) = parts.split_last() else {
            return Err(EmuFsError::invalid_path("cannot unlink the root directory"));
        };

        let id = self
            .resolve_components(&parts)?
            .ok_or_else(|| EmuFsError::no_such_entry(path_string(&parts)))?;
        // TODO: resolve from the already-walked parent instead of starting over at the root.
        let parent = self
            .resolve_components(parent_parts)?
            .ok_or_else(|| EmuFsError::no_such_entry(path_string(parent_parts)))?;

        let inode = self.read_inode(&id)?;
        if inode.is_dir() && !self.dir_table_of(&inode, &parts)?.is_empty() {
            return Err(EmuFsError::directory_not_empty(path_string(&parts)));
        }

        self.store.delete(inode.data_id.as_str())?;
        self.store.delete(id.as_str())?;
        self.remove_dir_entry(&parent, parent_parts, name)?;
        tracing::debug!(path = %path_string(&parts), inode = %id, "unlink");
        Ok(())
    }

    /// Child names of a directory, in table order.
    pub fn listdir(&self, path: impl AsRef<Path>) -> EmuFsResult<Vec<String>> {
        let parts = components(path.as_ref())?;
        let id = self
            .resolve_components(&parts)?
            .ok_or_else(|| EmuFsError::no_such_directory(path_string(&parts)))?;
        let table = self.read_dir_table_at(&id, &parts)?;
        Ok(table.names().map(str::to_string).collect())
    }

    /// Depth-first walk of the tree under `path`.
    ///
    /// `topdown` yields each directory before its descendants; otherwise after.
    pub fn walk(&self, path: impl AsRef<Path>, topdown: bool) -> EmuFsResult<Walk<'_, S>> {
        let parts = components(path.as_ref())?;
        let id = self
            .resolve_components(&parts)?
            .ok_or_else(|| EmuFsError::no_such_directory(path_string(&parts)))?;
        Ok(Walk::new(self, parts, id, topdown))
    }

    /// Replace the permission byte of the mode, keeping the kind bits.
    pub fn chmod(&self, path: impl AsRef<Path>, mode: u16) -> EmuFsResult<()> {
        let parts = components(path.as_ref())?;
        let id = self
            .resolve_components(&parts)?
            .ok_or_else(|| EmuFsError::no_such_entry(path_string(&parts)))?;

        let mut inode = self.read_inode(&id)?;
        inode.set_permissions(mode);
        inode.touch_modified(false);
        self.write_inode(&id, &inode)?;
        tracing::debug!(path = %path_string(&parts), mode = %format!("{:o}", inode.mode), "chmod");
        Ok(())
    }

    /// Open a file, creating it when `flags` allow.
    pub fn open(&self, path: impl AsRef<Path>, flags: OpenFlags) -> EmuFsResult<FileHandle<'_, S>> {
        FileHandle::open(self, path.as_ref(), flags)
    }

    /// Read a whole file.
    pub fn read_file(&self, path: impl AsRef<Path>) -> EmuFsResult<Vec<u8>> {
        let mut handle = self.open(path, OpenFlags::read())?;
        let mut out = Vec::new();
        handle.read_to_end(&mut out)?;
        Ok(out)
    }

    /// Create or replace a whole file.
    pub fn write_file(&self, path: impl AsRef<Path>, data: &[u8]) -> EmuFsResult<()> {
        let mut handle = self.open(path, OpenFlags::create_truncate())?;
        handle.write_all(data)?;
        handle.close()
    }

    /// Remove a whole subtree, bottom-up.
    ///
    /// On the root only the descendants go; the root itself stays.
    pub fn remove_tree(&self, path: impl AsRef<Path>) -> EmuFsResult<()> {
        let parts = components(path.as_ref())?;
        let id = self
            .resolve_components(&parts)?
            .ok_or_else(|| EmuFsError::no_such_entry(path_string(&parts)))?;

        if self.read_inode(&id)?.is_dir() {
            self.clear_components(&parts, id)?;
        }
        if !parts.is_empty() {
            self.unlink(path_string(&parts))?;
        }
        tracing::debug!(path = %path_string(&parts), "remove_tree");
        Ok(())
    }

    /// Remove every descendant of a directory, keeping the directory.
    pub fn clear_dir(&self, path: impl AsRef<Path>) -> EmuFsResult<()> {
        let parts = components(path.as_ref())?;
        let id = self
            .resolve_components(&parts)?
            .ok_or_else(|| EmuFsError::no_such_directory(path_string(&parts)))?;
        self.clear_components(&parts, id)
    }

    fn clear_components(&self, parts: &[String], id: InodeId) -> EmuFsResult<()> {
        let entries: Vec<WalkEntry> =
            Walk::new(self, parts.to_vec(), id, false).collect::<EmuFsResult<_>>()?;
        for entry in entries {
            for name in entry.files.iter().chain(entry.dirs.iter()) {
                self.unlink(entry.path.join(name))?;
            }
        }
        Ok(())
    }
}
