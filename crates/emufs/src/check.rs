//! Consistency checking.

use std::collections::HashSet;
use std::io;
use std::path::PathBuf;

use crate::dir_table::DirTable;
use crate::error::EmuFsResult;
use crate::fs::EmuFs;
use crate::ids::InodeId;
use crate::inode::Inode;
use crate::resolve::path_string;
use crate::store::BlobStore;

/// An inode whose recorded size disagrees with its data blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeMismatch {
    pub path: PathBuf,
    pub inode: InodeId,
    pub recorded: u32,
    pub actual: u64,
}

/// Findings of [`EmuFs::check`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Inodes reachable from the root, root included.
    pub inodes: usize,
    /// Blob keys no reachable inode refers to, sorted.
    pub orphans: Vec<String>,
    pub size_mismatches: Vec<SizeMismatch>,
    /// Paths whose inode record or data blob is missing.
    pub dangling: Vec<PathBuf>,
    /// Paths leading to an inode already visited under another path.
    pub repeated: Vec<PathBuf>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.orphans.is_empty()
            && self.size_mismatches.is_empty()
            && self.dangling.is_empty()
            && self.repeated.is_empty()
    }
}

fn missing(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
}

impl<S: BlobStore> EmuFs<S> {
    /// Walk every inode reachable from the root and compare against the
    /// store's keys.
    ///
    /// Corrupt inode records and directory tables abort the check; missing
    /// blobs are reported. Each inode is visited once, so cyclic tables
    /// terminate.
    pub fn check(&self) -> EmuFsResult<CheckReport> {
        let mut report = CheckReport::default();
        let mut reachable = HashSet::new();
        let mut pending = vec![(Vec::<String>::new(), InodeId::root())];

        while let Some((parts, id)) = pending.pop() {
            let path = PathBuf::from(path_string(&parts));
            if !reachable.insert(id.as_str().to_string()) {
                tracing::warn!(path = %path.display(), inode = %id, "inode reached twice");
                report.repeated.push(path);
                continue;
            }
            let bytes = match self.store().read(id.as_str()) {
                Ok(bytes) => bytes,
                Err(e) if missing(&e) => {
                    tracing::warn!(path = %path.display(), inode = %id, "inode record missing");
                    report.dangling.push(path);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let inode = Inode::decode(&id, &bytes)?;
            reachable.insert(inode.data_id.as_str().to_string());
            report.inodes += 1;

            let data = match self.store().read(inode.data_id.as_str()) {
                Ok(data) => data,
                Err(e) if missing(&e) => {
                    tracing::warn!(
                        path = %path.display(),
                        data = %inode.data_id,
                        "data blob missing"
                    );
                    report.dangling.push(path);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if data.len() as u64 != u64::from(inode.size) {
                tracing::warn!(
                    path = %path.display(),
                    recorded = inode.size,
                    actual = data.len(),
                    "size mismatch"
                );
                report.size_mismatches.push(SizeMismatch {
                    path: path.clone(),
                    inode: id.clone(),
                    recorded: inode.size,
                    actual: data.len() as u64,
                });
            }

            if inode.is_dir() {
                let table = DirTable::decode(&inode.data_id, &data)?;
                // Reverse so children pop in table order.
                for (name, child) in table.iter().collect::<Vec<_>>().into_iter().rev() {
                    let mut child_parts = parts.clone();
                    child_parts.push(name.to_string());
                    pending.push((child_parts, child.clone()));
                }
            }
        }

        report.orphans = self
            .store()
            .keys()?
            .into_iter()
            .filter(|key| !reachable.contains(key))
            .collect();
        report.orphans.sort();
        for key in &report.orphans {
            tracing::warn!(key = %key, "orphan blob");
        }

        tracing::debug!(
            inodes = report.inodes,
            orphans = report.orphans.len(),
            mismatches = report.size_mismatches.len(),
            dangling = report.dangling.len(),
            repeated = report.repeated.len(),
            "check complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmuFsConfig;
    use crate::store::MemoryBlobStore;

    fn sample() -> (MemoryBlobStore, EmuFs<MemoryBlobStore>) {
        let store = MemoryBlobStore::new();
        let fs = EmuFs::init(store.clone(), EmuFsConfig::default()).unwrap();
        fs.mkdir("/a").unwrap();
        fs.write_file("/a/f.txt", b"hello").unwrap();
        (store, fs)
    }

    #[test]
    fn test_clean_tree() {
        let (_, fs) = sample();
        let report = fs.check().unwrap();
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(report.inodes, 3);
    }

    #[test]
    fn test_orphan_blob() {
        let (store, fs) = sample();
        store.write("stray", b"x").unwrap();
        let report = fs.check().unwrap();
        assert_eq!(report.orphans, vec!["stray".to_string()]);
    }

    #[test]
    fn test_size_mismatch() {
        let (store, fs) = sample();
        let stat = fs.stat("/a/f.txt").unwrap().unwrap();
        let inode = fs.read_inode(&stat.ino).unwrap();
        store.write(inode.data_id.as_str(), b"hello, world").unwrap();

        let report = fs.check().unwrap();
        assert_eq!(report.size_mismatches.len(), 1);
        let mismatch = &report.size_mismatches[0];
        assert_eq!(mismatch.path, PathBuf::from("/a/f.txt"));
        assert_eq!(mismatch.recorded, 5);
        assert_eq!(mismatch.actual, 12);
    }

    #[test]
    fn test_dangling_entry() {
        let (store, fs) = sample();
        let stat = fs.stat("/a/f.txt").unwrap().unwrap();
        let inode = fs.read_inode(&stat.ino).unwrap();
        store.delete(stat.ino.as_str()).unwrap();

        let report = fs.check().unwrap();
        assert_eq!(report.dangling, vec![PathBuf::from("/a/f.txt")]);
        // The data blob lost its only referent.
        assert_eq!(report.orphans, vec![inode.data_id.as_str().to_string()]);
    }

    #[test]
    fn test_cyclic_table_terminates() {
        let (_, fs) = sample();
        // Hand-edit /a's table so an entry points back at the root.
        let a = fs.resolve("/a").unwrap().unwrap();
        let inode = fs.read_inode(&a).unwrap();
        let mut table = fs.read_dir_table_at(&a, &["a".to_string()]).unwrap();
        table.insert("loop", InodeId::root());
        let bytes = table.encode();
        fs.store().write(inode.data_id.as_str(), &bytes).unwrap();
        let mut inode = inode;
        inode.size = bytes.len() as u32;
        fs.write_inode(&a, &inode).unwrap();

        let report = fs.check().unwrap();
        assert_eq!(report.repeated, vec![PathBuf::from("/a/loop")]);
        assert_eq!(report.inodes, 3);
        assert!(report.size_mismatches.is_empty());
        assert!(!report.is_clean());
    }
}
