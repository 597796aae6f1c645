//! Lazy depth-first traversal.
//!
//! Directories are entered by inode id, not by re-resolving their path, so a
//! walk costs one table decode (plus one inode read per child) per directory.

use std::iter::FusedIterator;
use std::path::PathBuf;

use crate::error::EmuFsResult;
use crate::fs::EmuFs;
use crate::ids::InodeId;
use crate::resolve::path_string;
use crate::store::BlobStore;

/// One directory visited by a [`Walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Absolute path of the directory.
    pub path: PathBuf,
    /// Child directory names, in table order.
    pub dirs: Vec<String>,
    /// Child file names, in table order.
    pub files: Vec<String>,
}

struct Frame {
    parts: Vec<String>,
    /// Held back until the children are done (bottom-up only).
    entry: Option<WalkEntry>,
    children: std::vec::IntoIter<(String, InodeId)>,
}

/// Iterator returned by [`EmuFs::walk`].
///
/// Yields an error at most once and then stops.
pub struct Walk<'a, S: BlobStore> {
    fs: &'a EmuFs<S>,
    topdown: bool,
    pending: Option<(Vec<String>, InodeId)>,
    stack: Vec<Frame>,
    failed: bool,
}

impl<'a, S: BlobStore> Walk<'a, S> {
    pub(crate) fn new(fs: &'a EmuFs<S>, parts: Vec<String>, id: InodeId, topdown: bool) -> Self {
        Self {
            fs,
            topdown,
            pending: Some((parts, id)),
            stack: Vec::new(),
            failed: false,
        }
    }

    fn enter(&mut self, parts: Vec<String>, id: &InodeId) -> EmuFsResult<Option<WalkEntry>> {
        let (dirs, files) = self.fs.scan_dir(id, &parts)?;
        let entry = WalkEntry {
            path: PathBuf::from(path_string(&parts)),
            dirs: dirs.iter().map(|(name, _)| name.clone()).collect(),
            files,
        };

        let (yield_now, held) = if self.topdown {
            (Some(entry), None)
        } else {
            (None, Some(entry))
        };
        self.stack.push(Frame {
            parts,
            entry: held,
            children: dirs.into_iter(),
        });
        Ok(yield_now)
    }
}

impl<S: BlobStore> Iterator for Walk<'_, S> {
    type Item = EmuFsResult<WalkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some((parts, id)) = self.pending.take() {
                match self.enter(parts, &id) {
                    Ok(Some(entry)) => return Some(Ok(entry)),
                    Ok(None) => {}
                    Err(e) => {
                        self.failed = true;
                        self.stack.clear();
                        return Some(Err(e));
                    }
                }
            }

            let frame = self.stack.last_mut()?;
            if let Some((name, id)) = frame.children.next() {
                let mut parts = frame.parts.clone();
                parts.push(name);
                self.pending = Some((parts, id));
                continue;
            }

            if let Some(entry) = self.stack.pop().and_then(|frame| frame.entry) {
                return Some(Ok(entry));
            }
        }
    }
}

impl<S: BlobStore> FusedIterator for Walk<'_, S> {}
