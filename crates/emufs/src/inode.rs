//! Inode records and their on-disk encoding.
//!
//! An inode record is a fixed 30-byte little-endian header followed by the
//! ASCII `data_id` with no length prefix:
//!
//! ```text
//! offset  size  field
//!      0     4  size   (u32)
//!      4     2  mode   (u16)
//!      6     8  atime  (f64, ms since epoch)
//!     14     8  mtime  (f64, ms since epoch)
//!     22     8  ctime  (f64, ms since epoch)
//!     30     *  data_id
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{EmuFsError, EmuFsResult};
use crate::ids::{DataId, InodeId};

/// Bits of `mode` that select the object kind.
pub const KIND_MASK: u16 = 0xF000;
/// Kind tag for directories.
pub const DIR_TAG: u16 = 0x4000;
/// Kind tag for regular files.
pub const FILE_TAG: u16 = 0x8000;
/// Bits of `mode` replaced by chmod.
pub const PERM_MASK: u16 = 0x00FF;

/// Length of the fixed header preceding `data_id`.
pub const HEADER_LEN: usize = 4 + 2 + 8 * 3;

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// Metadata for one file or directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Inode {
    /// Key of the data blob.
    pub data_id: DataId,
    /// Byte length of the data blob.
    pub size: u32,
    /// Kind tag plus permission bits.
    pub mode: u16,
    pub atime: f64,
    pub mtime: f64,
    pub ctime: f64,
}

impl Inode {
    /// Create an inode with all three timestamps set to now.
    pub fn new(data_id: DataId, size: u32, mode: u16) -> Self {
        let now = now_millis();
        Self {
            data_id,
            size,
            mode,
            atime: now,
            mtime: now,
            ctime: now,
        }
    }

    /// Decode a record read from the blob store.
    pub fn decode(id: &InodeId, bytes: &[u8]) -> EmuFsResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(EmuFsError::corrupt_inode(
                id.as_str(),
                format!("record is {} bytes, header needs {HEADER_LEN}", bytes.len()),
            ));
        }

        let (header, trailer) = bytes.split_at(HEADER_LEN);
        if !trailer.is_ascii() {
            return Err(EmuFsError::corrupt_inode(id.as_str(), "data id is not ASCII"));
        }

        let f64_at = |at: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&header[at..at + 8]);
            f64::from_le_bytes(buf)
        };

        Ok(Self {
            size: u32::from_le_bytes([header[0], header[1], header[2], header[3]]),
            mode: u16::from_le_bytes([header[4], header[5]]),
            atime: f64_at(6),
            mtime: f64_at(14),
            ctime: f64_at(22),
            // ASCII was checked above, so this is lossless.
            data_id: DataId::from_key(String::from_utf8_lossy(trailer).into_owned()),
        })
    }

    /// Encode to the on-disk record.
    pub fn encode(&self) -> Vec<u8> {
        let id = self.data_id.as_str().as_bytes();
        let mut out = Vec::with_capacity(HEADER_LEN + id.len());
        out.extend_from_slice(&self.size.to_le_bytes());
        out.extend_from_slice(&self.mode.to_le_bytes());
        out.extend_from_slice(&self.atime.to_le_bytes());
        out.extend_from_slice(&self.mtime.to_le_bytes());
        out.extend_from_slice(&self.ctime.to_le_bytes());
        out.extend_from_slice(id);
        out
    }

    /// Returns true if the kind bits mark a directory.
    pub fn is_dir(&self) -> bool {
        self.mode & KIND_MASK == DIR_TAG
    }

    /// Returns true if the kind bits mark a regular file.
    pub fn is_file(&self) -> bool {
        self.mode & KIND_MASK == FILE_TAG
    }

    /// Replace the permission byte, keeping the kind bits.
    pub fn set_permissions(&mut self, perm: u16) {
        self.mode = (self.mode & !PERM_MASK) | (perm & PERM_MASK);
    }

    /// Record a change. `data` also bumps `mtime`; `ctime` always moves.
    pub fn touch_modified(&mut self, data: bool) {
        let now = now_millis();
        if data {
            self.mtime = now;
        }
        self.ctime = now;
    }

    /// Record a data read.
    pub fn touch_accessed(&mut self) {
        self.atime = now_millis();
    }
}

/// Read-only projection of an inode returned to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    pub ino: InodeId,
    pub mode: u16,
    pub size: u32,
    pub atime: f64,
    pub mtime: f64,
    pub ctime: f64,
}

impl Stat {
    pub fn from_inode(ino: InodeId, inode: &Inode) -> Self {
        Self {
            ino,
            mode: inode.mode,
            size: inode.size,
            atime: inode.atime,
            mtime: inode.mtime,
            ctime: inode.ctime,
        }
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.mode & KIND_MASK == DIR_TAG
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.mode & KIND_MASK == FILE_TAG
    }

    /// The permission byte.
    pub fn permissions(&self) -> u16 {
        self.mode & PERM_MASK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(mode: u16) -> Inode {
        Inode {
            data_id: DataId::from_key("0b6f1a5e-3c7d-4c1e-9d7a-2f4e8b9c1d0a"),
            size: 42,
            mode,
            atime: 1.5,
            mtime: 2.25,
            ctime: 3.125,
        }
    }

    #[test]
    fn test_round_trip() {
        let id = InodeId::generate();
        let inode = sample(FILE_TAG | 0o644);
        let bytes = inode.encode();
        assert_eq!(bytes.len(), HEADER_LEN + 36);
        assert_eq!(Inode::decode(&id, &bytes).unwrap(), inode);
    }

    #[test]
    fn test_round_trip_boundaries() {
        let id = InodeId::root();
        let inode = Inode {
            data_id: DataId::from_key(""),
            size: u32::MAX,
            mode: u16::MAX,
            atime: 0.0,
            mtime: f64::MAX,
            ctime: -1.0,
        };
        assert_eq!(Inode::decode(&id, &inode.encode()).unwrap(), inode);
    }

    #[test]
    fn test_layout_matches_header() {
        let bytes = sample(DIR_TAG | 0o755).encode();
        assert_eq!(&bytes[0..4], &42u32.to_le_bytes());
        assert_eq!(&bytes[4..6], &(DIR_TAG | 0o755).to_le_bytes());
        assert_eq!(&bytes[6..14], &1.5f64.to_le_bytes());
        assert_eq!(&bytes[30..], b"0b6f1a5e-3c7d-4c1e-9d7a-2f4e8b9c1d0a");
    }

    #[test]
    fn test_short_record_is_corrupt() {
        let err = Inode::decode(&InodeId::root(), &[0u8; HEADER_LEN - 1]).unwrap_err();
        assert!(matches!(err, EmuFsError::CorruptInode { .. }));
    }

    #[test]
    fn test_non_ascii_data_id_is_corrupt() {
        let mut bytes = sample(FILE_TAG).encode();
        bytes.push(0xFF);
        let err = Inode::decode(&InodeId::root(), &bytes).unwrap_err();
        assert!(matches!(err, EmuFsError::CorruptInode { .. }));
    }

    #[test]
    fn test_kind_classification() {
        assert!(sample(DIR_TAG | 0o755).is_dir());
        assert!(!sample(DIR_TAG | 0o755).is_file());
        assert!(sample(FILE_TAG | 0o644).is_file());
        assert!(!sample(0o644).is_file());
        assert!(!sample(0o644).is_dir());
    }

    #[test]
    fn test_set_permissions_keeps_kind() {
        let mut inode = sample(DIR_TAG | 0o755);
        inode.set_permissions(0o000);
        assert!(inode.is_dir());
        assert_eq!(inode.mode & PERM_MASK, 0);
        // Bit 0o400 lives above the permission byte and survives.
        assert_eq!(inode.mode, DIR_TAG | 0o400);
    }

    #[test]
    fn test_touch_modified() {
        let mut inode = sample(FILE_TAG);
        inode.touch_modified(false);
        assert_eq!(inode.mtime, 2.25);
        assert!(inode.ctime > 3.125);

        inode.touch_modified(true);
        assert_eq!(inode.mtime, inode.ctime);
    }

    #[test]
    fn test_new_sets_equal_times() {
        let inode = Inode::new(DataId::generate(), 0, FILE_TAG | 0o644);
        assert_eq!(inode.atime, inode.mtime);
        assert_eq!(inode.mtime, inode.ctime);
    }

    #[test]
    fn test_stat_projection() {
        let inode = sample(FILE_TAG | 0o644);
        let stat = Stat::from_inode(InodeId::from_key("i"), &inode);
        assert!(stat.is_file());
        assert_eq!(stat.size, 42);
        assert_eq!(stat.permissions(), 0o644 & PERM_MASK);
    }
}
