//! Typed identifiers for inode records and data blobs.
//!
//! Both wrap opaque ASCII strings. They are the blob-store keys, so the two
//! namespaces share one flat directory; keeping them as distinct types stops a
//! data id from being used where an inode id is expected.
//!
//! Fresh ids are hyphenated UUIDv4 text. The root directory uses the reserved
//! inode id `"/"` instead of a generated one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved inode id of the root directory.
pub const ROOT_INODE_ID: &str = "/";

/// Key of an inode record.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InodeId(String);

/// Key of an inode's data blob (file bytes or directory table).
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataId(String);

macro_rules! impl_blob_key {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Allocate a fresh random id.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().hyphenated().to_string())
            }

            /// Wrap an existing key (as read back from a record or table).
            pub fn from_key(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// The blob-store key.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $T {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.0)
            }
        }
    };
}

impl_blob_key!(InodeId, "InodeId");
impl_blob_key!(DataId, "DataId");

impl InodeId {
    /// The root directory's inode id.
    pub fn root() -> Self {
        Self(ROOT_INODE_ID.to_string())
    }

    /// Check if this is the root id.
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_INODE_ID
    }
}
