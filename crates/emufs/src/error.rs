//! Filesystem error types.

use std::io;
use thiserror::Error;

/// Filesystem error type.
#[derive(Debug, Error)]
pub enum EmuFsError {
    /// Path does not resolve to anything.
    #[error("no such file or directory: {0}")]
    NoSuchEntry(String),

    /// Path was required to be an existing directory.
    #[error("no such directory: {0}")]
    NoSuchDirectory(String),

    /// Path was required to be an existing file.
    #[error("no such file: {0}")]
    NoSuchFile(String),

    /// Exclusive creation hit an existing entry.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Unlink of a directory that still has entries.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// Expected a directory, found a file.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file, found a directory.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Inode record could not be decoded.
    #[error("corrupt inode {id}: {reason}")]
    CorruptInode { id: String, reason: String },

    /// Directory table could not be decoded.
    #[error("corrupt directory table {id}: {source}")]
    CorruptDirectory {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Path cannot be used for this operation.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Unrecognized fopen-style mode string.
    #[error("invalid open mode: {0:?}")]
    InvalidMode(String),

    /// Data blob outgrew the 32-bit size field.
    #[error("file too large: {0} bytes")]
    FileTooLarge(u64),

    /// Configuration file could not be parsed.
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    /// Archive container error.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// I/O error from the blob store.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EmuFsError {
    /// Create a NoSuchEntry error.
    pub fn no_such_entry(path: impl Into<String>) -> Self {
        Self::NoSuchEntry(path.into())
    }

    /// Create a NoSuchDirectory error.
    pub fn no_such_directory(path: impl Into<String>) -> Self {
        Self::NoSuchDirectory(path.into())
    }

    /// Create a NoSuchFile error.
    pub fn no_such_file(path: impl Into<String>) -> Self {
        Self::NoSuchFile(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a DirectoryNotEmpty error.
    pub fn directory_not_empty(path: impl Into<String>) -> Self {
        Self::DirectoryNotEmpty(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create a CorruptInode error.
    pub fn corrupt_inode(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptInode {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Returns true for the "path does not resolve" family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoSuchEntry(_) | Self::NoSuchDirectory(_) | Self::NoSuchFile(_)
        )
    }
}

/// Convert EmuFsError to std::io::Error so file handles can implement `Read`/`Write`.
impl From<EmuFsError> for io::Error {
    fn from(e: EmuFsError) -> Self {
        match e {
            EmuFsError::NoSuchEntry(msg)
            | EmuFsError::NoSuchDirectory(msg)
            | EmuFsError::NoSuchFile(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            EmuFsError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            EmuFsError::DirectoryNotEmpty(msg) => {
                io::Error::new(io::ErrorKind::DirectoryNotEmpty, msg)
            }
            EmuFsError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            EmuFsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            EmuFsError::InvalidPath(msg) | EmuFsError::InvalidMode(msg) => {
                io::Error::new(io::ErrorKind::InvalidInput, msg)
            }
            EmuFsError::FileTooLarge(size) => io::Error::new(
                io::ErrorKind::FileTooLarge,
                format!("file too large: {size} bytes"),
            ),
            e @ (EmuFsError::CorruptInode { .. } | EmuFsError::CorruptDirectory { .. }) => {
                io::Error::new(io::ErrorKind::InvalidData, e)
            }
            EmuFsError::Io(e) => e,
            other => io::Error::other(other),
        }
    }
}

/// Filesystem result type.
pub type EmuFsResult<T> = Result<T, EmuFsError>;
