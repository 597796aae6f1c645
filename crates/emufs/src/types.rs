//! Open flags shared by the file handle and the blob stores.

use std::str::FromStr;

use crate::error::EmuFsError;

/// How a file blob is opened, in fopen terms.
///
/// `append` implies `write`; `create` and `truncate` need one of them.
/// The default is read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    /// Every write lands at the current end of data.
    pub append: bool,
    /// Allocate the file when the path does not resolve.
    pub create: bool,
    /// Drop existing data on open.
    pub truncate: bool,
    /// With `create`: fail if the path already resolves.
    pub exclusive: bool,
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self::read()
    }
}

impl OpenFlags {
    const NONE: Self = Self {
        read: false,
        write: false,
        append: false,
        create: false,
        truncate: false,
        exclusive: false,
    };

    /// `r`
    pub fn read() -> Self {
        Self {
            read: true,
            ..Self::NONE
        }
    }

    /// `r+`: read and write an existing file.
    pub fn write() -> Self {
        Self {
            write: true,
            ..Self::read()
        }
    }

    /// Read and write, allocating the file if needed.
    pub fn create() -> Self {
        Self {
            create: true,
            ..Self::write()
        }
    }

    /// `a+`
    pub fn append() -> Self {
        Self {
            append: true,
            ..Self::create()
        }
    }

    /// `x+`
    pub fn create_exclusive() -> Self {
        Self {
            exclusive: true,
            ..Self::create()
        }
    }

    /// `w+`
    pub fn create_truncate() -> Self {
        Self {
            truncate: true,
            ..Self::create()
        }
    }

    /// Returns true if the flags allow any mutation of the data.
    pub fn writes(&self) -> bool {
        self.write || self.append
    }
}

/// Parse fopen-style mode strings: `r`, `w`, `a`, `x`, each optionally
/// followed by `+`, with `b` accepted anywhere and ignored.
impl FromStr for OpenFlags {
    type Err = EmuFsError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        let plus = mode.contains('+');
        let base: String = mode.chars().filter(|c| !matches!(c, 'b' | '+')).collect();

        let flags = match base.as_str() {
            "r" => Self {
                read: true,
                write: plus,
                ..Self::NONE
            },
            "w" => Self {
                read: plus,
                write: true,
                create: true,
                truncate: true,
                ..Self::NONE
            },
            "a" => Self {
                read: plus,
                write: true,
                append: true,
                create: true,
                ..Self::NONE
            },
            "x" => Self {
                read: plus,
                write: true,
                create: true,
                exclusive: true,
                ..Self::NONE
            },
            _ => return Err(EmuFsError::InvalidMode(mode.to_string())),
        };

        if mode.matches('+').count() > 1 {
            return Err(EmuFsError::InvalidMode(mode.to_string()));
        }
        Ok(flags)
    }
}
