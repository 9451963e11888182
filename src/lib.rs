/*
   Stored zip archive writer, in pure Rust.
   Copyright (C) 2022 Matheus Xavier <mxavier@neonimp.com>

   This program is free software: you can redistribute it and/or modify
   it under the terms of the GNU Lesser General Public License as published by
   the Free Software Foundation, either version 3 of the License, or
   (at your option) any later version.

   This program is distributed in the hope that it will be useful,
   but WITHOUT ANY WARRANTY; without even the implied warranty of
   MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
   GNU General Public License for more details.

   You should have received a copy of the GNU Lesser General Public License
   along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

//! Builds ZIP archives from an ordered list of named byte payloads.
//!
//! Every entry is written with the "stored" method (no compression), so the
//! output is a single flat buffer that any archive reader can open:
//!
//! ```
//! use forgezip::{build_archive, Entry};
//!
//! let entries = vec![
//!     Entry::new("my-server/README.md", b"# my-server\n".to_vec()),
//!     Entry::new("my-server/.gitignore", b"dist/\n".to_vec()),
//! ];
//! let bytes = build_archive(&entries).unwrap();
//! assert_eq!(&bytes[..4], &[0x50, 0x4b, 0x03, 0x04]);
//! ```

use thiserror::Error;

pub mod checksum;
pub mod int_util;
pub mod path;
pub mod structures;
pub mod writer;

#[cfg(feature = "ffi")]
pub mod ffi;

pub use checksum::checksum;
pub use structures::Entry;
pub use writer::{build_archive, write_archive, ArchiveBuilder};

pub const EOCD_SIG: u32 = 0x06054b50;
pub const CD_SIG: u32 = 0x02014b50;
pub const LFH_SIG: u32 = 0x04034b50;

/// Version 2.0, the lowest version that knows about folders and stored entries.
pub const ZIP_VERSION: u16 = 20;
/// Compression method 0, data is embedded verbatim.
pub const METHOD_STORED: u16 = 0;

pub const LFH_LEN: usize = 30;
pub const CD_LEN: usize = 46;
pub const EOCD_LEN: usize = 22;

/// Largest entry count the 16 bit EOCD fields can carry.
pub const MAX_ENTRIES: usize = u16::MAX as usize;
/// Largest size or offset a 32 bit field can carry.
pub const MAX_FIELD_SIZE: u64 = u32::MAX as u64;

/// Media type of the produced buffer.
pub const MEDIA_TYPE: &str = "application/zip";

#[derive(Debug, Error)]
pub enum ZipError {
    #[error("IO exception: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Unsafe path for entry {index} ({path:?}): {reason}")]
    UnsafePath {
        index: usize,
        path: String,
        reason: path::PathIssue,
    },
    #[error("Path of entry {index} is {len} bytes, the limit is 65535")]
    PathTooLong { index: usize, len: usize },
    #[error("Entry {index} holds {size} bytes, archive too large for this format variant")]
    EntryTooLarge { index: usize, size: u64 },
    #[error("{0} entries requested, archive too large for this format variant")]
    TooManyEntries(usize),
    #[error("Archive needs {0} bytes of addressable space, archive too large for this format variant")]
    ArchiveTooLarge(u64),
    #[error("Entry name is not valid UTF-8: {0}")]
    InvalidName(#[from] std::str::Utf8Error),
    #[error("Entry {second} duplicates the path {path:?} of entry {first}")]
    DuplicateEntry {
        first: usize,
        second: usize,
        path: String,
    },
}

impl ZipError {
    /// Stable numeric code, used by the C interface.
    pub fn error_code(&self) -> u32 {
        match self {
            ZipError::IOError(_) => 0x01,
            ZipError::UnsafePath { .. } => 0x10,
            ZipError::PathTooLong { .. } => 0x11,
            ZipError::DuplicateEntry { .. } => 0x12,
            ZipError::InvalidName(_) => 0x13,
            ZipError::EntryTooLarge { .. } => 0x20,
            ZipError::TooManyEntries(_) => 0x21,
            ZipError::ArchiveTooLarge(_) => 0x22,
        }
    }

    /// Index of the entry that caused the error, when there is one.
    pub fn entry_index(&self) -> Option<usize> {
        match self {
            ZipError::UnsafePath { index, .. }
            | ZipError::PathTooLong { index, .. }
            | ZipError::EntryTooLarge { index, .. } => Some(*index),
            ZipError::DuplicateEntry { second, .. } => Some(*second),
            _ => None,
        }
    }
}

impl PartialEq for ZipError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ZipError::IOError(a), ZipError::IOError(b)) => a.kind() == b.kind(),
            (
                ZipError::UnsafePath { index: a, path: b, reason: c },
                ZipError::UnsafePath { index: d, path: e, reason: f },
            ) => a == d && b == e && c == f,
            (
                ZipError::PathTooLong { index: a, len: b },
                ZipError::PathTooLong { index: c, len: d },
            ) => a == c && b == d,
            (
                ZipError::EntryTooLarge { index: a, size: b },
                ZipError::EntryTooLarge { index: c, size: d },
            ) => a == c && b == d,
            (ZipError::InvalidName(a), ZipError::InvalidName(b)) => a == b,
            (ZipError::TooManyEntries(a), ZipError::TooManyEntries(b)) => a == b,
            (ZipError::ArchiveTooLarge(a), ZipError::ArchiveTooLarge(b)) => a == b,
            (
                ZipError::DuplicateEntry { first: a, second: b, path: c },
                ZipError::DuplicateEntry { first: d, second: e, path: f },
            ) => a == d && b == e && c == f,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ZipError>;
