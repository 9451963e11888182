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

//! Entry path checks.
//!
//! Archive readers extract names relative to a destination folder, so a
//! name that is absolute or climbs out with `..` is refused before any byte
//! of the archive is produced. Nothing is normalized: a bad name fails the
//! whole build.

use thiserror::Error;

use crate::{Result, ZipError};

/// Why a path was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathIssue {
    #[error("path is empty")]
    Empty,
    #[error("path is absolute")]
    Absolute,
    #[error("path starts with a drive prefix")]
    DrivePrefix,
    #[error("path has a `..` segment")]
    ParentSegment,
    #[error("path contains a NUL byte")]
    NulByte,
}

/// Find the first problem with `path`, if any.
///
/// Both `/` and `\` count as separators here, some extractors honour either.
pub fn check_path(path: &str) -> Option<PathIssue> {
    if path.is_empty() {
        return Some(PathIssue::Empty);
    }
    if path.starts_with('/') || path.starts_with('\\') {
        return Some(PathIssue::Absolute);
    }
    // `x:name` is relative to drive x's current folder on Windows
    if has_drive_prefix(path) {
        return Some(PathIssue::DrivePrefix);
    }
    if path.contains('\0') {
        return Some(PathIssue::NulByte);
    }
    if path.split(['/', '\\']).any(|segment| segment == "..") {
        return Some(PathIssue::ParentSegment);
    }
    None
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Validate the path of the entry at `index`, including the 16 bit name length limit.
pub fn validate_entry_path(index: usize, path: &str) -> Result<()> {
    if let Some(reason) = check_path(path) {
        return Err(ZipError::UnsafePath {
            index,
            path: path.to_owned(),
            reason,
        });
    }
    if path.len() > u16::MAX as usize {
        return Err(ZipError::PathTooLong {
            index,
            len: path.len(),
        });
    }
    Ok(())
}

/// Place `path` under the folder `root`.
pub fn join_root(root: &str, path: &str) -> String {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        path.to_owned()
    } else {
        format!("{}/{}", root, path)
    }
}
