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

//! This module contains the C interface for the library.
//! the functions are exported as C symbols and can be used from C/C++.
//! this is an inherently unsafe module, as it is interfacing with C code.
//!
//! A caller creates a handle with [`zip_archive_new`], adds entries, calls
//! [`zip_archive_build`] and releases the returned buffer with
//! [`zip_buffer_free`]. When a call fails the error is kept on the handle
//! until the next call that succeeds.

use std::io;
use std::ptr::{null, null_mut};

use libc::{c_char, c_uchar, size_t};

use crate::writer::ArchiveBuilder;
use crate::{Result, ZipError};

#[repr(C)]
pub struct IZipArchive {
    builder: ArchiveBuilder,
    error: Option<ZipError>,
}

impl IZipArchive {
    fn record<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.error = None;
                Some(value)
            }
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }
}

/// Borrow `len` bytes from C, a null pointer is only accepted for an empty slice.
unsafe fn c_bytes<'a>(ptr: *const c_uchar, len: size_t) -> Result<&'a [u8]> {
    if ptr.is_null() {
        return if len == 0 {
            Ok(&[])
        } else {
            Err(ZipError::IOError(io::Error::new(
                io::ErrorKind::InvalidInput,
                "null pointer with a non-zero length",
            )))
        };
    }
    Ok(std::slice::from_raw_parts(ptr, len))
}

/// Creates an empty archive handle, release it with [`zip_archive_close`].
#[no_mangle]
pub extern "C" fn zip_archive_new() -> *mut IZipArchive {
    let archive = Box::new(IZipArchive {
        builder: ArchiveBuilder::new(),
        error: None,
    });
    Box::into_raw(archive)
}

/// Sets the folder every entry added afterwards is placed under.
/// An empty root clears it.
#[no_mangle]
pub unsafe extern "C" fn zip_archive_set_root(
    archive: *mut IZipArchive,
    root: *const c_uchar,
    root_len: size_t,
) -> bool {
    let archive = if !archive.is_null() {
        &mut *archive
    } else { return false; };

    let root = c_bytes(root, root_len)
        .and_then(|root| std::str::from_utf8(root).map_err(ZipError::from));
    match archive.record(root) {
        Some(root) => {
            archive.builder.set_root(Some(root.to_owned()));
            true
        }
        None => false,
    }
}

/// Appends one entry. The path and contents are copied, the caller keeps ownership.
#[no_mangle]
pub unsafe extern "C" fn zip_archive_add_entry(
    archive: *mut IZipArchive,
    path: *const c_uchar,
    path_len: size_t,
    content: *const c_uchar,
    content_len: size_t,
) -> bool {
    let archive = if !archive.is_null() {
        &mut *archive
    } else { return false; };

    let entry = c_bytes(path, path_len).and_then(|path| {
        let path = std::str::from_utf8(path)?;
        Ok((path, c_bytes(content, content_len)?))
    });
    match archive.record(entry) {
        Some((path, content)) => {
            archive.builder.add_file(path, content);
            true
        }
        None => false,
    }
}

/// Builds the archive.
///
/// On success the buffer is returned and its length stored in `out_len`, the
/// buffer must be released with [`zip_buffer_free`].
/// On failure null is returned and the error can be read with [`zip_archive_get_error`].
#[no_mangle]
pub unsafe extern "C" fn zip_archive_build(
    archive: *mut IZipArchive,
    out_len: *mut size_t,
) -> *mut c_uchar {
    let archive = if !archive.is_null() {
        &mut *archive
    } else { return null_mut(); };
    if out_len.is_null() {
        return null_mut();
    }

    let built = archive.builder.build();
    match archive.record(built) {
        Some(buf) => {
            let buf = buf.into_boxed_slice();
            *out_len = buf.len();
            Box::into_raw(buf) as *mut c_uchar
        }
        None => null_mut(),
    }
}

/// Releases a buffer returned by [`zip_archive_build`].
#[no_mangle]
pub unsafe extern "C" fn zip_buffer_free(buf: *mut c_uchar, len: size_t) {
    if buf.is_null() {
        return;
    }
    drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(buf, len)));
}

#[no_mangle]
pub unsafe extern "C" fn zip_archive_close(archive: *mut IZipArchive) {
    let archive = if !archive.is_null() {
        Box::from_raw(archive)
    } else { return; };

    // Drop the archive
    drop(archive);
}

#[no_mangle]
#[inline]
pub unsafe extern "C" fn zip_archive_get_error(archive: *const IZipArchive) -> *const ZipError {
    let archive = if !archive.is_null() {
        &*archive
    } else { return null(); };

    if let Some(error) = &archive.error {
        error
    } else { null() }
}

/// Gets the numeric code of a ZipError, 0 for a null error.
#[no_mangle]
#[inline]
pub unsafe extern "C" fn zip_error_get_code(error: *const ZipError) -> u32 {
    if error.is_null() {
        return 0;
    }
    (*error).error_code()
}

/// Gets the error message from a ZipError.
/// The error message is copied to the buffer passed in from C, it is not NUL terminated.
///
/// If the buffer is not large enough, nothing is copied and the function returns the required size.
///
/// If the message is successfully copied, the function returns the size of the message.
///
/// On error the function returns usize::MAX.
#[no_mangle]
#[inline]
pub unsafe extern "C" fn zip_error_get_message(
    error: *const ZipError,
    out_buf: *mut c_char,
    out_max: usize,
) -> usize {
    let error = if !error.is_null() {
        &*error
    } else { return !0; };
    let error_str = error.to_string();
    let error = error_str.as_bytes();
    let out_buf = if !out_buf.is_null() {
        std::slice::from_raw_parts_mut(out_buf, out_max)
    } else { return !0; };

    if error.len() > out_max {
        return error.len();
    }

    for (i, b) in error.iter().enumerate() {
        out_buf[i] = *b as c_char;
    }

    error.len()
}
