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

use crate::int_util::{write_u16_le, write_u32_le};
use crate::{CD_LEN, CD_SIG, EOCD_LEN, EOCD_SIG, LFH_LEN, LFH_SIG, METHOD_STORED, ZIP_VERSION};

/// One named payload to be placed in the archive.
///
/// Names are stored as given. Two entries with the same path produce a
/// valid archive whose readers will disagree on which one wins, keeping
/// names unique is up to the caller (or see
/// [`ArchiveBuilder::deny_duplicates`](crate::ArchiveBuilder::deny_duplicates)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Relative, `/` separated path inside the archive.
    pub path: String,
    /// Raw file contents, stored verbatim.
    pub content: Vec<u8>,
}

impl Entry {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Entry {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Entry holding the UTF-8 bytes of `text`.
    pub fn text(path: impl Into<String>, text: &str) -> Self {
        Self::new(path, text.as_bytes())
    }
}

/// Describes a file in the zip archive, as written before its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    /// The version of the zip format needed to extract the file.
    pub version: u16,
    /// The flags that are set for the file.
    pub flags: u16,
    /// The compression method used for the file.
    pub compression: u16,
    /// The last modified time of the file.
    pub last_mod_time: u16,
    /// The last modified date of the file.
    pub last_mod_date: u16,
    /// The crc32 checksum of the file.
    pub crc32: u32,
    /// The size of the file after compression.
    pub compressed_size: u32,
    /// The size of the file before compression.
    pub uncompressed_size: u32,
    /// The filename of the file.
    pub filename: String,
}

impl LocalFileHeader {
    /// Header for an uncompressed entry, both sizes equal the payload length.
    pub fn stored(filename: &str, crc32: u32, size: u32) -> Self {
        LocalFileHeader {
            version: ZIP_VERSION,
            flags: 0,
            compression: METHOD_STORED,
            last_mod_time: 0,
            last_mod_date: 0,
            crc32,
            compressed_size: size,
            uncompressed_size: size,
            filename: filename.to_owned(),
        }
    }

    /// Bytes taken by the fixed header plus the name.
    pub fn header_len(&self) -> usize {
        LFH_LEN + self.filename.len()
    }

    /// Bytes taken by the whole local section: header, name and payload.
    pub fn section_len(&self) -> u64 {
        self.header_len() as u64 + self.compressed_size as u64
    }

    /// Callers check the name against the 16 bit length field first, see
    /// [`validate_entry_path`](crate::path::validate_entry_path).
    pub(crate) fn write(&self, buf: &mut Vec<u8>) {
        debug_assert!(self.filename.len() <= u16::MAX as usize);
        write_u32_le(buf, LFH_SIG);
        write_u16_le(buf, self.version);
        write_u16_le(buf, self.flags);
        write_u16_le(buf, self.compression);
        write_u16_le(buf, self.last_mod_time);
        write_u16_le(buf, self.last_mod_date);
        write_u32_le(buf, self.crc32);
        write_u32_le(buf, self.compressed_size);
        write_u32_le(buf, self.uncompressed_size);
        write_u16_le(buf, self.filename.len() as u16);
        // extra field length
        write_u16_le(buf, 0);
        buf.extend_from_slice(self.filename.as_bytes());
    }

    /// The local section for this header followed by `data`.
    pub(crate) fn encode_section(&self, data: &[u8]) -> Vec<u8> {
        debug_assert_eq!(data.len() as u64, self.compressed_size as u64);
        let mut buf = Vec::with_capacity(self.header_len() + data.len());
        self.write(&mut buf);
        buf.extend_from_slice(data);
        buf
    }
}

/// Due to the way the zip format is designed, the central directory is
/// placed at the end of the file. One of these is written per entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectory {
    pub version_made_by: u16,
    pub version_needed_to_extract: u16,
    pub flags: u16,
    pub compression: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub filename: String,
    pub disk_number_start: u16,
    pub internal_file_attributes: u16,
    pub external_file_attributes: u32,
    /// Where the entry's local header starts, counted from the start of the archive.
    pub local_header_rel_offset: u32,
}

impl CentralDirectory {
    /// Directory record mirroring `header`, whose local section starts at `offset`.
    pub fn from_local(header: &LocalFileHeader, offset: u32) -> Self {
        CentralDirectory {
            version_made_by: ZIP_VERSION,
            version_needed_to_extract: header.version,
            flags: header.flags,
            compression: header.compression,
            last_mod_time: header.last_mod_time,
            last_mod_date: header.last_mod_date,
            crc32: header.crc32,
            compressed_size: header.compressed_size,
            uncompressed_size: header.uncompressed_size,
            filename: header.filename.clone(),
            disk_number_start: 0,
            internal_file_attributes: 0,
            external_file_attributes: 0,
            local_header_rel_offset: offset,
        }
    }

    pub fn record_len(&self) -> usize {
        CD_LEN + self.filename.len()
    }

    pub(crate) fn write(&self, buf: &mut Vec<u8>) {
        debug_assert!(self.filename.len() <= u16::MAX as usize);
        write_u32_le(buf, CD_SIG);
        write_u16_le(buf, self.version_made_by);
        write_u16_le(buf, self.version_needed_to_extract);
        write_u16_le(buf, self.flags);
        write_u16_le(buf, self.compression);
        write_u16_le(buf, self.last_mod_time);
        write_u16_le(buf, self.last_mod_date);
        write_u32_le(buf, self.crc32);
        write_u32_le(buf, self.compressed_size);
        write_u32_le(buf, self.uncompressed_size);
        write_u16_le(buf, self.filename.len() as u16);
        // extra field and file comment lengths
        write_u16_le(buf, 0);
        write_u16_le(buf, 0);
        write_u16_le(buf, self.disk_number_start);
        write_u16_le(buf, self.internal_file_attributes);
        write_u32_le(buf, self.external_file_attributes);
        write_u32_le(buf, self.local_header_rel_offset);
        buf.extend_from_slice(self.filename.as_bytes());
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.record_len());
        self.write(&mut buf);
        buf
    }
}

/// Very last structure in a zip archive, it has information that
/// helps the reader find the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_central_directory: u16,
    pub number_of_central_directory_records_on_this_disk: u16,
    pub total_number_of_central_directory_records: u16,
    pub size_of_central_directory: u32,
    pub offset_of_start_of_central_directory: u32,
}

impl EndOfCentralDirectory {
    /// Single disk trailer for `records` directory records.
    pub fn new(records: u16, size: u32, offset: u32) -> Self {
        EndOfCentralDirectory {
            disk_number: 0,
            disk_with_central_directory: 0,
            number_of_central_directory_records_on_this_disk: records,
            total_number_of_central_directory_records: records,
            size_of_central_directory: size,
            offset_of_start_of_central_directory: offset,
        }
    }

    pub fn write(&self, buf: &mut Vec<u8>) {
        write_u32_le(buf, EOCD_SIG);
        write_u16_le(buf, self.disk_number);
        write_u16_le(buf, self.disk_with_central_directory);
        write_u16_le(buf, self.number_of_central_directory_records_on_this_disk);
        write_u16_le(buf, self.total_number_of_central_directory_records);
        write_u32_le(buf, self.size_of_central_directory);
        write_u32_le(buf, self.offset_of_start_of_central_directory);
        // comment length
        write_u16_le(buf, 0);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(EOCD_LEN);
        self.write(&mut buf);
        buf
    }
}
