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

//! Read-back helpers for the integration tests.
//!
//! These walk the records the writer produced field by field, so tests can
//! check the raw header values an archive reader would see.

#![allow(dead_code)]

use std::io::{BufReader, Cursor, Read, Result, Seek, SeekFrom};

use neoncore::int_util::Endianness::LittleEndian;
use neoncore::int_util::StreamReadInt;

pub const EOCD_SIG: u32 = 0x06054b50;
pub const CD_SIG: u32 = 0x02014b50;
pub const LFH_SIG: u32 = 0x04034b50;

type Source<'a> = BufReader<Cursor<&'a [u8]>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndRecord {
    pub signature: u32,
    pub disk_number: u16,
    pub disk_with_central_directory: u16,
    pub records_on_this_disk: u16,
    pub total_records: u16,
    pub central_directory_size: u32,
    pub central_directory_offset: u32,
    pub comment_len: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    pub signature: u32,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
    pub extra_len: u16,
    pub comment_len: u16,
    pub disk_number_start: u16,
    pub internal_attributes: u16,
    pub external_attributes: u32,
    pub local_header_offset: u32,
    pub name: Vec<u8>,
}

impl DirectoryRecord {
    pub fn len(&self) -> u64 {
        46 + self.name.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSection {
    pub signature: u32,
    pub version_needed: u16,
    pub flags: u16,
    pub compression: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
    pub extra_len: u16,
    pub name: Vec<u8>,
    pub data: Vec<u8>,
}

impl LocalSection {
    pub fn len(&self) -> u64 {
        30 + self.name.len() as u64 + self.data.len() as u64
    }
}

fn source(buf: &[u8], offset: u64) -> Result<Source<'_>> {
    let mut data = BufReader::new(Cursor::new(buf));
    data.seek(SeekFrom::Start(offset))?;
    Ok(data)
}

fn read_vec(data: &mut Source<'_>, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    data.read_exact(&mut buf)?;
    Ok(buf)
}

/// Parse the comment-less end record occupying the last 22 bytes.
pub fn end_record(buf: &[u8]) -> Result<EndRecord> {
    let mut data = source(buf, buf.len() as u64 - 22)?;
    Ok(EndRecord {
        signature: data.read_u32(LittleEndian)?,
        disk_number: data.read_u16(LittleEndian)?,
        disk_with_central_directory: data.read_u16(LittleEndian)?,
        records_on_this_disk: data.read_u16(LittleEndian)?,
        total_records: data.read_u16(LittleEndian)?,
        central_directory_size: data.read_u32(LittleEndian)?,
        central_directory_offset: data.read_u32(LittleEndian)?,
        comment_len: data.read_u16(LittleEndian)?,
    })
}

pub fn directory_record(buf: &[u8], offset: u64) -> Result<DirectoryRecord> {
    let mut data = source(buf, offset)?;
    let signature = data.read_u32(LittleEndian)?;
    let version_made_by = data.read_u16(LittleEndian)?;
    let version_needed = data.read_u16(LittleEndian)?;
    let flags = data.read_u16(LittleEndian)?;
    let compression = data.read_u16(LittleEndian)?;
    let last_mod_time = data.read_u16(LittleEndian)?;
    let last_mod_date = data.read_u16(LittleEndian)?;
    let crc32 = data.read_u32(LittleEndian)?;
    let compressed_size = data.read_u32(LittleEndian)?;
    let uncompressed_size = data.read_u32(LittleEndian)?;
    let name_len = data.read_u16(LittleEndian)?;
    let extra_len = data.read_u16(LittleEndian)?;
    let comment_len = data.read_u16(LittleEndian)?;
    let disk_number_start = data.read_u16(LittleEndian)?;
    let internal_attributes = data.read_u16(LittleEndian)?;
    let external_attributes = data.read_u32(LittleEndian)?;
    let local_header_offset = data.read_u32(LittleEndian)?;
    let name = read_vec(&mut data, name_len as usize)?;

    Ok(DirectoryRecord {
        signature,
        version_made_by,
        version_needed,
        flags,
        compression,
        last_mod_time,
        last_mod_date,
        crc32,
        compressed_size,
        uncompressed_size,
        name_len,
        extra_len,
        comment_len,
        disk_number_start,
        internal_attributes,
        external_attributes,
        local_header_offset,
        name,
    })
}

/// Every directory record, walked from the offset the end record points at.
pub fn central_directory(buf: &[u8]) -> Result<Vec<DirectoryRecord>> {
    let eocd = end_record(buf)?;
    let mut offset = eocd.central_directory_offset as u64;
    let mut records = Vec::with_capacity(eocd.total_records as usize);
    for _ in 0..eocd.total_records {
        let record = directory_record(buf, offset)?;
        offset += record.len();
        records.push(record);
    }
    Ok(records)
}

pub fn local_section(buf: &[u8], offset: u64) -> Result<LocalSection> {
    let mut data = source(buf, offset)?;
    let signature = data.read_u32(LittleEndian)?;
    let version_needed = data.read_u16(LittleEndian)?;
    let flags = data.read_u16(LittleEndian)?;
    let compression = data.read_u16(LittleEndian)?;
    let last_mod_time = data.read_u16(LittleEndian)?;
    let last_mod_date = data.read_u16(LittleEndian)?;
    let crc32 = data.read_u32(LittleEndian)?;
    let compressed_size = data.read_u32(LittleEndian)?;
    let uncompressed_size = data.read_u32(LittleEndian)?;
    let name_len = data.read_u16(LittleEndian)?;
    let extra_len = data.read_u16(LittleEndian)?;
    let name = read_vec(&mut data, name_len as usize)?;
    let _extra = read_vec(&mut data, extra_len as usize)?;
    let data = read_vec(&mut data, compressed_size as usize)?;

    Ok(LocalSection {
        signature,
        version_needed,
        flags,
        compression,
        last_mod_time,
        last_mod_date,
        crc32,
        compressed_size,
        uncompressed_size,
        name_len,
        extra_len,
        name,
        data,
    })
}

/// Every `(name, contents)` pair recovered with the `zip` crate, in directory order.
pub fn extract_all(buf: &[u8]) -> zip::result::ZipResult<Vec<(Vec<u8>, Vec<u8>)>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(buf))?;
    let mut files = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        assert_eq!(file.compression(), zip::CompressionMethod::Stored);
        let name = file.name_raw().to_vec();
        let mut contents = Vec::new();
        // reading to the end checks the stored crc32
        file.read_to_end(&mut contents)?;
        files.push((name, contents));
    }
    Ok(files)
}
