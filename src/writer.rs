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

//! Archive assembly.
//!
//! Building happens in three steps. The layout is planned from lengths
//! alone, so every path and format limit is checked before a single byte is
//! encoded. Each entry is then encoded into its own immutable local section
//! and directory record. Finally the segments are concatenated in input
//! order, followed by the end of central directory record.

use std::collections::HashMap;
use std::io::Write;

#[cfg(feature = "multi-thread")]
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::checksum::checksum;
use crate::path::{join_root, validate_entry_path};
use crate::structures::{CentralDirectory, EndOfCentralDirectory, Entry, LocalFileHeader};
use crate::{Result, ZipError, CD_LEN, EOCD_LEN, LFH_LEN, MAX_ENTRIES, MAX_FIELD_SIZE};

/// Byte positions of every record, computed before anything is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Layout {
    /// Offset of each entry's local header, in input order.
    pub offsets: Vec<u32>,
    pub central_directory_offset: u32,
    pub central_directory_size: u32,
    pub total_len: u64,
}

impl Layout {
    /// Plan an archive from `(path, payload length)` pairs.
    ///
    /// Fails if a path is unsafe or a count, size or offset does not fit its field.
    pub fn plan<'a, I>(items: I) -> Result<Layout>
    where
        I: ExactSizeIterator<Item = (&'a str, u64)> + Clone,
    {
        let count = items.len();
        if count > MAX_ENTRIES {
            return Err(ZipError::TooManyEntries(count));
        }
        for (index, (path, _)) in items.clone().enumerate() {
            validate_entry_path(index, path)?;
        }

        let mut offsets = Vec::with_capacity(count);
        let mut offset = 0u64;
        let mut cd_size = 0u64;
        for (index, (path, size)) in items.enumerate() {
            if size > MAX_FIELD_SIZE {
                return Err(ZipError::EntryTooLarge { index, size });
            }
            let rel_offset = u32::try_from(offset).map_err(|_| ZipError::ArchiveTooLarge(offset))?;
            offsets.push(rel_offset);
            offset += (LFH_LEN + path.len()) as u64 + size;
            cd_size += (CD_LEN + path.len()) as u64;
        }

        let total_len = offset + cd_size + EOCD_LEN as u64;
        let central_directory_offset =
            u32::try_from(offset).map_err(|_| ZipError::ArchiveTooLarge(total_len))?;
        let central_directory_size =
            u32::try_from(cd_size).map_err(|_| ZipError::ArchiveTooLarge(total_len))?;

        Ok(Layout {
            offsets,
            central_directory_offset,
            central_directory_size,
            total_len,
        })
    }

    fn for_entries(entries: &[Entry]) -> Result<Layout> {
        Self::plan(
            entries
                .iter()
                .map(|entry| (entry.path.as_str(), entry.content.len() as u64)),
        )
    }

    fn end_record(&self) -> EndOfCentralDirectory {
        // plan() caps the count at u16::MAX
        EndOfCentralDirectory::new(
            self.offsets.len() as u16,
            self.central_directory_size,
            self.central_directory_offset,
        )
    }
}

/// The two byte segments an entry contributes to the archive.
struct EncodedEntry {
    local: Vec<u8>,
    central: Vec<u8>,
}

fn stored_header(entry: &Entry) -> LocalFileHeader {
    // sizes were checked against u32 while planning
    LocalFileHeader::stored(&entry.path, checksum(&entry.content), entry.content.len() as u32)
}

fn encode_entry(entry: &Entry, offset: u32) -> EncodedEntry {
    let header = stored_header(entry);
    EncodedEntry {
        local: header.encode_section(&entry.content),
        central: CentralDirectory::from_local(&header, offset).to_bytes(),
    }
}

#[cfg(feature = "multi-thread")]
fn encode_all(entries: &[Entry], offsets: &[u32]) -> Vec<EncodedEntry> {
    entries
        .par_iter()
        .zip(offsets.par_iter())
        .map(|(entry, offset)| encode_entry(entry, *offset))
        .collect()
}

#[cfg(not(feature = "multi-thread"))]
fn encode_all(entries: &[Entry], offsets: &[u32]) -> Vec<EncodedEntry> {
    entries
        .iter()
        .zip(offsets.iter())
        .map(|(entry, offset)| encode_entry(entry, *offset))
        .collect()
}

fn assemble(entries: &[Entry]) -> Result<Vec<u8>> {
    let layout = Layout::for_entries(entries)?;
    let total_len =
        usize::try_from(layout.total_len).map_err(|_| ZipError::ArchiveTooLarge(layout.total_len))?;

    let encoded = encode_all(entries, &layout.offsets);

    let mut buf = Vec::with_capacity(total_len);
    for segment in &encoded {
        buf.extend_from_slice(&segment.local);
    }
    debug_assert_eq!(buf.len() as u64, layout.central_directory_offset as u64);
    for segment in &encoded {
        buf.extend_from_slice(&segment.central);
    }
    layout.end_record().write(&mut buf);
    debug_assert_eq!(buf.len(), total_len);

    Ok(buf)
}

fn log_outcome<T>(result: &Result<T>, entries: usize, bytes: impl Fn(&T) -> u64) {
    match result {
        Ok(value) => {
            debug!(target: "forgezip::writer", entries, bytes = bytes(value), "Archive assembled")
        }
        Err(error) => {
            warn!(target: "forgezip::writer", entries, %error, "Archive rejected")
        }
    }
}

/// Build a complete archive holding `entries`, in order.
///
/// Either the whole archive is returned or nothing is: unsafe paths and
/// anything the 32 bit format cannot represent fail before encoding starts.
/// The output depends only on the entries, so identical input always gives
/// identical bytes.
pub fn build_archive(entries: &[Entry]) -> Result<Vec<u8>> {
    let result = assemble(entries);
    log_outcome(&result, entries.len(), |buf| buf.len() as u64);
    result
}

/// Write the archive holding `entries` to `writer`, returning the number of bytes written.
///
/// The output is the same as [`build_archive`], without holding the whole
/// archive in memory. Validation completes before the first write, so
/// rejected input leaves `writer` untouched. An I/O error partway through
/// leaves the bytes written so far in `writer`, a partial archive.
pub fn write_archive<W: Write>(entries: &[Entry], writer: &mut W) -> Result<u64> {
    let result = stream(entries, writer);
    log_outcome(&result, entries.len(), |written| *written);
    result
}

fn stream<W: Write>(entries: &[Entry], writer: &mut W) -> Result<u64> {
    let layout = Layout::for_entries(entries)?;

    let mut records = Vec::with_capacity(layout.central_directory_size as usize + EOCD_LEN);
    let mut header_buf = Vec::new();
    for (entry, offset) in entries.iter().zip(layout.offsets.iter()) {
        let header = stored_header(entry);
        header_buf.clear();
        header.write(&mut header_buf);
        writer.write_all(&header_buf)?;
        writer.write_all(&entry.content)?;
        CentralDirectory::from_local(&header, *offset).write(&mut records);
    }
    layout.end_record().write(&mut records);
    writer.write_all(&records)?;
    writer.flush()?;

    Ok(layout.total_len)
}

/// Collects entries for one archive.
///
/// ```
/// use forgezip::ArchiveBuilder;
///
/// let mut builder = ArchiveBuilder::new().with_root("my-server");
/// builder
///     .add_text("server.py", "print('hello')\n")
///     .add_text("README.md", "# my-server\n");
/// let bytes = builder.build().unwrap();
/// assert_eq!(builder.entries()[0].path, "my-server/server.py");
/// assert!(!bytes.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArchiveBuilder {
    root: Option<String>,
    deny_duplicates: bool,
    entries: Vec<Entry>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place entries added from now on under the folder `root`.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.set_root(Some(root.into()));
        self
    }

    pub fn set_root(&mut self, root: Option<String>) {
        self.root = root.filter(|root| !root.is_empty());
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Fail the build when two entries share a path, instead of writing both.
    pub fn deny_duplicates(mut self, deny: bool) -> Self {
        self.deny_duplicates = deny;
        self
    }

    pub fn add_file(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> &mut Self {
        let path = path.into();
        let path = match &self.root {
            Some(root) => join_root(root, &path),
            None => path,
        };
        self.entries.push(Entry::new(path, content));
        self
    }

    pub fn add_text(&mut self, path: impl Into<String>, text: &str) -> &mut Self {
        self.add_file(path, text.as_bytes())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_duplicates(&self) -> Result<()> {
        if !self.deny_duplicates {
            return Ok(());
        }
        let mut seen: HashMap<&str, usize> = HashMap::with_capacity(self.entries.len());
        for (index, entry) in self.entries.iter().enumerate() {
            if let Some(first) = seen.insert(entry.path.as_str(), index) {
                return Err(ZipError::DuplicateEntry {
                    first,
                    second: index,
                    path: entry.path.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn build(&self) -> Result<Vec<u8>> {
        self.check_duplicates()?;
        build_archive(&self.entries)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<u64> {
        self.check_duplicates()?;
        write_archive(&self.entries, writer)
    }
}

impl Extend<Entry> for ArchiveBuilder {
    fn extend<T: IntoIterator<Item = Entry>>(&mut self, iter: T) {
        for entry in iter {
            self.add_file(entry.path, entry.content);
        }
    }
}
