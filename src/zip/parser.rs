//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for 64-bit offsets and sizes
//! 3. Read the Central Directory to get metadata for all files
//! 4. For extraction, read each file's Local File Header and data
//!
//! Every length taken from the archive is checked against the bytes actually
//! available before it is used, so a damaged archive yields
//! [`ZipError::MalformedArchive`] rather than a panic or a partial index.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use tracing::{debug, warn};

use crate::error::{Result, ZipError};
use crate::io::ReadAt;

use super::index::ArchiveIndex;
use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
pub const MAX_COMMENT_SIZE: usize = 65535;

/// Largest trailing window that can hold an EOCD record plus its comment.
pub const MAX_EOCD_SCAN: usize = EndOfCentralDirectory::SIZE + MAX_COMMENT_SIZE;

/// Where the central directory lives and how many headers it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryLocation {
    pub cd_offset: u64,
    pub cd_size: u64,
    pub total_entries: u64,
    /// Offset of the first end record (the ZIP64 record when present).
    pub end_offset: u64,
}

/// Low-level ZIP file parser.
///
/// Owns the byte source for the lifetime of an archive handle. Typically used
/// through [`ZipArchive`](super::ZipArchive) rather than directly.
#[derive(Debug)]
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: R,
    /// Total size of the archive in bytes
    size: u64,
    /// Trailing bytes searched for the EOCD signature
    max_eocd_scan: usize,
}

impl<R: ReadAt> ZipParser<R> {
    pub fn new(reader: R) -> Self {
        let size = reader.size();
        Self {
            reader,
            size,
            max_eocd_scan: MAX_EOCD_SCAN,
        }
    }

    /// Limit the EOCD search window; clamped to `22..=22 + 65535`.
    pub fn with_max_eocd_scan(mut self, max_eocd_scan: usize) -> Self {
        self.max_eocd_scan = max_eocd_scan.clamp(EndOfCentralDirectory::SIZE, MAX_EOCD_SCAN);
        self
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Handles both the simple case (no comment) and archives with comments
    /// by searching backwards for the signature. A candidate whose comment
    /// length reaches exactly to the end of the archive is preferred; failing
    /// that, the last signature with a complete 22-byte record is used, which
    /// covers images padded after the end record.
    ///
    /// Returns the EOCD record and its offset in the archive.
    pub fn find_eocd(&mut self) -> Result<(EndOfCentralDirectory, u64)> {
        if self.size < EndOfCentralDirectory::SIZE as u64 {
            return Err(ZipError::malformed(format!(
                "{} bytes is too short to be a ZIP archive",
                self.size
            )));
        }

        // Try the no-comment case first; it needs a single 22-byte read.
        let offset = self.size - EndOfCentralDirectory::SIZE as u64;
        let mut buf = [0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(offset, &mut buf)?;
        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && buf[20..22] == [0, 0] {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            return Ok((eocd, offset));
        }

        // EOCD not at expected location; the archive may carry a comment.
        let search_size = (self.max_eocd_scan as u64).min(self.size) as usize;
        let search_start = self.size - search_size as u64;

        let mut buf = vec![0u8; search_size];
        self.reader.read_exact_at(search_start, &mut buf)?;

        // Search backwards for EOCD signature (PK\x05\x06)
        let mut last_complete = None;
        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
                continue;
            }
            last_complete.get_or_insert(i);
            let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
            if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                let eocd =
                    EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
                return Ok((eocd, search_start + i as u64));
            }
        }

        if let Some(i) = last_complete {
            let offset = search_start + i as u64;
            let eocd = EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
            let trailing = buf.len() - i - EndOfCentralDirectory::SIZE;
            debug!(
                offset,
                comment_len = eocd.comment_len,
                trailing,
                "end record comment does not reach the end of the archive"
            );
            return Ok((eocd, offset));
        }

        Err(ZipError::malformed(format!(
            "end of central directory signature not found in the last {search_size} bytes"
        )))
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD holds 0xFFFF / 0xFFFFFFFF placeholders.
    /// Returns the record and its offset.
    pub fn read_zip64_eocd(&mut self, eocd_offset: u64) -> Result<(Zip64EOCD, u64)> {
        // The ZIP64 EOCD Locator is located immediately before the regular EOCD
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| ZipError::malformed("ZIP64 locator missing before EOCD"))?;
        let mut locator_buf = [0u8; Zip64EOCDLocator::SIZE];
        self.reader.read_exact_at(locator_offset, &mut locator_buf)?;
        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        if locator.total_disks > 1 || locator.disk_with_eocd64 != 0 {
            return Err(ZipError::malformed("multi-disk archives are not supported"));
        }
        let record_end = locator.eocd64_offset.checked_add(Zip64EOCD::MIN_SIZE as u64);
        if record_end.is_none_or(|end| end > locator_offset) {
            return Err(ZipError::malformed("ZIP64 end record offset is out of range"));
        }

        // Read the actual ZIP64 EOCD from the offset specified in the locator
        let mut eocd64_buf = [0u8; Zip64EOCD::MIN_SIZE];
        self.reader
            .read_exact_at(locator.eocd64_offset, &mut eocd64_buf)?;

        Ok((Zip64EOCD::from_bytes(&eocd64_buf)?, locator.eocd64_offset))
    }

    /// Locate the central directory, resolving ZIP64 records when needed.
    pub fn locate_directory(&mut self) -> Result<DirectoryLocation> {
        let (eocd, eocd_offset) = self.find_eocd()?;

        let location = if eocd.is_zip64() {
            let (eocd64, eocd64_offset) = self.read_zip64_eocd(eocd_offset)?;
            if eocd64.disk_number != 0
                || eocd64.disk_with_cd != 0
                || eocd64.disk_entries != eocd64.total_entries
            {
                return Err(ZipError::malformed("multi-disk archives are not supported"));
            }
            DirectoryLocation {
                cd_offset: eocd64.cd_offset,
                cd_size: eocd64.cd_size,
                total_entries: eocd64.total_entries,
                end_offset: eocd64_offset,
            }
        } else {
            if eocd.spans_disks() {
                return Err(ZipError::malformed("multi-disk archives are not supported"));
            }
            DirectoryLocation {
                cd_offset: eocd.cd_offset as u64,
                cd_size: eocd.cd_size as u64,
                total_entries: eocd.total_entries as u64,
                end_offset: eocd_offset,
            }
        };

        // The directory must sit entirely before the end record(s).
        let cd_end = location
            .cd_offset
            .checked_add(location.cd_size)
            .ok_or_else(|| ZipError::malformed("central directory size overflows"))?;
        if cd_end > location.end_offset {
            return Err(ZipError::malformed(format!(
                "central directory ({} bytes at offset {}) overlaps the end record at {}",
                location.cd_size, location.cd_offset, location.end_offset
            )));
        }

        // Each header is at least CDFH_MIN_SIZE bytes.
        if location.total_entries > location.cd_size / CDFH_MIN_SIZE as u64 {
            return Err(ZipError::malformed(format!(
                "{} entries cannot fit in a {}-byte central directory",
                location.total_entries, location.cd_size
            )));
        }

        Ok(location)
    }

    /// Build the entry index from the Central Directory.
    ///
    /// Reads the EOCD first, then fetches the entire Central Directory in a
    /// single request and parses it header by header. `max_entries` caps the
    /// declared entry count.
    pub fn read_index(&mut self, max_entries: Option<usize>) -> Result<ArchiveIndex> {
        let location = self.locate_directory()?;

        if let Some(limit) = max_entries {
            if location.total_entries > limit as u64 {
                return Err(ZipError::malformed(format!(
                    "archive declares {} entries, limit is {limit}",
                    location.total_entries
                )));
            }
        }

        let mut cd_data = vec![0u8; location.cd_size as usize];
        self.reader.read_exact_at(location.cd_offset, &mut cd_data)?;

        // Parse each Central Directory File Header entry
        let mut entries = Vec::with_capacity(location.total_entries as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for i in 0..location.total_entries {
            let entry = parse_cdfh(&mut cursor).map_err(|err| match err {
                ZipError::MalformedArchive(msg) => {
                    ZipError::MalformedArchive(format!("central directory entry {i}: {msg}"))
                }
                other => other,
            })?;

            if entry.local_header_offset.saturating_add(LFH_SIZE as u64) > location.cd_offset {
                return Err(ZipError::malformed(format!(
                    "local header of '{}' at offset {} is outside the archive data",
                    entry.name, entry.local_header_offset
                )));
            }
            entries.push(entry);
        }

        let unread = location.cd_size - cursor.position();
        if unread > 0 {
            warn!(
                unread,
                "central directory has trailing bytes after {} entries", location.total_entries
            );
        }

        debug!(
            entries = entries.len(),
            cd_offset = location.cd_offset,
            cd_size = location.cd_size,
            "parsed central directory"
        );

        Ok(ArchiveIndex::new(entries))
    }

    /// Get the actual data offset for a file entry.
    ///
    /// The Local File Header (LFH) has variable-length fields (filename,
    /// extra field) that may differ from the Central Directory entry.
    /// This reads the LFH to calculate where the entry data begins and
    /// checks that the data fits inside the archive.
    pub fn data_offset(&mut self, entry: &EntryRecord) -> Result<u64> {
        let mut lfh_buf = [0u8; LFH_SIZE];
        self.reader
            .read_exact_at(entry.local_header_offset, &mut lfh_buf)?;
        let lfh = LocalFileHeader::from_bytes(&lfh_buf).map_err(|_| {
            ZipError::malformed(format!(
                "invalid local file header for '{}' at offset {}",
                entry.name, entry.local_header_offset
            ))
        })?;

        if lfh.compression_method != entry.compression_method.as_u16() {
            warn!(
                entry = %entry.name,
                local = lfh.compression_method,
                central = entry.compression_method.as_u16(),
                "local header disagrees with central directory on compression method"
            );
        }

        let data_offset = entry.local_header_offset + lfh.data_offset();
        let data_end = data_offset.checked_add(entry.compressed_size);
        if data_end.is_none_or(|end| end > self.size) {
            return Err(ZipError::malformed(format!(
                "data of '{}' runs past the end of the archive",
                entry.name
            )));
        }

        Ok(data_offset)
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Get a mutable reference to the underlying reader.
    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Parse a Central Directory File Header from a cursor over the directory bytes.
///
/// Lengths are validated against the bytes left in the directory before any
/// variable-length field is read.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<EntryRecord> {
    let data = *cursor.get_ref();
    let start = cursor.position() as usize;

    if data.len() - start < CDFH_MIN_SIZE {
        return Err(ZipError::malformed("header runs past the end of the directory"));
    }
    // Read and verify the signature (PK\x01\x02)
    if &data[start..start + 4] != CDFH_SIGNATURE {
        return Err(ZipError::malformed("invalid central directory file header"));
    }
    cursor.set_position(start as u64 + 4);

    // Read fixed-size header fields
    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()? as usize;
    let extra_field_length = cursor.read_u16::<LittleEndian>()? as usize;
    let file_comment_length = cursor.read_u16::<LittleEndian>()? as usize;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let name_start = start + CDFH_MIN_SIZE;
    let extra_start = name_start + file_name_length;
    let extra_end = extra_start + extra_field_length;
    let header_end = extra_end + file_comment_length;
    if header_end > data.len() {
        return Err(ZipError::malformed(format!(
            "declared name/extra/comment lengths ({file_name_length}/{extra_field_length}/{file_comment_length}) run past the end of the directory"
        )));
    }

    // Use lossy conversion to handle non-UTF8 filenames gracefully
    let name = String::from_utf8_lossy(&data[name_start..extra_start]).into_owned();

    // Directory entries end with '/'
    let is_directory = name.ends_with('/');

    // ZIP64 extended information: values appear only for fields set to 0xFFFFFFFF
    let mut extra = &data[extra_start..extra_end];
    while extra.len() >= 4 {
        let header_id = u16::from_le_bytes([extra[0], extra[1]]);
        let field_size = u16::from_le_bytes([extra[2], extra[3]]) as usize;
        let body_end = (4 + field_size).min(extra.len());
        let mut body = &extra[4..body_end];

        if header_id == ZIP64_EXTRA_FIELD_ID {
            if uncompressed_size == 0xFFFFFFFF {
                uncompressed_size = read_zip64_value(&mut body)?;
            }
            if compressed_size == 0xFFFFFFFF {
                compressed_size = read_zip64_value(&mut body)?;
            }
            if lfh_offset == 0xFFFFFFFF {
                lfh_offset = read_zip64_value(&mut body)?;
            }
        }
        extra = &extra[body_end..];
    }

    cursor.set_position(header_end as u64);

    Ok(EntryRecord {
        name,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        local_header_offset: lfh_offset,
        flags,
        last_mod_time,
        last_mod_date,
        is_directory,
    })
}

fn read_zip64_value(body: &mut &[u8]) -> Result<u64> {
    body.read_u64::<LittleEndian>()
        .map_err(|_| ZipError::malformed("ZIP64 extra field is too short"))
}
