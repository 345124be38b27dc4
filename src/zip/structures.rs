use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{Result, ZipError};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// Fixed part of the end record that closes every archive.
///
/// Layout after the signature: disk numbers, entry counts, directory size and
/// offset, then the length of the trailing comment.
#[derive(Debug, Clone)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let body = data
            .get(..Self::SIZE)
            .filter(|record| record.starts_with(Self::SIGNATURE))
            .ok_or_else(|| ZipError::malformed("invalid end of central directory record"))?;
        let mut fields = Cursor::new(&body[4..]);

        Ok(Self {
            disk_number: fields.read_u16::<LittleEndian>()?,
            disk_with_cd: fields.read_u16::<LittleEndian>()?,
            disk_entries: fields.read_u16::<LittleEndian>()?,
            total_entries: fields.read_u16::<LittleEndian>()?,
            cd_size: fields.read_u32::<LittleEndian>()?,
            cd_offset: fields.read_u32::<LittleEndian>()?,
            comment_len: fields.read_u16::<LittleEndian>()?,
        })
    }

    /// Any all-ones count, size or offset defers to the ZIP64 end record.
    pub fn is_zip64(&self) -> bool {
        self.disk_entries == u16::MAX
            || self.total_entries == u16::MAX
            || self.cd_size == u32::MAX
            || self.cd_offset == u32::MAX
    }

    pub fn spans_disks(&self) -> bool {
        self.disk_number != 0 || self.disk_with_cd != 0 || self.disk_entries != self.total_entries
    }
}

/// Pointer from the tail of the archive back to the ZIP64 end record.
///
/// Sits immediately before the regular end record.
#[derive(Debug, Clone)]
pub struct Zip64EOCDLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let body = data
            .get(..Self::SIZE)
            .filter(|record| record.starts_with(Self::SIGNATURE))
            .ok_or_else(|| ZipError::malformed("invalid ZIP64 end of central directory locator"))?;
        let mut fields = Cursor::new(&body[4..]);

        Ok(Self {
            disk_with_eocd64: fields.read_u32::<LittleEndian>()?,
            eocd64_offset: fields.read_u64::<LittleEndian>()?,
            total_disks: fields.read_u32::<LittleEndian>()?,
        })
    }
}

/// The 64-bit directory fields of a ZIP64 end record.
///
/// Only the fixed 56-byte prefix is read. The record size and the two version
/// fields between signature and disk numbers are skipped, as is any
/// extensible data after the prefix.
#[derive(Debug, Clone)]
pub struct Zip64EOCD {
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    /// Signature, record size and version fields precede the disk numbers.
    const FIELDS_START: usize = 4 + 8 + 2 + 2;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let body = data
            .get(..Self::MIN_SIZE)
            .filter(|record| record.starts_with(Self::SIGNATURE))
            .ok_or_else(|| ZipError::malformed("invalid ZIP64 end of central directory record"))?;
        let mut fields = Cursor::new(&body[Self::FIELDS_START..]);

        Ok(Self {
            disk_number: fields.read_u32::<LittleEndian>()?,
            disk_with_cd: fields.read_u32::<LittleEndian>()?,
            disk_entries: fields.read_u64::<LittleEndian>()?,
            total_entries: fields.read_u64::<LittleEndian>()?,
            cd_size: fields.read_u64::<LittleEndian>()?,
            cd_offset: fields.read_u64::<LittleEndian>()?,
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Extra field tag carrying 64-bit sizes and offsets
pub const ZIP64_EXTRA_FIELD_ID: u16 = 0x0001;

/// General purpose flag bit 0: entry data is encrypted
pub const FLAG_ENCRYPTED: u16 = 0x0001;

/// The fixed part of a Local File Header.
///
/// Only the fields extraction needs are kept; sizes and CRC are taken from the
/// central directory because streamed archives zero them here.
#[derive(Debug, Clone)]
pub struct LocalFileHeader {
    pub flags: u16,
    pub compression_method: u16,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < LFH_SIZE || &data[0..4] != LFH_SIGNATURE {
            return Err(ZipError::malformed("invalid local file header"));
        }

        let mut cursor = Cursor::new(&data[4..LFH_SIZE]);
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;

        // Offset to filename length field
        cursor.set_position(22);
        let file_name_length = cursor.read_u16::<LittleEndian>()?;
        let extra_field_length = cursor.read_u16::<LittleEndian>()?;

        Ok(Self {
            flags,
            compression_method,
            file_name_length,
            extra_field_length,
        })
    }

    /// Bytes between the start of this header and the start of the entry data.
    pub fn data_offset(&self) -> u64 {
        LFH_SIZE as u64 + self.file_name_length as u64 + self.extra_field_length as u64
    }
}

/// One indexed archive member, as described by its central directory header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub local_header_offset: u64,
    pub flags: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub is_directory: bool,
}

impl EntryRecord {
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eocd_bytes(entries: u16, cd_size: u32, cd_offset: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(EndOfCentralDirectory::SIGNATURE);
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&entries.to_le_bytes());
        buf.extend_from_slice(&entries.to_le_bytes());
        buf.extend_from_slice(&cd_size.to_le_bytes());
        buf.extend_from_slice(&cd_offset.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf
    }

    #[test]
    fn compression_method_round_trips_known_values() {
        assert_eq!(CompressionMethod::from_u16(0), CompressionMethod::Stored);
        assert_eq!(CompressionMethod::from_u16(8), CompressionMethod::Deflate);
        assert_eq!(CompressionMethod::from_u16(12), CompressionMethod::Unknown(12));
        assert_eq!(CompressionMethod::Unknown(14).as_u16(), 14);
    }

    #[test]
    fn parses_eocd() {
        let eocd = EndOfCentralDirectory::from_bytes(&eocd_bytes(3, 150, 1000)).unwrap();
        assert_eq!(eocd.total_entries, 3);
        assert_eq!(eocd.cd_size, 150);
        assert_eq!(eocd.cd_offset, 1000);
        assert!(!eocd.is_zip64());
        assert!(!eocd.spans_disks());
    }

    #[test]
    fn eocd_sentinels_mark_zip64() {
        let eocd = EndOfCentralDirectory::from_bytes(&eocd_bytes(1, 10, 0xFFFFFFFF)).unwrap();
        assert!(eocd.is_zip64());
    }

    #[test]
    fn rejects_bad_eocd_signature() {
        let mut bytes = eocd_bytes(1, 10, 10);
        bytes[3] = 0x07;
        assert!(matches!(
            EndOfCentralDirectory::from_bytes(&bytes),
            Err(ZipError::MalformedArchive(_))
        ));
        assert!(matches!(
            EndOfCentralDirectory::from_bytes(&bytes[..10]),
            Err(ZipError::MalformedArchive(_))
        ));
    }

    #[test]
    fn zip64_record_skips_size_and_versions() {
        let mut record = Vec::new();
        record.extend_from_slice(Zip64EOCD::SIGNATURE);
        record.extend_from_slice(&44u64.to_le_bytes()); // record size
        record.extend_from_slice(&45u16.to_le_bytes()); // version made by
        record.extend_from_slice(&45u16.to_le_bytes()); // version needed
        record.extend_from_slice(&0u32.to_le_bytes());
        record.extend_from_slice(&0u32.to_le_bytes());
        record.extend_from_slice(&7u64.to_le_bytes());
        record.extend_from_slice(&7u64.to_le_bytes());
        record.extend_from_slice(&0x1_0000_0000u64.to_le_bytes());
        record.extend_from_slice(&0x2_0000_0000u64.to_le_bytes());
        assert_eq!(record.len(), Zip64EOCD::MIN_SIZE);

        let eocd64 = Zip64EOCD::from_bytes(&record).unwrap();
        assert_eq!(eocd64.total_entries, 7);
        assert_eq!(eocd64.cd_size, 0x1_0000_0000);
        assert_eq!(eocd64.cd_offset, 0x2_0000_0000);
        assert!(Zip64EOCD::from_bytes(&record[..55]).is_err());
    }

    #[test]
    fn local_header_data_offset() {
        let mut header = Vec::new();
        header.extend_from_slice(LFH_SIGNATURE);
        header.extend_from_slice(&20u16.to_le_bytes()); // version needed
        header.extend_from_slice(&0u16.to_le_bytes()); // flags
        header.extend_from_slice(&8u16.to_le_bytes()); // compression
        header.extend_from_slice(&[0u8; 16]); // time, date, crc, sizes
        header.extend_from_slice(&8u16.to_le_bytes()); // filename length
        header.extend_from_slice(&12u16.to_le_bytes()); // extra field length
        assert_eq!(header.len(), LFH_SIZE);

        let lfh = LocalFileHeader::from_bytes(&header).unwrap();
        assert_eq!(lfh.compression_method, 8);
        assert_eq!(lfh.data_offset(), 30 + 8 + 12);
    }

    #[test]
    fn dos_timestamp_decoding() {
        let entry = EntryRecord {
            name: "test.txt".to_string(),
            compression_method: CompressionMethod::Deflate,
            compressed_size: 16,
            uncompressed_size: 14,
            crc32: 0x774fe527,
            local_header_offset: 0,
            flags: 0,
            // 2026-10-19 15:06:46
            last_mod_time: (15 << 11) | (6 << 5) | 23,
            last_mod_date: ((2026 - 1980) << 9) | (10 << 5) | 19,
            is_directory: false,
        };
        assert_eq!(entry.mod_date(), (2026, 10, 19));
        assert_eq!(entry.mod_time(), (15, 6, 46));
        assert!(!entry.is_encrypted());
    }
}
