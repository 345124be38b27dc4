use super::parser::MAX_EOCD_SCAN;
use super::structures::EndOfCentralDirectory;

/// Default size of each of the two decompression scratch buffers.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Runtime knobs for opening and extracting an archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Bytes read from the source (and produced by inflate) per step.
    pub chunk_size: usize,
    /// Compare the CRC-32 of extracted data with the directory value.
    pub verify_crc: bool,
    /// Maximum bytes scanned from the archive tail while searching for the EOCD.
    pub max_eocd_scan: usize,
    /// Refuse archives declaring more entries than this.
    pub max_entries: Option<usize>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            verify_crc: true,
            max_eocd_scan: MAX_EOCD_SCAN,
            max_entries: None,
        }
    }
}

impl ArchiveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scratch chunk size; zero is raised to one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_verify_crc(mut self, verify_crc: bool) -> Self {
        self.verify_crc = verify_crc;
        self
    }

    /// Set a cap for EOCD tail scan bytes.
    pub fn with_max_eocd_scan(mut self, max_eocd_scan: usize) -> Self {
        self.max_eocd_scan = max_eocd_scan.clamp(EndOfCentralDirectory::SIZE, MAX_EOCD_SCAN);
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }
}
