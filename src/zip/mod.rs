//! ZIP archive parsing and extraction.
//!
//! This module provides functionality for reading and extracting ZIP archives,
//! supporting both standard ZIP format and ZIP64 64-bit offsets and sizes.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Low-level parsing of ZIP structures from raw bytes
//! - `index`: the immutable list of entries and name lookup
//! - `extractor`: the copy/inflate loop feeding a [`Sink`](crate::Sink)
//! - `archive`: [`ZipArchive`], the handle tying the pieces together
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! This implementation reads the EOCD first (from the end of the file),
//! then the Central Directory, which allows listing files without reading
//! the entire archive, and extracting one entry through small fixed windows.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 end records and extended information extra field
//! - STORED (no compression) method
//! - DEFLATE compression method
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod archive;
mod extractor;
mod hook;
mod index;
mod options;
pub mod parser;
pub mod structures;

pub use archive::ZipArchive;
pub use hook::ExtractHook;
pub use index::ArchiveIndex;
pub use options::{ArchiveOptions, DEFAULT_CHUNK_SIZE};
pub use parser::ZipParser;
pub use structures::{CompressionMethod, EntryRecord};
