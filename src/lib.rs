//! # memzip
//!
//! A small streaming ZIP reader with pluggable byte sources and three ways to
//! take an entry out of an archive.
//!
//! The archive is read through the [`ReadAt`] trait, so it can live in memory
//! ([`MemoryReader`]), behind a read callback ([`CallbackReader`]), or in a
//! file ([`LocalFileReader`]). Only the central directory is held in memory;
//! entry data moves through two small scratch windows owned by the handle.
//!
//! ## Features
//!
//! - Extract to a heap buffer allocated up front ([`HeapSink`])
//! - Extract into a caller-supplied fixed buffer ([`FixedBufferSink`]), refusing
//!   entries that do not fit before writing anything
//! - Stream through a write callback ([`CallbackSink`]) or any `std::io::Write`
//! - STORED and DEFLATE entries, CRC-32 verification, ZIP64 offsets and sizes
//!
//! ## Example
//!
//! ```
//! use memzip::{CallbackReader, ZipArchive};
//!
//! # fn main() -> memzip::Result<()> {
//! static IMAGE: &[u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/test.zip"));
//!
//! // Serve the archive through a read callback, one window at a time.
//! let reader = CallbackReader::new(IMAGE.len() as u64, |offset, buf: &mut [u8]| {
//!     let start = offset as usize;
//!     buf.copy_from_slice(&IMAGE[start..start + buf.len()]);
//!     buf.len()
//! });
//! let mut archive = ZipArchive::open(reader)?;
//!
//! let mut text = Vec::new();
//! let size = archive.extract_to_callback("test.txt", |_offset, chunk| {
//!     text.extend_from_slice(chunk);
//!     chunk.len()
//! })?;
//! assert_eq!(size, 14);
//! assert_eq!(text, b"Hello, ESP32!\n");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod sink;
pub mod zip;

pub use cli::Cli;
pub use error::{Result, ZipError};
pub use io::{CallbackReader, LocalFileReader, MemoryReader, ReadAt};
pub use sink::{CallbackSink, FixedBufferSink, HeapSink, Sink, WriterSink};
pub use zip::{
    ArchiveIndex, ArchiveOptions, CompressionMethod, EntryRecord, ExtractHook, ZipArchive,
};
