use std::fmt;
use std::io::Write;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, ZipError};
use crate::io::ReadAt;
use crate::sink::{CallbackSink, FixedBufferSink, HeapSink, Sink, WriterSink};

use super::extractor::{Extractor, Scratch};
use super::hook::ExtractHook;
use super::index::ArchiveIndex;
use super::options::ArchiveOptions;
use super::parser::ZipParser;
use super::structures::EntryRecord;

enum State {
    Opened {
        index: Arc<ArchiveIndex>,
        scratch: Scratch,
    },
    Closed,
}

/// An opened ZIP archive: a byte source, its entry index and the scratch
/// buffers extraction runs in.
///
/// A handle exists only once the central directory has been read, so
/// construction is the `Unopened -> Opened` transition. [`close`](Self::close)
/// is terminal; every later lookup or extraction fails with [`ZipError::Closed`].
/// Extraction borrows the handle mutably, so at most one runs at a time.
///
/// ```
/// use memzip::{MemoryReader, ZipArchive};
///
/// # fn main() -> memzip::Result<()> {
/// let image: &[u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/test.zip"));
/// let mut archive = ZipArchive::open(MemoryReader::new(image))?;
/// let data = archive.extract_to_heap("test.txt")?;
/// assert_eq!(data, b"Hello, ESP32!\n");
/// archive.close();
/// # Ok(())
/// # }
/// ```
pub struct ZipArchive<R: ReadAt> {
    parser: ZipParser<R>,
    state: State,
    options: ArchiveOptions,
    hook: Option<Box<dyn ExtractHook + Send>>,
}

impl<R: ReadAt> ZipArchive<R> {
    /// Open an archive with default [`ArchiveOptions`].
    pub fn open(reader: R) -> Result<Self> {
        Self::open_with_options(reader, ArchiveOptions::default())
    }

    /// Read the central directory and build the entry index.
    ///
    /// Fails with [`ZipError::MalformedArchive`] when the directory cannot be
    /// parsed; no handle (and no partial index) is produced in that case.
    pub fn open_with_options(reader: R, options: ArchiveOptions) -> Result<Self> {
        let mut parser = ZipParser::new(reader).with_max_eocd_scan(options.max_eocd_scan);
        let index = parser.read_index(options.max_entries)?;
        debug!(
            size = parser.size(),
            entries = index.len(),
            chunk_size = options.chunk_size,
            "opened archive"
        );

        Ok(Self {
            parser,
            state: State::Opened {
                index: Arc::new(index),
                scratch: Scratch::new(options.chunk_size),
            },
            options,
            hook: None,
        })
    }

    pub fn options(&self) -> &ArchiveOptions {
        &self.options
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Opened { .. })
    }

    /// Size of the underlying archive in bytes.
    pub fn archive_size(&self) -> u64 {
        self.parser.size()
    }

    /// The entry index. Clone the `Arc` to keep it, or read it from other threads.
    pub fn index(&self) -> Result<&Arc<ArchiveIndex>> {
        match &self.state {
            State::Opened { index, .. } => Ok(index),
            State::Closed => Err(ZipError::Closed),
        }
    }

    /// Look up an entry by exact name; first match wins.
    pub fn find(&self, name: &str) -> Result<&EntryRecord> {
        self.index()?.find(name)
    }

    /// Install a hook called before and after each extraction.
    ///
    /// Hooks must be `Send` so the handle can still move to a worker thread.
    pub fn set_hook(&mut self, hook: impl ExtractHook + Send + 'static) {
        self.hook = Some(Box::new(hook));
    }

    pub fn clear_hook(&mut self) {
        self.hook = None;
    }

    /// Extract the entry called `name` into `sink`, returning its uncompressed size.
    pub fn extract<S: Sink>(&mut self, name: &str, sink: S) -> Result<u64> {
        let index = Arc::clone(self.index()?);
        let entry = index.find(name)?;
        self.extract_entry(entry, sink)
    }

    /// Extract an already resolved entry into `sink`.
    pub fn extract_entry<S: Sink>(&mut self, entry: &EntryRecord, mut sink: S) -> Result<u64> {
        let scratch = match &mut self.state {
            State::Opened { scratch, .. } => scratch,
            State::Closed => return Err(ZipError::Closed),
        };

        if let Some(hook) = self.hook.as_mut() {
            hook.before_extract(entry);
        }

        let result = Extractor::new(&mut self.parser, scratch, self.options.verify_crc)
            .extract(entry, &mut sink);

        if let Some(hook) = self.hook.as_mut() {
            hook.after_extract(entry, &result);
        }
        result
    }

    /// Extract into a buffer allocated up front with exactly the entry's size.
    pub fn extract_to_heap(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut sink = HeapSink::new();
        self.extract(name, &mut sink)?;
        Ok(sink.into_vec())
    }

    /// Extract into `buf`, returning the number of bytes written.
    ///
    /// Fails with [`ZipError::BufferTooSmall`] before touching `buf` when the
    /// entry does not fit.
    pub fn extract_to_buffer(&mut self, name: &str, buf: &mut [u8]) -> Result<usize> {
        let mut sink = FixedBufferSink::new(buf);
        self.extract(name, &mut sink)?;
        Ok(sink.extracted_size())
    }

    /// Stream the entry through `write`, called with `(offset, chunk)`.
    pub fn extract_to_callback<F>(&mut self, name: &str, write: F) -> Result<u64>
    where
        F: FnMut(u64, &[u8]) -> usize,
    {
        self.extract(name, CallbackSink::new(write))
    }

    pub fn extract_to_writer<W: Write>(&mut self, name: &str, writer: W) -> Result<u64> {
        self.extract(name, WriterSink::new(writer))
    }

    /// Release the index and scratch buffers. Idempotent.
    pub fn close(&mut self) {
        if self.is_open() {
            debug!("closing archive");
        }
        self.state = State::Closed;
    }

    /// Close the handle and give back the byte source.
    pub fn into_inner(mut self) -> R {
        self.close();
        self.parser.into_inner()
    }
}

impl<R: ReadAt> fmt::Debug for ZipArchive<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = match &self.state {
            State::Opened { index, .. } => Some(index.len()),
            State::Closed => None,
        };
        f.debug_struct("ZipArchive")
            .field("size", &self.parser.size())
            .field("open", &self.is_open())
            .field("entries", &entries)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
