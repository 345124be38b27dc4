use thiserror::Error;

/// Errors produced while reading, indexing or extracting a ZIP archive.
///
/// Every variant is a recoverable value; nothing in this crate retries on its own.
#[derive(Error, Debug)]
pub enum ZipError {
    /// A read reached past the end of an in-memory source.
    #[error("read of {len} bytes at offset {offset} is outside the {size}-byte source")]
    OutOfRange { offset: u64, len: usize, size: u64 },

    /// A byte source returned fewer bytes than requested.
    #[error("short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    /// Error from an OS-backed source or a writer sink
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The central directory or a local header could not be parsed.
    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    #[error("entry not found: {0}")]
    NotFound(String),

    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    #[error("entry is encrypted: {0}")]
    Encrypted(String),

    /// The inflate primitive rejected the compressed stream.
    #[error("decompression failed: {0}")]
    DecompressionError(String),

    #[error("size mismatch: header declares {expected} bytes, produced {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("CRC-32 mismatch: expected {expected:#010x}, computed {actual:#010x}")]
    CrcMismatch { expected: u32, actual: u32 },

    /// A fixed output buffer cannot hold the entry. Raised before any byte is written.
    #[error("buffer too small: entry needs {required} bytes, buffer holds {capacity}")]
    BufferTooSmall { required: u64, capacity: usize },

    #[error("failed to allocate {0} bytes")]
    AllocationFailure(u64),

    /// A write callback accepted fewer bytes than it was handed.
    #[error("short write: expected {expected} bytes, callback accepted {written}")]
    ShortWrite { expected: usize, written: usize },

    #[error("archive handle is closed")]
    Closed,
}

impl ZipError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        ZipError::MalformedArchive(msg.into())
    }
}

/// Result type alias for archive operations
pub type Result<T> = std::result::Result<T, ZipError>;
