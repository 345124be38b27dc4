//! Destinations for extracted bytes.
//!
//! The extraction engine drives every output through the [`Sink`] trait:
//! first one [`Sink::reserve`] call with the entry's declared uncompressed
//! size, then zero or more [`Sink::write_at`] calls whose offsets start at 0
//! and are contiguous. A sink can refuse at either step; the error aborts the
//! extraction and whatever the sink already holds is left for the caller.

use std::fmt;
use std::io::Write;

use crate::error::{Result, ZipError};

/// Output side of an extraction.
pub trait Sink {
    /// Called once, before any data, with the entry's declared uncompressed size.
    fn reserve(&mut self, size: u64) -> Result<()>;

    /// Accept the next chunk of output. `offset` equals the total written so far.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn reserve(&mut self, size: u64) -> Result<()> {
        (**self).reserve(size)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        (**self).write_at(offset, data)
    }
}

/// Collects the entry into a heap buffer allocated up front.
#[derive(Debug, Default)]
pub struct HeapSink {
    data: Vec<u8>,
}

impl HeapSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand the extracted bytes to the caller.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl Sink for HeapSink {
    fn reserve(&mut self, size: u64) -> Result<()> {
        let len = usize::try_from(size).map_err(|_| ZipError::AllocationFailure(size))?;
        self.data.clear();
        self.data
            .try_reserve_exact(len)
            .map_err(|_| ZipError::AllocationFailure(size))
    }

    fn write_at(&mut self, _offset: u64, data: &[u8]) -> Result<()> {
        self.data.extend_from_slice(data);
        Ok(())
    }
}

/// Writes into a caller-owned buffer and never past its end.
#[derive(Debug)]
pub struct FixedBufferSink<'a> {
    buf: &'a mut [u8],
    written: usize,
}

impl<'a> FixedBufferSink<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, written: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of bytes written so far.
    pub fn extracted_size(&self) -> usize {
        self.written
    }

    fn too_small(&self, required: u64) -> ZipError {
        ZipError::BufferTooSmall {
            required,
            capacity: self.buf.len(),
        }
    }
}

impl Sink for FixedBufferSink<'_> {
    fn reserve(&mut self, size: u64) -> Result<()> {
        if size > self.buf.len() as u64 {
            return Err(self.too_small(size));
        }
        self.written = 0;
        Ok(())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or_else(|| self.too_small(u64::MAX))?;
        if end > self.buf.len() as u64 {
            return Err(self.too_small(end));
        }
        let (start, end) = (offset as usize, end as usize);
        self.buf[start..end].copy_from_slice(data);
        self.written = self.written.max(end);
        Ok(())
    }
}

/// Forwards each chunk verbatim to a callback, e.g. a console or socket writer.
///
/// The callback returns how many bytes it consumed; anything other than the
/// full chunk aborts extraction with [`ZipError::ShortWrite`].
pub struct CallbackSink<F> {
    write: F,
}

impl<F> CallbackSink<F>
where
    F: FnMut(u64, &[u8]) -> usize,
{
    pub fn new(write: F) -> Self {
        Self { write }
    }
}

impl<F> Sink for CallbackSink<F>
where
    F: FnMut(u64, &[u8]) -> usize,
{
    fn reserve(&mut self, _size: u64) -> Result<()> {
        Ok(())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let written = (self.write)(offset, data);
        if written != data.len() {
            return Err(ZipError::ShortWrite {
                expected: data.len(),
                written,
            });
        }
        Ok(())
    }
}

impl<F> fmt::Debug for CallbackSink<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSink").finish_non_exhaustive()
    }
}

/// Adapter for any [`std::io::Write`] (stdout, a file, a socket).
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for WriterSink<W> {
    fn reserve(&mut self, _size: u64) -> Result<()> {
        Ok(())
    }

    fn write_at(&mut self, _offset: u64, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_sink_reserves_exactly() {
        let mut sink = HeapSink::new();
        sink.reserve(14).unwrap();
        sink.write_at(0, b"Hello, ").unwrap();
        sink.write_at(7, b"ESP32!\n").unwrap();
        let data = sink.into_vec();
        assert_eq!(data, b"Hello, ESP32!\n");
        assert!(data.capacity() >= 14);
    }

    #[test]
    fn heap_sink_reports_impossible_allocation() {
        let mut sink = HeapSink::new();
        let err = sink.reserve(u64::MAX).unwrap_err();
        assert!(matches!(err, ZipError::AllocationFailure(u64::MAX)));
    }

    #[test]
    fn fixed_sink_rejects_oversized_entry_without_writing() {
        let mut buf = [0x55u8; 8];
        let mut sink = FixedBufferSink::new(&mut buf);
        let err = sink.reserve(9).unwrap_err();
        assert!(matches!(
            err,
            ZipError::BufferTooSmall {
                required: 9,
                capacity: 8
            }
        ));
        assert_eq!(sink.extracted_size(), 0);
        assert_eq!(buf, [0x55u8; 8]);
    }

    #[test]
    fn fixed_sink_never_writes_past_capacity() {
        let mut buf = [0u8; 4];
        let mut sink = FixedBufferSink::new(&mut buf);
        sink.reserve(4).unwrap();
        sink.write_at(0, b"ab").unwrap();
        assert!(matches!(
            sink.write_at(2, b"cde"),
            Err(ZipError::BufferTooSmall { required: 5, .. })
        ));
        assert_eq!(sink.extracted_size(), 2);
        assert_eq!(&buf, b"ab\0\0");
    }

    #[test]
    fn callback_sink_forwards_chunks_in_order() {
        let mut seen = Vec::new();
        let mut sink = CallbackSink::new(|offset, data: &[u8]| {
            seen.push((offset, data.to_vec()));
            data.len()
        });
        sink.reserve(u64::MAX).unwrap();
        sink.write_at(0, b"abc").unwrap();
        sink.write_at(3, b"de").unwrap();
        drop(sink);
        assert_eq!(seen, vec![(0, b"abc".to_vec()), (3, b"de".to_vec())]);
    }

    #[test]
    fn callback_sink_short_write_fails() {
        let mut sink = CallbackSink::new(|_, data: &[u8]| data.len() - 1);
        let err = sink.write_at(0, b"abcd").unwrap_err();
        assert!(matches!(
            err,
            ZipError::ShortWrite {
                expected: 4,
                written: 3
            }
        ));
    }

    #[test]
    fn writer_sink_appends() {
        let mut sink = WriterSink::new(Vec::new());
        sink.write_at(0, b"one ").unwrap();
        sink.write_at(4, b"two").unwrap();
        assert_eq!(sink.into_inner(), b"one two");
    }
}
