//! Single code path that moves one entry's bytes from a [`ReadAt`] source into
//! a [`Sink`], copying stored data and inflating DEFLATE data chunk by chunk.

use flate2::{Decompress, FlushDecompress, Status};
use tracing::{debug, trace};

use crate::error::{Result, ZipError};
use crate::io::ReadAt;
use crate::sink::Sink;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, EntryRecord};

/// Input and output windows used while extracting.
///
/// Owned by an archive handle and reused across extractions; never shared
/// between two extractions at once.
#[derive(Debug)]
pub(crate) struct Scratch {
    input: Vec<u8>,
    output: Vec<u8>,
}

impl Scratch {
    pub(crate) fn new(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            input: vec![0u8; chunk_size],
            output: vec![0u8; chunk_size],
        }
    }
}

/// Bytes produced by a copy or inflate pass and their CRC-32.
struct Produced {
    len: u64,
    crc32: u32,
}

pub(crate) struct Extractor<'a, R: ReadAt> {
    parser: &'a mut ZipParser<R>,
    scratch: &'a mut Scratch,
    verify_crc: bool,
}

impl<'a, R: ReadAt> Extractor<'a, R> {
    pub(crate) fn new(
        parser: &'a mut ZipParser<R>,
        scratch: &'a mut Scratch,
        verify_crc: bool,
    ) -> Self {
        Self {
            parser,
            scratch,
            verify_crc,
        }
    }

    /// Extract `entry` into `sink`, returning the uncompressed size.
    pub(crate) fn extract<S: Sink + ?Sized>(
        &mut self,
        entry: &EntryRecord,
        sink: &mut S,
    ) -> Result<u64> {
        if entry.is_encrypted() {
            return Err(ZipError::Encrypted(entry.name.clone()));
        }
        if let CompressionMethod::Unknown(method) = entry.compression_method {
            return Err(ZipError::UnsupportedCompression(method));
        }
        if entry.compression_method == CompressionMethod::Stored
            && entry.compressed_size != entry.uncompressed_size
        {
            return Err(ZipError::SizeMismatch {
                expected: entry.uncompressed_size,
                actual: entry.compressed_size,
            });
        }

        let data_offset = self.parser.data_offset(entry)?;
        debug!(
            entry = %entry.name,
            method = ?entry.compression_method,
            data_offset,
            compressed = entry.compressed_size,
            uncompressed = entry.uncompressed_size,
            "extracting entry"
        );

        // Capacity and allocation failures surface here, before any write.
        sink.reserve(entry.uncompressed_size)?;

        let produced = match entry.compression_method {
            CompressionMethod::Stored => self.copy_stored(entry, data_offset, sink)?,
            _ => self.inflate(entry, data_offset, sink)?,
        };

        if produced.len != entry.uncompressed_size {
            return Err(ZipError::SizeMismatch {
                expected: entry.uncompressed_size,
                actual: produced.len,
            });
        }
        if self.verify_crc && produced.crc32 != entry.crc32 {
            return Err(ZipError::CrcMismatch {
                expected: entry.crc32,
                actual: produced.crc32,
            });
        }

        Ok(produced.len)
    }

    fn copy_stored<S: Sink + ?Sized>(
        &mut self,
        entry: &EntryRecord,
        data_offset: u64,
        sink: &mut S,
    ) -> Result<Produced> {
        let input = &mut self.scratch.input;
        let mut hasher = crc32fast::Hasher::new();
        let mut remaining = entry.compressed_size;
        let mut written = 0u64;

        while remaining > 0 {
            let take = remaining.min(input.len() as u64) as usize;
            let chunk = &mut input[..take];
            self.parser
                .reader_mut()
                .read_exact_at(data_offset + written, chunk)?;
            sink.write_at(written, chunk)?;
            hasher.update(chunk);
            written += take as u64;
            remaining -= take as u64;
            trace!(written, remaining, "copied stored chunk");
        }

        Ok(Produced {
            len: written,
            crc32: hasher.finalize(),
        })
    }

    fn inflate<S: Sink + ?Sized>(
        &mut self,
        entry: &EntryRecord,
        data_offset: u64,
        sink: &mut S,
    ) -> Result<Produced> {
        let Scratch { input, output } = &mut *self.scratch;
        let mut inflater = Decompress::new(false);
        let mut hasher = crc32fast::Hasher::new();

        let mut read_offset = data_offset;
        let mut compressed_remaining = entry.compressed_size;
        // input[pending..filled] holds compressed bytes not yet consumed
        let mut pending = 0usize;
        let mut filled = 0usize;
        let mut written = 0u64;

        loop {
            if pending == filled && compressed_remaining > 0 {
                let take = compressed_remaining.min(input.len() as u64) as usize;
                self.parser
                    .reader_mut()
                    .read_exact_at(read_offset, &mut input[..take])?;
                read_offset += take as u64;
                compressed_remaining -= take as u64;
                pending = 0;
                filled = take;
            }

            // Never Finish: on a first call it needs the whole output in one window.
            let in_before = inflater.total_in();
            let out_before = inflater.total_out();
            let status = inflater
                .decompress(&input[pending..filled], &mut output[..], FlushDecompress::None)
                .map_err(|err| ZipError::DecompressionError(err.to_string()))?;
            let consumed = (inflater.total_in() - in_before) as usize;
            let produced = (inflater.total_out() - out_before) as usize;
            pending += consumed;

            if produced > 0 {
                let end = written + produced as u64;
                if end > entry.uncompressed_size {
                    return Err(ZipError::SizeMismatch {
                        expected: entry.uncompressed_size,
                        actual: end,
                    });
                }
                let chunk = &output[..produced];
                sink.write_at(written, chunk)?;
                hasher.update(chunk);
                written = end;
                trace!(consumed, produced, written, "inflated chunk");
            }

            match status {
                Status::StreamEnd => break,
                Status::Ok | Status::BufError => {
                    if consumed > 0 || produced > 0 {
                        continue;
                    }
                    let input_exhausted = compressed_remaining == 0 && pending == filled;
                    if input_exhausted && written == entry.uncompressed_size {
                        break;
                    }
                    let reason = if input_exhausted {
                        "compressed data ends before the deflate stream does"
                    } else {
                        "inflate made no progress"
                    };
                    return Err(ZipError::DecompressionError(reason.to_string()));
                }
            }
        }

        Ok(Produced {
            len: written,
            crc32: hasher.finalize(),
        })
    }
}
