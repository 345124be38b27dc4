use super::ReadAt;
use crate::error::{Result, ZipError};

/// Reader over an archive image that already sits in memory.
///
/// Works over anything that derefs to bytes: a `&'static [u8]` baked into the
/// binary, a `Vec<u8>`, or a borrowed slice.
#[derive(Debug, Clone)]
pub struct MemoryReader<B: AsRef<[u8]>> {
    data: B,
}

impl<B: AsRef<[u8]>> MemoryReader<B> {
    pub fn new(data: B) -> Self {
        Self { data }
    }

    pub fn into_inner(self) -> B {
        self.data
    }
}

impl<B: AsRef<[u8]>> ReadAt for MemoryReader<B> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let data = self.data.as_ref();
        let out_of_range = || ZipError::OutOfRange {
            offset,
            len: buf.len(),
            size: data.len() as u64,
        };

        let start = usize::try_from(offset).map_err(|_| out_of_range())?;
        let end = start.checked_add(buf.len()).ok_or_else(out_of_range)?;
        if end > data.len() {
            return Err(out_of_range());
        }

        buf.copy_from_slice(&data[start..end]);
        Ok(buf.len())
    }

    fn size(&self) -> u64 {
        self.data.as_ref().len() as u64
    }
}
