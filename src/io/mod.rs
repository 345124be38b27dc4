mod callback;
mod local;
mod memory;

pub use callback::CallbackReader;
pub use local::LocalFileReader;
pub use memory::MemoryReader;

use crate::error::{Result, ZipError};

/// Trait for random access reading from a data source
pub trait ReadAt {
    /// Read data at the specified offset into the buffer, returning the byte count read
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill `buf` completely from `offset`, failing with [`ZipError::ShortRead`] otherwise.
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let actual = self.read_at(offset, buf)?;
        if actual != buf.len() {
            return Err(ZipError::ShortRead {
                offset,
                expected: buf.len(),
                actual,
            });
        }
        Ok(())
    }
}

impl<R: ReadAt + ?Sized> ReadAt for &mut R {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        (**self).read_at(offset, buf)
    }

    fn size(&self) -> u64 {
        (**self).size()
    }
}

impl<R: ReadAt + ?Sized> ReadAt for Box<R> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        (**self).read_at(offset, buf)
    }

    fn size(&self) -> u64 {
        (**self).size()
    }
}
