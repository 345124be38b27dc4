use std::fmt;

use super::ReadAt;
use crate::error::Result;

/// Reader that delegates every positional read to a caller-supplied function.
///
/// The callback receives `(offset, buf)` and returns how many bytes it placed in
/// `buf`. Nothing else about its behavior is checked; [`ReadAt::read_exact_at`]
/// turns a short count into [`ZipError::ShortRead`](crate::ZipError::ShortRead).
pub struct CallbackReader<F> {
    size: u64,
    read: F,
}

impl<F> CallbackReader<F>
where
    F: FnMut(u64, &mut [u8]) -> usize,
{
    /// `size` is the total archive length the callback serves.
    pub fn new(size: u64, read: F) -> Self {
        Self { size, read }
    }
}

impl<F> ReadAt for CallbackReader<F>
where
    F: FnMut(u64, &mut [u8]) -> usize,
{
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        Ok((self.read)(offset, buf))
    }

    fn size(&self) -> u64 {
        self.size
    }
}

impl<F> fmt::Debug for CallbackReader<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackReader")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
