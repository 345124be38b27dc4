use crate::error::Result;

use super::structures::EntryRecord;

/// Instrumentation called around every extraction on a handle.
///
/// Both methods default to doing nothing. The demo binary uses this to print
/// allocator usage the way firmware prints its free heap.
pub trait ExtractHook {
    fn before_extract(&mut self, _entry: &EntryRecord) {}

    fn after_extract(&mut self, _entry: &EntryRecord, _result: &Result<u64>) {}
}

impl<F> ExtractHook for F
where
    F: FnMut(&EntryRecord, Option<&Result<u64>>),
{
    fn before_extract(&mut self, entry: &EntryRecord) {
        self(entry, None)
    }

    fn after_extract(&mut self, entry: &EntryRecord, result: &Result<u64>) {
        self(entry, Some(result))
    }
}
