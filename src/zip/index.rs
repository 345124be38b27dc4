use crate::error::{Result, ZipError};

use super::structures::EntryRecord;

/// The parsed central directory, in directory order.
///
/// Built once when an archive is opened and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveIndex {
    entries: Vec<EntryRecord>,
}

impl ArchiveIndex {
    pub(crate) fn new(entries: Vec<EntryRecord>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&EntryRecord> {
        self.entries.get(index)
    }

    /// Look up an entry by exact, case-sensitive name.
    ///
    /// ZIP does not forbid duplicate names; the first one in directory order wins.
    pub fn find(&self, name: &str) -> Result<&EntryRecord> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| ZipError::NotFound(name.to_string()))
    }

    /// Directory position of the first entry called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EntryRecord> {
        self.entries.iter()
    }

    fn files(&self) -> impl Iterator<Item = &EntryRecord> {
        self.entries.iter().filter(|e| !e.is_directory)
    }

    /// Number of entries that are not directories.
    pub fn file_count(&self) -> usize {
        self.files().count()
    }

    /// Sum of the declared uncompressed sizes of all files.
    pub fn total_uncompressed_size(&self) -> u64 {
        self.files().map(|e| e.uncompressed_size).sum()
    }

    pub fn total_compressed_size(&self) -> u64 {
        self.files().map(|e| e.compressed_size).sum()
    }
}

impl<'a> IntoIterator for &'a ArchiveIndex {
    type Item = &'a EntryRecord;
    type IntoIter = std::slice::Iter<'a, EntryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
