//! Journal writer.

use super::iterator::JournalIterator;
use super::record::JournalRecord;
use crate::error::CoreResult;
use moodini_storage::StorageBackend;

/// Append-only journal over a storage backend.
///
/// The journal is owned by a controller and only touched from inside its
/// writer section, so it needs no lock of its own.
pub struct Journal {
    backend: Box<dyn StorageBackend>,
    sync_on_write: bool,
}

impl Journal {
    /// Creates a journal over `backend`.
    ///
    /// With `sync_on_write` every append is synced to durable storage
    /// before it returns; otherwise it is only flushed.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_write: bool) -> Self {
        Self {
            backend,
            sync_on_write,
        }
    }

    /// Appends a record and returns the offset it was written at.
    pub fn append(&mut self, record: &JournalRecord) -> CoreResult<u64> {
        let data = record.encode()?;
        let offset = self.backend.append(&data)?;
        if self.sync_on_write {
            self.backend.sync()?;
        } else {
            self.backend.flush()?;
        }
        Ok(offset)
    }

    /// Returns a streaming iterator over all records.
    pub fn iter(&self) -> CoreResult<JournalIterator<'_>> {
        JournalIterator::new(self.backend.as_ref(), 0)
    }

    /// Reads every intact record.
    ///
    /// For large journals prefer [`iter`](Self::iter).
    pub fn read_all(&self) -> CoreResult<Vec<(u64, JournalRecord)>> {
        self.iter()?.collect()
    }

    /// Drops everything after `offset`, such as a torn trailing record.
    pub fn truncate_to(&mut self, offset: u64) -> CoreResult<()> {
        self.backend.truncate(offset)?;
        self.backend.sync()?;
        Ok(())
    }

    /// Empties the journal.
    pub fn clear(&mut self) -> CoreResult<()> {
        self.truncate_to(0)
    }

    /// Flushes pending writes to durable storage.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.backend.sync()?;
        Ok(())
    }

    /// Returns the journal size in bytes.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.size()?)
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("sync_on_write", &self.sync_on_write)
            .finish_non_exhaustive()
    }
}
