//! Streaming journal iterator.
//!
//! Records are read one at a time from the backend so replay memory stays
//! bounded by the largest record, not the journal size.

use super::record::{
    compute_crc32, JournalRecord, RecordType, CRC_SIZE, HEADER_SIZE, JOURNAL_MAGIC,
    JOURNAL_VERSION,
};
use crate::error::{CoreError, CoreResult};
use moodini_storage::StorageBackend;

/// Iterator over `(offset, record)` pairs.
///
/// - CRC mismatches return [`CoreError::ChecksumMismatch`]
/// - Truncated records end the iteration cleanly
/// - Bad magic, unknown types and newer versions return
///   [`CoreError::JournalCorruption`]
///
/// After an error or the end, [`valid_end`](Self::valid_end) is the offset
/// just past the last intact record.
pub struct JournalIterator<'a> {
    backend: &'a dyn StorageBackend,
    total_size: u64,
    offset: u64,
    finished: bool,
    truncated: bool,
}

impl<'a> JournalIterator<'a> {
    /// Creates an iterator starting at `start_offset`.
    pub fn new(backend: &'a dyn StorageBackend, start_offset: u64) -> CoreResult<Self> {
        let total_size = backend.size()?;
        Ok(Self {
            backend,
            total_size,
            offset: start_offset,
            finished: false,
            truncated: false,
        })
    }

    /// Offset just past the last record returned.
    #[must_use]
    pub fn valid_end(&self) -> u64 {
        self.offset
    }

    /// Whether iteration stopped at an incomplete trailing record.
    #[must_use]
    pub fn hit_truncated_tail(&self) -> bool {
        self.truncated
    }

    fn remaining(&self) -> u64 {
        self.total_size.saturating_sub(self.offset)
    }

    fn stop_truncated(&mut self) -> CoreResult<Option<(u64, JournalRecord)>> {
        self.finished = true;
        self.truncated = self.remaining() > 0;
        Ok(None)
    }

    fn read_next_record(&mut self) -> CoreResult<Option<(u64, JournalRecord)>> {
        let start = self.offset;

        if self.remaining() < HEADER_SIZE as u64 {
            return self.stop_truncated();
        }
        let header = self.backend.read_at(start, HEADER_SIZE)?;

        if header[0..4] != JOURNAL_MAGIC {
            return Err(CoreError::journal_corruption(format!(
                "invalid magic at offset {start}"
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version > JOURNAL_VERSION {
            return Err(CoreError::journal_corruption(format!(
                "unsupported version {version} at offset {start}"
            )));
        }

        let type_byte = header[6];
        let record_type = RecordType::from_byte(type_byte).ok_or_else(|| {
            CoreError::journal_corruption(format!(
                "unknown record type {type_byte} at offset {start}"
            ))
        })?;

        let payload_len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]);
        let rest_len = payload_len as usize + CRC_SIZE;
        if self.remaining() < (HEADER_SIZE + rest_len) as u64 {
            return self.stop_truncated();
        }

        let rest = self.backend.read_at(start + HEADER_SIZE as u64, rest_len)?;
        let (payload, crc_bytes) = rest.split_at(payload_len as usize);
        let stored_crc = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

        let mut framed = header;
        framed.extend_from_slice(payload);
        let computed_crc = compute_crc32(&framed);
        if stored_crc != computed_crc {
            return Err(CoreError::ChecksumMismatch {
                expected: stored_crc,
                actual: computed_crc,
            });
        }

        let record = JournalRecord::decode_payload(record_type, payload)?;
        self.offset = start + (HEADER_SIZE + rest_len) as u64;
        Ok(Some((start, record)))
    }
}

impl Iterator for JournalIterator<'_> {
    type Item = CoreResult<(u64, JournalRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_next_record() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CommitSeq;
    use moodini_storage::InMemoryBackend;

    fn command(seq: u64, payload: &[u8]) -> JournalRecord {
        JournalRecord::Command {
            sequence: CommitSeq::new(seq),
            payload: payload.to_vec(),
        }
    }

    fn backend_with(records: &[JournalRecord]) -> InMemoryBackend {
        let mut backend = InMemoryBackend::new();
        for record in records {
            backend.append(&record.encode().unwrap()).unwrap();
        }
        backend
    }

    #[test]
    fn empty_journal_yields_nothing() {
        let backend = InMemoryBackend::new();
        let mut iter = JournalIterator::new(&backend, 0).unwrap();
        assert!(iter.next().is_none());
        assert!(!iter.hit_truncated_tail());
        assert_eq!(iter.valid_end(), 0);
    }

    #[test]
    fn yields_records_with_offsets() {
        let records = [command(1, b"a"), command(2, b"bc")];
        let backend = backend_with(&records);
        let read: Vec<_> = JournalIterator::new(&backend, 0)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0], (0, records[0].clone()));
        assert_eq!(read[1].0, records[0].encode().unwrap().len() as u64);
        assert_eq!(read[1].1, records[1]);
    }

    #[test]
    fn truncated_tail_ends_cleanly() {
        let backend = backend_with(&[command(1, b"keep"), command(2, b"torn")]);
        let full = backend.size().unwrap();
        let mut cut = backend.clone();
        cut.truncate(full - 3).unwrap();

        let mut iter = JournalIterator::new(&cut, 0).unwrap();
        assert_eq!(iter.next().unwrap().unwrap().1, command(1, b"keep"));
        assert!(iter.next().is_none());
        assert!(iter.hit_truncated_tail());
        assert_eq!(
            iter.valid_end(),
            command(1, b"keep").encode().unwrap().len() as u64
        );
    }

    #[test]
    fn partial_header_ends_cleanly() {
        let mut backend = backend_with(&[command(1, b"x")]);
        backend.append(b"MJR").unwrap();
        let mut iter = JournalIterator::new(&backend, 0).unwrap();
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().is_none());
        assert!(iter.hit_truncated_tail());
    }

    #[test]
    fn flipped_payload_byte_is_checksum_mismatch() {
        let backend = backend_with(&[command(1, b"payload")]);
        backend.corrupt_byte(HEADER_SIZE + 9, b'X');
        let mut iter = JournalIterator::new(&backend, 0).unwrap();
        assert!(matches!(
            iter.next(),
            Some(Err(CoreError::ChecksumMismatch { .. }))
        ));
        assert!(iter.next().is_none());
    }

    #[test]
    fn bad_magic_is_corruption() {
        let backend = backend_with(&[command(1, b"x")]);
        backend.corrupt_byte(0, b'Z');
        let mut iter = JournalIterator::new(&backend, 0).unwrap();
        assert!(matches!(
            iter.next(),
            Some(Err(CoreError::JournalCorruption { .. }))
        ));
    }

    #[test]
    fn unknown_type_is_corruption() {
        let backend = backend_with(&[command(1, b"x")]);
        backend.corrupt_byte(6, 9);
        let mut iter = JournalIterator::new(&backend, 0).unwrap();
        assert!(matches!(
            iter.next(),
            Some(Err(CoreError::JournalCorruption { .. }))
        ));
    }
}
