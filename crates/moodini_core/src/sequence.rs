//! Monotonic id source.

use crate::types::EntityId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::atomic::{AtomicI64, Ordering};

/// Thread-safe, monotonically increasing id generator.
///
/// Starts at 0; the first id handed out is 1. The last issued value is what
/// gets persisted, so ids of deleted entities are not handed out again
/// after a restart.
#[derive(Debug, Default)]
pub struct Sequence {
    last: AtomicI64,
}

impl Sequence {
    /// Creates a sequence that has issued nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sequence whose next id follows `last`.
    #[must_use]
    pub fn starting_after(last: i64) -> Self {
        Self {
            last: AtomicI64::new(last),
        }
    }

    /// Issues the next id.
    pub fn next(&self) -> EntityId {
        EntityId::new(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Returns the last id issued (0 if none).
    #[must_use]
    pub fn current(&self) -> i64 {
        self.last.load(Ordering::SeqCst)
    }

    /// Moves the sequence forward to `last` if it is behind.
    ///
    /// Never moves backwards.
    pub fn restore(&self, last: i64) {
        self.last.fetch_max(last, Ordering::SeqCst);
    }
}

impl Clone for Sequence {
    fn clone(&self) -> Self {
        Self::starting_after(self.current())
    }
}

impl Serialize for Sequence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.current())
    }
}

impl<'de> Deserialize<'de> for Sequence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Self::starting_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn first_id_is_one() {
        let seq = Sequence::new();
        assert_eq!(seq.current(), 0);
        assert_eq!(seq.next(), EntityId::new(1));
        assert_eq!(seq.next(), EntityId::new(2));
        assert_eq!(seq.current(), 2);
    }

    #[test]
    fn restore_never_goes_backwards() {
        let seq = Sequence::starting_after(10);
        seq.restore(4);
        assert_eq!(seq.current(), 10);
        seq.restore(20);
        assert_eq!(seq.next(), EntityId::new(21));
    }

    #[test]
    fn concurrent_ids_are_unique() {
        let seq = Arc::new(Sequence::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let seq = Arc::clone(&seq);
                thread::spawn(move || (0..500).map(|_| seq.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 4000);
        assert_eq!(seq.current(), 4000);
    }

    #[test]
    fn serializes_last_value() {
        let seq = Sequence::starting_after(17);
        let mut bytes = Vec::new();
        ciborium::into_writer(&seq, &mut bytes).unwrap();
        let restored: Sequence = ciborium::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(restored.next(), EntityId::new(18));
    }
}
