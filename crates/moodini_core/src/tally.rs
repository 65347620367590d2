//! Concurrent two-level vote counters.

use crate::types::EntityId;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Bounds a tally category has to satisfy.
pub trait Category: Copy + Eq + Hash + Ord + Send + Sync + 'static {}

impl<T> Category for T where T: Copy + Eq + Hash + Ord + Send + Sync + 'static {}

/// Counters for one subject.
#[derive(Debug)]
struct SubjectCounters<C> {
    counters: RwLock<HashMap<C, AtomicU64>>,
}

impl<C: Category> SubjectCounters<C> {
    fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
        }
    }

    fn increment(&self, category: C) -> u64 {
        if let Some(counter) = self.counters.read().get(&category) {
            return counter.fetch_add(1, Ordering::SeqCst) + 1;
        }
        // Insert-if-absent under the write lock: a racing first writer finds
        // the counter the winner installed instead of replacing it.
        let mut counters = self.counters.write();
        counters
            .entry(category)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::SeqCst)
            + 1
    }

    fn snapshot(&self) -> BTreeMap<C, u64> {
        self.counters
            .read()
            .iter()
            .map(|(category, count)| (*category, count.load(Ordering::SeqCst)))
            .collect()
    }
}

/// Vote counts per subject and category.
///
/// Both levels are created lazily on the first vote and each
/// `(subject, category)` counter is installed at most once, however many
/// threads race to cast that first vote. Increments are lock-free once the
/// counter exists.
///
/// ```rust
/// use moodini_core::{ConcurrentTally, EntityId};
///
/// let tally = ConcurrentTally::new();
/// let question = EntityId::new(1);
/// tally.increment(question, 'a');
/// assert_eq!(tally.increment(question, 'a'), 2);
/// assert_eq!(tally.snapshot(question).get(&'a'), Some(&2));
/// ```
#[derive(Debug)]
pub struct ConcurrentTally<C> {
    subjects: RwLock<HashMap<EntityId, Arc<SubjectCounters<C>>>>,
}

impl<C: Category> Default for ConcurrentTally<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Category> ConcurrentTally<C> {
    /// Creates an empty tally.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subjects: RwLock::new(HashMap::new()),
        }
    }

    fn subject(&self, subject: EntityId) -> Arc<SubjectCounters<C>> {
        if let Some(counters) = self.subjects.read().get(&subject) {
            return Arc::clone(counters);
        }
        let mut subjects = self.subjects.write();
        Arc::clone(
            subjects
                .entry(subject)
                .or_insert_with(|| Arc::new(SubjectCounters::new())),
        )
    }

    /// Counts one vote and returns the category's new count.
    pub fn increment(&self, subject: EntityId, category: C) -> u64 {
        self.subject(subject).increment(category)
    }

    /// Point-in-time counts for `subject`; empty if it was never voted on.
    #[must_use]
    pub fn snapshot(&self, subject: EntityId) -> BTreeMap<C, u64> {
        let counters = self.subjects.read().get(&subject).map(Arc::clone);
        counters.map(|c| c.snapshot()).unwrap_or_default()
    }

    /// Total number of votes cast for `subject`.
    #[must_use]
    pub fn total(&self, subject: EntityId) -> u64 {
        self.snapshot(subject).values().sum()
    }

    /// Drops all counters of `subject`, returning whether it had any.
    pub fn remove(&self, subject: EntityId) -> bool {
        self.subjects.write().remove(&subject).is_some()
    }

    /// Number of subjects with at least one counter.
    #[must_use]
    pub fn subject_count(&self) -> usize {
        self.subjects.read().len()
    }

    fn to_map(&self) -> BTreeMap<EntityId, BTreeMap<C, u64>> {
        let subjects: Vec<_> = self
            .subjects
            .read()
            .iter()
            .map(|(id, counters)| (*id, Arc::clone(counters)))
            .collect();
        subjects
            .into_iter()
            .map(|(id, counters)| (id, counters.snapshot()))
            .collect()
    }

    fn from_map(map: BTreeMap<EntityId, BTreeMap<C, u64>>) -> Self {
        let subjects = map
            .into_iter()
            .map(|(id, counts)| {
                let counters = counts
                    .into_iter()
                    .map(|(category, count)| (category, AtomicU64::new(count)))
                    .collect();
                (
                    id,
                    Arc::new(SubjectCounters {
                        counters: RwLock::new(counters),
                    }),
                )
            })
            .collect();
        Self {
            subjects: RwLock::new(subjects),
        }
    }
}

impl<C: Category + Serialize> Serialize for ConcurrentTally<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

impl<'de, C: Category + DeserializeOwned> Deserialize<'de> for ConcurrentTally<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::<EntityId, BTreeMap<C, u64>>::deserialize(deserializer).map(Self::from_map)
    }
}
