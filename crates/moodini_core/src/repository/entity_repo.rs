//! Generic versioned entity store.

use crate::error::RepositoryError;
use crate::model::Entity;
use crate::sequence::Sequence;
use crate::stamp::VersionStamp;
use crate::types::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// In-memory map from id to entity with optimistic version checks.
///
/// The repository itself is not synchronized beyond its id sequence; the
/// check-then-write in [`update`](Self::update) is atomic because every
/// mutation runs inside a controller command, one at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRepository<E> {
    entities: BTreeMap<EntityId, E>,
    seq: Sequence,
}

impl<E: Entity> Default for EntityRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntityRepository<E> {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            seq: Sequence::new(),
        }
    }

    /// Stores `draft` under a fresh id and returns the stored value.
    ///
    /// Any id or version carried by the draft is ignored.
    pub fn create(&mut self, draft: E) -> E {
        let id = self.seq.next();
        let version = VersionStamp::compute(&draft);
        let stored = draft.with_identity(id, version);
        self.entities.insert(id, stored.clone());
        stored
    }

    /// Looks up an entity by id.
    pub fn read(&self, id: EntityId) -> Result<E, RepositoryError> {
        self.get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(E::COLLECTION, id))
    }

    /// Borrows an entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&E> {
        self.entities.get(&id)
    }

    /// All entities, ascending by id.
    #[must_use]
    pub fn list(&self) -> Vec<E> {
        self.entities.values().cloned().collect()
    }

    /// The entity with the highest id.
    pub fn read_latest(&self) -> Result<E, RepositoryError> {
        self.entities
            .last_key_value()
            .map(|(_, entity)| entity.clone())
            .ok_or(RepositoryError::Empty {
                collection: E::COLLECTION,
            })
    }

    /// Replaces the stored entity if `candidate` carries its current version.
    ///
    /// On success the stored value gets a new version. On failure nothing
    /// changes.
    pub fn update(&mut self, candidate: E) -> Result<E, RepositoryError> {
        let id = candidate.id().ok_or(RepositoryError::MissingId {
            collection: E::COLLECTION,
        })?;
        let current = self
            .entities
            .get(&id)
            .ok_or_else(|| RepositoryError::not_found(E::COLLECTION, id))?
            .version();
        if current != candidate.version() {
            return Err(RepositoryError::Conflict {
                collection: E::COLLECTION,
                id,
                expected: candidate.version(),
                actual: current,
            });
        }
        let version = VersionStamp::advance(current, &candidate);
        let stored = candidate.with_identity(id, version);
        self.entities.insert(id, stored.clone());
        Ok(stored)
    }

    /// Removes an entity and returns it.
    pub fn delete(&mut self, id: EntityId) -> Result<E, RepositoryError> {
        self.entities
            .remove(&id)
            .ok_or_else(|| RepositoryError::not_found(E::COLLECTION, id))
    }

    /// Whether `id` is stored.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Last id the sequence issued, including ids of deleted entities.
    #[must_use]
    pub fn last_id(&self) -> i64 {
        self.seq.current()
    }
}
