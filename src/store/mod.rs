//! Append-only record store.
//!
//! Records are immutable once written, there is no update or delete path.
//! A record is identified by [`EntityId`] derived from the transaction hash
//! and log index, so inserting the same event twice is rejected.

mod record;

use std::collections::BTreeMap;

use dashmap::{DashMap, mapref::entry::Entry};

pub use record::*;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record already exists: {0}")]
    Duplicate(EntityId),
}

/// Position of a record in chain history, ties are broken by the ID
/// to keep records of synthetic/mock events apart.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Ordinal {
    block_number: u64,
    log_index: u64,
    id: EntityId,
}

impl Ordinal {
    fn of(entity: &Entity) -> Self {
        let meta = entity.meta();
        Self {
            block_number: meta.block_number,
            log_index: meta.log_index,
            id: meta.id.clone(),
        }
    }
}

/// Thread-safe in-memory store of records, partitioned by [`EntityKind`]
/// and ordered by chain position within each partition.
#[derive(Debug, Default)]
pub struct Store {
    ids: DashMap<EntityId, (EntityKind, Ordinal)>,
    tables: DashMap<EntityKind, BTreeMap<Ordinal, Entity>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a new record.
    ///
    /// Fails with [`StoreError::Duplicate`] if a record with the same ID
    /// exists already, leaving the existing one untouched.
    pub fn insert(&self, entity: impl Into<Entity>) -> Result<(), StoreError> {
        let entity = entity.into();
        match self.ids.entry(entity.id().clone()) {
            Entry::Occupied(e) => Err(StoreError::Duplicate(e.key().clone())),
            Entry::Vacant(e) => {
                let (kind, ordinal) = (entity.kind(), Ordinal::of(&entity));
                self.tables
                    .entry(kind)
                    .or_default()
                    .insert(ordinal.clone(), entity);
                e.insert((kind, ordinal));
                Ok(())
            }
        }
    }

    /// Record of the given kind by its ID.
    pub fn get(&self, kind: EntityKind, id: &EntityId) -> Option<Entity> {
        let (stored_kind, ordinal) = self.ids.get(id).map(|r| r.value().clone())?;
        if stored_kind != kind {
            return None;
        }
        self.tables.get(&kind)?.get(&ordinal).cloned()
    }

    /// Number of records of the given kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.tables.get(&kind).map(|t| t.len()).unwrap_or_default()
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Up to `first` most recent records of the given kind, newest first.
    pub fn recent(&self, kind: EntityKind, first: usize) -> Vec<Entity> {
        self.tables
            .get(&kind)
            .map(|t| t.values().rev().take(first).cloned().collect())
            .unwrap_or_default()
    }

    /// Same as [`Self::recent`] with records converted to the concrete type.
    pub fn recent_as<T: TryFrom<Entity>>(&self, kind: EntityKind, first: usize) -> Vec<T> {
        self.recent(kind, first)
            .into_iter()
            .filter_map(|e| T::try_from(e).ok())
            .collect()
    }

    /// Drops all records.
    pub fn clear(&self) {
        self.ids.clear();
        self.tables.clear();
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, TxHash, U256};

    use super::*;

    fn apy(block_number: u64, log_index: u64, value: u64) -> ApyUpdated {
        let tx_hash = TxHash::with_last_byte(block_number as u8);
        ApyUpdated {
            meta: RecordMeta {
                id: EntityId::new(tx_hash, log_index),
                block_number,
                block_timestamp: 1_000 + block_number,
                transaction_hash: tx_hash,
                log_index,
            },
            new_apy: U256::from(value),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = Store::new();
        let record = apy(10, 0, 315);
        let id = record.meta.id.clone();
        store.insert(record.clone()).unwrap();

        assert_eq!(store.count(EntityKind::ApyUpdated), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(EntityKind::ApyUpdated, &id),
            Some(Entity::ApyUpdated(record))
        );
        assert_eq!(store.get(EntityKind::TokenAdded, &id), None);
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let store = Store::new();
        store.insert(apy(10, 0, 315)).unwrap();

        let duplicate = apy(10, 0, 999);
        let id = duplicate.meta.id.clone();
        assert_eq!(store.insert(duplicate), Err(StoreError::Duplicate(id.clone())));

        let kept = store.get(EntityKind::ApyUpdated, &id).unwrap();
        assert_eq!(kept.field("newAPY").as_deref(), Some("315"));
        assert_eq!(store.count(EntityKind::ApyUpdated), 1);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let store = Store::new();
        for (block, log) in [(3, 1), (1, 0), (3, 0), (2, 5), (4, 2), (5, 0)] {
            store.insert(apy(block, log, block * 10 + log)).unwrap();
        }
        store
            .insert(TokenAdded {
                meta: RecordMeta {
                    id: EntityId::from("token-added"),
                    block_number: 9,
                    block_timestamp: 9,
                    transaction_hash: TxHash::ZERO,
                    log_index: 0,
                },
                token: Address::ZERO,
            })
            .unwrap();

        let recent: Vec<ApyUpdated> = store.recent_as(EntityKind::ApyUpdated, 4);
        let values: Vec<_> = recent.iter().map(|r| r.new_apy.to::<u64>()).collect();
        assert_eq!(values, vec![50, 42, 31, 30]);

        assert_eq!(store.recent(EntityKind::ApyUpdated, 100).len(), 6);
        assert_eq!(store.recent(EntityKind::PositionOpened, 5).len(), 0);
        assert_eq!(store.len(), 7);
    }

    #[test]
    fn test_clear() {
        let store = Store::new();
        store.insert(apy(1, 0, 1)).unwrap();
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.count(EntityKind::ApyUpdated), 0);
        store.insert(apy(1, 0, 1)).unwrap();
    }
}
