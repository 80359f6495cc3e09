//! Process-wide keyed cache that applies patch sets and fans changes out to
//! subscribers.

use std::{
    collections::BTreeMap,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    keys::{Collection, EntityKey},
    protocol::{Patch, PatchMethod, PatchSet},
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

mod merge;
mod subscription;

pub use merge::{merge_value, without_nulls};
pub use subscription::{KeyFilter, StoreChange, Subscription};

const DEFAULT_CHANGE_BUFFER: usize = 1024;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to decode record at {key}: {source}")]
    Decode {
        key: EntityKey,
        #[source]
        source: serde_json::Error,
    },
}

pub struct ReactiveStore {
    records: RwLock<BTreeMap<EntityKey, Value>>,
    changes: broadcast::Sender<StoreChange>,
}

impl Default for ReactiveStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactiveStore {
    pub fn new() -> Self {
        Self::with_change_buffer(DEFAULT_CHANGE_BUFFER)
    }

    pub fn with_change_buffer(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            records: RwLock::new(BTreeMap::new()),
            changes,
        }
    }

    fn read_records(&self) -> RwLockReadGuard<'_, BTreeMap<EntityKey, Value>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_records(&self) -> RwLockWriteGuard<'_, BTreeMap<EntityKey, Value>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies every patch in order under one write lock.
    ///
    /// Subscribers are notified before the lock is released, so a
    /// subscription registered concurrently sees each change either in its
    /// initial values or as an event, never both.
    pub fn apply(&self, patches: &PatchSet) {
        if patches.is_empty() {
            return;
        }

        let mut records = self.write_records();
        for patch in patches {
            apply_patch(&mut records, patch);
            let _ = self.changes.send(StoreChange {
                key: patch.key.clone(),
                value: records.get(&patch.key).cloned(),
            });
        }
        debug!(patches = patches.len(), "store: applied patch set");
    }

    pub fn set(&self, key: EntityKey, value: impl Into<Value>) {
        self.apply(&PatchSet::new().with(Patch::set(key, value)));
    }

    pub fn merge(&self, key: EntityKey, value: impl Into<Value>) {
        self.apply(&PatchSet::new().with(Patch::merge(key, value)));
    }

    pub fn get(&self, key: &EntityKey) -> Option<Value> {
        self.read_records().get(key).cloned()
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.read_records().contains_key(key)
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &EntityKey) -> Result<Option<T>, StoreError> {
        self.get(key)
            .map(|value| decode(key, value))
            .transpose()
    }

    /// Every member of `collection`, ordered by key.
    pub fn collection(&self, collection: Collection) -> Vec<(EntityKey, Value)> {
        self.read_records()
            .iter()
            .filter(|(key, _)| key.belongs_to(collection))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn collection_as<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Vec<(EntityKey, T)>, StoreError> {
        self.collection(collection)
            .into_iter()
            .map(|(key, value)| {
                let record = decode(&key, value)?;
                Ok((key, record))
            })
            .collect()
    }

    pub fn snapshot(&self) -> BTreeMap<EntityKey, Value> {
        self.read_records().clone()
    }

    pub fn len(&self) -> usize {
        self.read_records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_records().is_empty()
    }

    pub fn subscribe(&self, filter: impl Into<KeyFilter>) -> Subscription {
        let filter = filter.into();
        let records = self.read_records();
        let receiver = self.changes.subscribe();
        let initial = records
            .iter()
            .filter(|(key, _)| filter.matches(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        drop(records);
        Subscription::new(filter, initial, receiver)
    }
}

fn decode<T: DeserializeOwned>(key: &EntityKey, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Decode {
        key: key.clone(),
        source,
    })
}

fn apply_patch(records: &mut BTreeMap<EntityKey, Value>, patch: &Patch) {
    if patch.value.is_null() {
        records.remove(&patch.key);
        return;
    }

    match patch.method {
        PatchMethod::Set => {
            records.insert(patch.key.clone(), without_nulls(patch.value.clone()));
        }
        PatchMethod::Merge => match records.get_mut(&patch.key) {
            Some(existing) => merge_value(existing, &patch.value),
            None => {
                records.insert(patch.key.clone(), without_nulls(patch.value.clone()));
            }
        },
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
