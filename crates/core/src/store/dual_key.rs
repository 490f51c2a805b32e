//! Concurrent map indexed by two keys.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::error::StoreError;

struct Slot<K2, V> {
    key: K2,
    value: V,
}

struct Indexes<K1, K2, V> {
    by_id: HashMap<K1, Slot<K2, V>>,
    by_key: HashMap<K2, K1>,
}

impl<K1, K2, V> Indexes<K1, K2, V>
where
    K1: Eq + Hash + Clone,
    K2: Eq + Hash + Clone,
{
    fn insert(&mut self, id: K1, key: K2, value: V) {
        self.by_key.insert(key.clone(), id.clone());
        self.by_id.insert(id, Slot { key, value });
    }

    /// Removes the record only when both indexes point at each other.
    fn remove_pair(&mut self, id: &K1, key: &K2) -> Option<V> {
        let agrees = self.by_id.get(id).is_some_and(|slot| slot.key == *key)
            && self.by_key.get(key).is_some_and(|bound| bound == id);
        if !agrees {
            return None;
        }
        self.by_key.remove(key);
        self.by_id.remove(id).map(|slot| slot.value)
    }

    fn verify(&self) -> Result<(), StoreError> {
        let mismatch = || StoreError::Inconsistent {
            by_id: self.by_id.len(),
            by_key: self.by_key.len(),
        };
        if self.by_id.len() != self.by_key.len() {
            return Err(mismatch());
        }
        for (id, slot) in &self.by_id {
            if self.by_key.get(&slot.key) != Some(id) {
                return Err(mismatch());
            }
        }
        Ok(())
    }
}

/// A thread-safe map where every value is reachable by an id and by a
/// natural key.
///
/// All mutations run under a single exclusive lock and re-check that the two
/// indexes agree afterwards. A disagreement is a bug in this type: debug
/// builds panic, release builds log it. Enumeration methods return
/// point-in-time copies.
pub struct DualKeyStore<K1, K2, V> {
    inner: RwLock<Indexes<K1, K2, V>>,
}

impl<K1, K2, V> Default for DualKeyStore<K1, K2, V>
where
    K1: Eq + Hash + Clone,
    K2: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K1, K2, V> fmt::Debug for DualKeyStore<K1, K2, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indexes = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("DualKeyStore")
            .field("by_id", &indexes.by_id.len())
            .field("by_key", &indexes.by_key.len())
            .finish()
    }
}

impl<K1, K2, V> DualKeyStore<K1, K2, V>
where
    K1: Eq + Hash + Clone,
    K2: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Indexes {
                by_id: HashMap::new(),
                by_key: HashMap::new(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Indexes<K1, K2, V>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Indexes<K1, K2, V>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(indexes: &Indexes<K1, K2, V>) {
        if let Err(e) = indexes.verify() {
            if cfg!(debug_assertions) {
                panic!("{}", e);
            }
            tracing::error!(error = %e, "Dual key store consistency check failed");
        }
    }

    /// Inserts `value` unless the pair is already present.
    ///
    /// Returns the stored value and whether it was inserted. When only one of
    /// the keys is bound, or the keys are bound to different records, the
    /// store is left untouched and [`StoreError::KeyConflict`] is returned.
    pub fn get_or_add(&self, id: K1, key: K2, value: V) -> Result<(V, bool), StoreError> {
        let mut indexes = self.write();
        let existing = match (indexes.by_id.get(&id), indexes.by_key.get(&key)) {
            (None, None) => None,
            (Some(slot), Some(bound)) if *bound == id && slot.key == key => {
                Some(Ok(slot.value.clone()))
            }
            (Some(_), _) => Some(Err(StoreError::key_conflict(
                "id is already bound to another natural key",
            ))),
            (None, Some(_)) => Some(Err(StoreError::key_conflict(
                "natural key is already bound to another id",
            ))),
        };
        let result = match existing {
            None => {
                indexes.insert(id, key, value.clone());
                Ok((value, true))
            }
            Some(Ok(current)) => Ok((current, false)),
            Some(Err(e)) => Err(e),
        };
        Self::check(&indexes);
        result
    }

    /// Binds both keys to `value`, evicting whatever either key reached.
    ///
    /// This moves a record to a new natural key while keeping its id (or the
    /// other way around). Returns the displaced values.
    pub fn add_or_update(&self, id: K1, key: K2, value: V) -> Vec<V> {
        let mut indexes = self.write();
        let mut displaced = Vec::new();

        if let Some(slot) = indexes.by_id.remove(&id) {
            indexes.by_key.remove(&slot.key);
            displaced.push(slot.value);
        }
        if let Some(bound) = indexes.by_key.remove(&key) {
            if let Some(slot) = indexes.by_id.remove(&bound) {
                displaced.push(slot.value);
            }
        }
        indexes.insert(id, key, value);

        Self::check(&indexes);
        displaced
    }

    /// Removes the record bound to exactly this pair of keys.
    pub fn try_remove(&self, id: &K1, key: &K2) -> Option<V> {
        let mut indexes = self.write();
        let removed = indexes.remove_pair(id, key);
        Self::check(&indexes);
        removed
    }

    /// Removes the record reachable by `id`.
    pub fn try_remove_by_id(&self, id: &K1) -> Option<V> {
        let mut indexes = self.write();
        let key = indexes.by_id.get(id).map(|slot| slot.key.clone());
        let removed = key.and_then(|key| indexes.remove_pair(id, &key));
        Self::check(&indexes);
        removed
    }

    /// Removes the record reachable by the natural `key`.
    pub fn try_remove_by_key(&self, key: &K2) -> Option<V> {
        let mut indexes = self.write();
        let id = indexes.by_key.get(key).cloned();
        let removed = id.and_then(|id| indexes.remove_pair(&id, key));
        Self::check(&indexes);
        removed
    }

    /// Looks a value up by id.
    pub fn get_by_id(&self, id: &K1) -> Option<V> {
        self.read().by_id.get(id).map(|slot| slot.value.clone())
    }

    /// Looks a value up by natural key.
    pub fn get_by_key(&self, key: &K2) -> Option<V> {
        let indexes = self.read();
        indexes
            .by_key
            .get(key)
            .and_then(|id| indexes.by_id.get(id))
            .map(|slot| slot.value.clone())
    }

    /// Returns the natural key bound to `id`.
    pub fn key_of(&self, id: &K1) -> Option<K2> {
        self.read().by_id.get(id).map(|slot| slot.key.clone())
    }

    /// Returns the id bound to the natural `key`.
    pub fn id_of(&self, key: &K2) -> Option<K1> {
        self.read().by_key.get(key).cloned()
    }

    pub fn contains_id(&self, id: &K1) -> bool {
        self.read().by_id.contains_key(id)
    }

    pub fn contains_key(&self, key: &K2) -> bool {
        self.read().by_key.contains_key(key)
    }

    /// Number of records, counted through the id index.
    pub fn len(&self) -> usize {
        self.read().by_id.len()
    }

    /// Number of records, counted through the natural key index.
    pub fn key_count(&self) -> usize {
        self.read().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().by_id.is_empty()
    }

    /// Snapshot of all ids.
    pub fn ids(&self) -> Vec<K1> {
        self.read().by_id.keys().cloned().collect()
    }

    /// Snapshot of all natural keys.
    pub fn keys(&self) -> Vec<K2> {
        self.read().by_key.keys().cloned().collect()
    }

    /// Snapshot of all values.
    pub fn values(&self) -> Vec<V> {
        self.read()
            .by_id
            .values()
            .map(|slot| slot.value.clone())
            .collect()
    }

    /// Snapshot of every `(id, key, value)` triple.
    pub fn entries(&self) -> Vec<(K1, K2, V)> {
        self.read()
            .by_id
            .iter()
            .map(|(id, slot)| (id.clone(), slot.key.clone(), slot.value.clone()))
            .collect()
    }

    /// Removes everything.
    pub fn clear(&self) {
        let mut indexes = self.write();
        indexes.by_id.clear();
        indexes.by_key.clear();
    }

    /// Checks that both indexes describe the same set of records.
    pub fn verify(&self) -> Result<(), StoreError> {
        self.read().verify()
    }
}
