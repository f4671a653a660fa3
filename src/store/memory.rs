use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::contracts::{Document, DocumentStore, LockResultExt, StoreError};

/// In-process document store.
///
/// Collections are created lazily and keyed by identifier; counters live in
/// their own map. A single writer lock makes counter increments atomic and
/// doubles as the unique index on the identifier field. Locks are never held
/// across await points.
///
/// This is the deployment backend for single-node installs and the test
/// double for everything else; multi-node deployments implement
/// [`DocumentStore`] over a hosted document database instead.
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Document>>,
    counters: HashMap<String, u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn increment_counter(&self, key: &str) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().map_lock_err()?;
        let seq = inner.counters.entry(key.to_string()).or_insert(0);
        *seq = seq
            .checked_add(1)
            .ok_or_else(|| StoreError::CounterOverflow(key.to_string()))?;
        Ok(*seq)
    }

    async fn raise_counter(&self, key: &str, floor: u64) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().map_lock_err()?;
        let seq = inner.counters.entry(key.to_string()).or_insert(0);
        if floor > *seq {
            *seq = floor;
        }
        Ok(*seq)
    }

    async fn counter_value(&self, key: &str) -> Result<Option<u64>, StoreError> {
        let inner = self.inner.read().map_lock_err()?;
        Ok(inner.counters.get(key).copied())
    }

    async fn max_identifier(
        &self,
        collection: &str,
        prefix: &str,
    ) -> Result<Option<String>, StoreError> {
        let inner = self.inner.read().map_lock_err()?;
        let Some(documents) = inner.collections.get(collection) else {
            return Ok(None);
        };
        // Identifier-ordered map: the last key in the prefix range is the
        // lexicographic maximum.
        Ok(documents
            .range(prefix.to_string()..)
            .take_while(|(identifier, _)| identifier.starts_with(prefix))
            .last()
            .map(|(identifier, _)| identifier.clone()))
    }

    async fn insert_unique(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<Document, StoreError> {
        let mut inner = self.inner.write().map_lock_err()?;
        let documents = inner.collections.entry(collection.to_string()).or_default();
        if documents.contains_key(&document.identifier) {
            return Err(StoreError::DuplicateIdentifier {
                collection: collection.to_string(),
                identifier: document.identifier,
            });
        }
        documents.insert(document.identifier.clone(), document.clone());
        Ok(document)
    }

    async fn get(
        &self,
        collection: &str,
        identifier: &str,
    ) -> Result<Option<Document>, StoreError> {
        let inner = self.inner.read().map_lock_err()?;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|documents| documents.get(identifier))
            .cloned())
    }

    async fn list(
        &self,
        collection: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError> {
        let inner = self.inner.read().map_lock_err()?;
        Ok(inner
            .collections
            .get(collection)
            .map(|documents| {
                documents
                    .values()
                    .skip(offset)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let inner = self.inner.read().map_lock_err()?;
        Ok(inner
            .collections
            .get(collection)
            .map(|documents| documents.len())
            .unwrap_or(0))
    }

    async fn update(
        &self,
        collection: &str,
        identifier: &str,
        body: Value,
    ) -> Result<Option<Document>, StoreError> {
        let mut inner = self.inner.write().map_lock_err()?;
        let Some(document) = inner
            .collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(identifier))
        else {
            return Ok(None);
        };
        document.body = body;
        document.updated_at = Utc::now();
        Ok(Some(document.clone()))
    }

    async fn delete(&self, collection: &str, identifier: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().map_lock_err()?;
        Ok(inner
            .collections
            .get_mut(collection)
            .and_then(|documents| documents.remove(identifier))
            .is_some())
    }
}
