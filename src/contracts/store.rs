use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::contracts::error::StoreError;

/// Collection-oriented document store.
///
/// # Invariants
/// - Counter increments are atomic: no two concurrent callers observe the
///   same post-increment value for the same key.
/// - Counters are created lazily at 1 on first increment and never deleted.
/// - `insert_unique` enforces a unique index on the identifier field and
///   fails with `StoreError::DuplicateIdentifier` on collision.
///
/// Each method is an independent asynchronous store round trip; callers
/// await them sequentially and never rely on cross-call atomicity.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Atomically increments the named counter, creating it at 1 if absent.
    /// Returns the post-increment value.
    async fn increment_counter(&self, key: &str) -> Result<u64, StoreError>;

    /// Raises the named counter to at least `floor` (set-to-max semantics;
    /// never lowers it). Returns the resulting counter value.
    async fn raise_counter(&self, key: &str, floor: u64) -> Result<u64, StoreError>;

    /// Returns the current counter value without incrementing, or None if
    /// the counter has never been touched.
    async fn counter_value(&self, key: &str) -> Result<Option<u64>, StoreError>;

    /// Returns the lexicographically greatest identifier in the collection
    /// that starts with `prefix`, or None if there is no match.
    async fn max_identifier(
        &self,
        collection: &str,
        prefix: &str,
    ) -> Result<Option<String>, StoreError>;

    /// Inserts a document, failing with `StoreError::DuplicateIdentifier`
    /// if the identifier already exists in the collection.
    async fn insert_unique(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<Document, StoreError>;

    /// Fetches a document by identifier.
    async fn get(&self, collection: &str, identifier: &str)
        -> Result<Option<Document>, StoreError>;

    /// Lists documents in identifier order. Returns up to `limit` documents
    /// starting at `offset`.
    async fn list(
        &self,
        collection: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Document>, StoreError>;

    /// Returns the number of documents in the collection.
    async fn count(&self, collection: &str) -> Result<usize, StoreError>;

    /// Replaces the body of an existing document, bumping `updated_at`.
    /// The identifier is immutable. Returns None if the document does not exist.
    async fn update(
        &self,
        collection: &str,
        identifier: &str,
        body: Value,
    ) -> Result<Option<Document>, StoreError>;

    /// Deletes a document. Returns true if a document was removed.
    async fn delete(&self, collection: &str, identifier: &str) -> Result<bool, StoreError>;
}

/// A stored document with its business identifier and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub identifier: String,
    pub body: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates a fresh document stamped with the current time.
    pub fn new(identifier: impl Into<String>, body: Value) -> Self {
        let now = Utc::now();
        Self {
            identifier: identifier.into(),
            body,
            created_at: now,
            updated_at: now,
        }
    }
}
