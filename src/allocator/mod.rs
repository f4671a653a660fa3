//! Year-scoped business identifier allocation.
//!
//! Job IDs (`MTL-2025-0001`) and sample-preparation request numbers
//! (`REQ-2025-001`) are issued from a persistent counter per `(kind, year)`,
//! reconciled against the greatest identifier already stored, and made
//! collision-proof by retrying inserts against the store's unique index.
//!
//! # Invariants
//! - For a `(kind, year)` the issued identifiers are collision-free and
//!   non-decreasing. Gaps are acceptable (aborted attempts); duplicates never.
//! - A counter is never moved backwards, including during reconciliation.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde_json::Value;

use crate::contracts::{AllocatorError, Document, DocumentStore, StoreError};

/// Upper bound on insert attempts before a create fails with
/// [`AllocatorError::Exhausted`].
pub const MAX_ALLOCATION_ATTEMPTS: usize = 10;

/// The two identifier families the lab issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// Sample-information job, `MTL-YYYY-NNNN`.
    Job,
    /// Sample-preparation request, `REQ-YYYY-NNN`.
    PrepRequest,
}

impl IdentifierKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            IdentifierKind::Job => "MTL",
            IdentifierKind::PrepRequest => "REQ",
        }
    }

    /// Zero-padding width of the numeric suffix. Sequences beyond the padded
    /// range widen naturally instead of truncating.
    pub fn pad_width(&self) -> usize {
        match self {
            IdentifierKind::Job => 4,
            IdentifierKind::PrepRequest => 3,
        }
    }

    /// Counter family name; combined with the year to form the counter key.
    pub fn counter_name(&self) -> &'static str {
        match self {
            IdentifierKind::Job => "job_id",
            IdentifierKind::PrepRequest => "request_no",
        }
    }

    /// Collection the identifiers of this kind live in.
    pub fn collection(&self) -> &'static str {
        match self {
            IdentifierKind::Job => "jobs",
            IdentifierKind::PrepRequest => "prep_requests",
        }
    }

    /// Counter document key for one calendar year, e.g. `job_id_2025`.
    pub fn counter_key(&self, year: i32) -> String {
        format!("{}_{}", self.counter_name(), year)
    }

    /// Identifier prefix shared by all issues of one year, e.g. `MTL-2025-`.
    pub fn year_prefix(&self, year: i32) -> String {
        format!("{}-{}-", self.prefix(), year)
    }
}

/// Pure formatting of a candidate identifier. No I/O.
pub fn format_identifier(kind: IdentifierKind, year: i32, sequence: u64) -> String {
    format!(
        "{}-{}-{:0width$}",
        kind.prefix(),
        year,
        sequence,
        width = kind.pad_width()
    )
}

/// Extracts the numeric suffix of an identifier (`MTL-2025-0050` -> 50).
fn numeric_suffix(identifier: &str) -> Option<u64> {
    identifier.rsplit('-').next()?.parse().ok()
}

/// Issues year-scoped sequence numbers and drives the
/// allocate/format/insert retry protocol.
///
/// Stateless apart from the shared store handle: all coordination between
/// concurrent callers happens through the store's atomic counter increment
/// and the unique index on the identifier field.
pub struct SequenceAllocator<S> {
    store: Arc<S>,
}

impl<S> Clone for SequenceAllocator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> SequenceAllocator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Returns the next candidate sequence for `(kind, year)`.
    ///
    /// Atomically increments the year's counter, then reconciles against the
    /// greatest identifier already stored for that year: a counter that
    /// drifted behind reality (manual imports, counter resets) is raised past
    /// the observed maximum. The result is distinct from any concurrently
    /// incremented value but not yet insert-proof; the unique index closes
    /// the residual race at insert time.
    pub async fn allocate(
        &self,
        kind: IdentifierKind,
        year: i32,
    ) -> Result<u64, AllocatorError> {
        let key = kind.counter_key(year);
        let mut sequence = self.store.increment_counter(&key).await?;

        let prefix = kind.year_prefix(year);
        if let Some(max_id) = self.store.max_identifier(kind.collection(), &prefix).await? {
            match numeric_suffix(&max_id) {
                Some(max_seq) if max_seq >= sequence => {
                    let raised = self.store.raise_counter(&key, max_seq + 1).await?;
                    tracing::warn!(
                        counter = %key,
                        stale_seq = sequence,
                        observed_max = max_seq,
                        raised_to = raised,
                        "counter behind stored identifiers, reconciled"
                    );
                    sequence = raised;
                }
                Some(_) => {}
                None => {
                    tracing::warn!(
                        identifier = %max_id,
                        "identifier with non-numeric suffix ignored during reconciliation"
                    );
                }
            }
        }

        Ok(sequence)
    }

    /// Creates a document under a freshly minted identifier.
    ///
    /// The year is taken from the clock at call time; callers cannot pick it.
    /// Insert-time duplicate rejections are retried with a re-allocated
    /// sequence up to [`MAX_ALLOCATION_ATTEMPTS`]; any other store error
    /// aborts immediately, since re-allocating a sequence will not fix an
    /// infrastructure fault.
    pub async fn create_with_unique_identifier(
        &self,
        kind: IdentifierKind,
        body: Value,
    ) -> Result<Document, AllocatorError> {
        let year = Utc::now().year();

        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let sequence = self.allocate(kind, year).await?;
            let identifier = format_identifier(kind, year, sequence);

            match self
                .store
                .insert_unique(
                    kind.collection(),
                    Document::new(identifier.clone(), body.clone()),
                )
                .await
            {
                Ok(document) => {
                    tracing::debug!(
                        identifier = %identifier,
                        attempt,
                        "identifier issued"
                    );
                    return Ok(document);
                }
                Err(e) if e.is_duplicate() => {
                    tracing::warn!(
                        identifier = %identifier,
                        attempt,
                        "identifier collision on insert, re-allocating"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AllocatorError::Exhausted {
            kind: kind.counter_name(),
            attempts: MAX_ALLOCATION_ATTEMPTS,
        })
    }
}
