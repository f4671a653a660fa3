use std::sync::{PoisonError, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

/// Extension trait for converting lock errors to StoreError.
pub trait LockResultExt<T> {
    /// Converts a lock error to a StoreError.
    fn map_lock_err(self) -> Result<T, StoreError>;
}

impl<'a, T> LockResultExt<RwLockReadGuard<'a, T>>
    for Result<RwLockReadGuard<'a, T>, PoisonError<RwLockReadGuard<'a, T>>>
{
    #[inline]
    fn map_lock_err(self) -> Result<RwLockReadGuard<'a, T>, StoreError> {
        self.map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl<'a, T> LockResultExt<RwLockWriteGuard<'a, T>>
    for Result<RwLockWriteGuard<'a, T>, PoisonError<RwLockWriteGuard<'a, T>>>
{
    #[inline]
    fn map_lock_err(self) -> Result<RwLockWriteGuard<'a, T>, StoreError> {
        self.map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// Rejected by the unique index on the identifier field.
    /// The only store error the allocator treats as retryable.
    #[error("Duplicate identifier '{identifier}' in collection '{collection}'")]
    DuplicateIdentifier {
        collection: String,
        identifier: String,
    },

    #[error("Counter overflow for key '{0}'")]
    CounterOverflow(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    /// True for insert-time unique-index rejections, the only class of
    /// error the identifier retry loop is allowed to swallow.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::DuplicateIdentifier { .. })
    }
}

#[derive(Error, Debug)]
pub enum AllocatorError {
    #[error("Unable to generate a unique {kind} identifier after {attempts} attempts")]
    Exhausted { kind: &'static str, attempts: usize },

    #[error("Store error during allocation: {0}")]
    Store(#[from] StoreError),
}
