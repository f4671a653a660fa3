pub mod error;
pub mod store;

pub use error::{AllocatorError, LockResultExt, StoreError};
pub use store::{Document, DocumentStore};
