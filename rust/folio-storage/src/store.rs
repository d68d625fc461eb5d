use std::sync::Arc;

use async_trait::async_trait;
use folio_capability::ResourceKey;

use crate::{StorageError, StoredObject};

mod memory;
pub use memory::*;

mod fs;
pub use fs::*;

#[cfg(feature = "s3")]
mod s3;
#[cfg(feature = "s3")]
pub use s3::*;

/// An [ObjectStore] is a read-only facade over whatever substrate holds the
/// protected media: memory, a local directory or an S3-compatible bucket.
///
/// A missing object is `Ok(None)`. Errors are reserved for the store itself
/// being unreachable or broken.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Retrieve the object (if any) stored under `key`.
    async fn get(&self, key: &ResourceKey) -> Result<Option<StoredObject>, StorageError>;
}

#[async_trait]
impl<S> ObjectStore for Arc<S>
where
    S: ObjectStore + ?Sized,
{
    async fn get(&self, key: &ResourceKey) -> Result<Option<StoredObject>, StorageError> {
        (**self).get(key).await
    }
}
