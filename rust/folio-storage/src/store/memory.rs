use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use folio_capability::ResourceKey;
use tokio::sync::RwLock;

use crate::{ObjectBody, ObjectMetadata, ObjectStore, StorageError, StoredObject, guess_content_type};

#[derive(Clone)]
struct MemoryObject {
    data: Bytes,
    content_type: String,
    etag: String,
}

/// A trivial [ObjectStore] where all objects are kept in memory.
///
/// Clones share the same objects, so one handle can seed the store while
/// another serves it.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<ResourceKey, MemoryObject>>>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `key`.
    ///
    /// The content type is guessed from the key unless given; the entity tag
    /// is the MD5 of the data.
    pub async fn put(&self, key: ResourceKey, data: impl Into<Bytes>, content_type: Option<&str>) {
        let data = data.into();
        let content_type = content_type
            .map(str::to_owned)
            .unwrap_or_else(|| guess_content_type(&key).to_owned());
        let etag = format!("{:x}", md5::compute(&data));

        self.objects.write().await.insert(
            key,
            MemoryObject {
                data,
                content_type,
                etag,
            },
        );
    }

    /// Remove the object under `key`, reporting whether it existed.
    pub async fn remove(&self, key: &ResourceKey) -> bool {
        self.objects.write().await.remove(key).is_some()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl std::fmt::Debug for MemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryObjectStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, key: &ResourceKey) -> Result<Option<StoredObject>, StorageError> {
        let objects = self.objects.read().await;
        Ok(objects.get(key).map(|object| StoredObject {
            metadata: ObjectMetadata {
                content_type: object.content_type.clone(),
                etag: object.etag.clone(),
                content_length: Some(object.data.len() as u64),
            },
            body: ObjectBody::from_bytes(object.data.clone()),
        }))
    }
}
