#![warn(missing_docs)]

//! Read-only object stores for protected media.
//!
//! An [ObjectStore] maps a normalised [ResourceKey](folio_capability::ResourceKey)
//! to a [StoredObject]: a lazily read body plus the metadata needed to serve
//! it (content type, entity tag, length). Stores distinguish an absent object
//! (`Ok(None)`) from the store itself failing ([StorageError]).
//!
//! ```rust
//! use folio_capability::ResourceKey;
//! use folio_storage::{MemoryObjectStore, ObjectStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryObjectStore::new();
//! let key = ResourceKey::parse("gallery/a.jpg")?;
//! store.put(key.clone(), b"jpeg bytes".to_vec(), None).await;
//!
//! let object = store.get(&key).await?.expect("stored above");
//! assert_eq!(object.metadata.content_type, "image/jpeg");
//! # Ok(())
//! # }
//! ```
//!
//! Backends:
//!
//! - [MemoryObjectStore] for tests and demos
//! - [FileSystemObjectStore] for a local media directory
//! - `S3ObjectStore` for S3-compatible buckets such as R2 (`s3` feature)

mod error;
pub use error::*;

mod object;
pub use object::*;

mod store;
pub use store::*;
