#![warn(missing_docs)]

//! The signed-link media gateway.
//!
//! Protected media is served through a [ResourceGate]: a request carries a
//! resource name and a capability token, the token is verified against that
//! exact name, and only then is the object read from the [ObjectStore] and
//! streamed back with a cache lifetime that never outlives the token.
//!
//! Tokens are handed out by the issuing endpoints, either one at a time
//! straight from the [Signer](folio_capability::Signer) or in batches through
//! the [TokenCache], which signs each name at most once per expiry minute.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use folio_capability::{Signer, SigningSecret};
//! use folio_media::{MediaService, router};
//! use folio_storage::MemoryObjectStore;
//! use url::Url;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let signer = Signer::new(
//!     SigningSecret::new("top secret")?,
//!     Url::parse("https://media.example.com/media")?,
//! )?;
//! let service = MediaService::new(signer, Arc::new(MemoryObjectStore::new()));
//! let app: axum::Router = router(service.into_shared());
//! # let _ = app;
//! # Ok(())
//! # }
//! ```
//!
//! [ObjectStore]: folio_storage::ObjectStore

mod cache;
pub use cache::*;

mod config;
pub use config::*;

mod error;
pub use error::*;

mod gate;
pub use gate::*;

mod routes;
pub use routes::*;

mod server;
pub use server::*;

mod service;
pub use service::*;

mod telemetry;
pub use telemetry::*;
