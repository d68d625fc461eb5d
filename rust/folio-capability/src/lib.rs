#![warn(missing_docs)]

//! Capability tokens for time-bounded access to private media.
//!
//! A capability grants access to exactly one object, identified by a
//! [`ResourceKey`], until an expiry. The token carries the expiry and an
//! HMAC-SHA256 signature over `resource:expiry`; the resource name travels
//! beside it, so a token is useless for any other object.
//!
//! ```
//! use folio_capability::{Rejection, ResourceKey, Signer, SigningSecret, Ttl};
//! use url::Url;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let signer = Signer::new(
//!     SigningSecret::new("top secret")?,
//!     Url::parse("https://media.example.com/media")?,
//! )?;
//! let verifier = signer.verifier();
//!
//! let photo = ResourceKey::parse("gallery/a.jpg")?;
//! let signed = signer.sign(&photo, Ttl::minutes(10));
//!
//! let grant = verifier.verify(signed.token.as_str(), &photo)?;
//! assert!(grant.remaining_seconds <= 600);
//!
//! let other = ResourceKey::parse("gallery/b.jpg")?;
//! assert_eq!(
//!     verifier.verify(signed.token.as_str(), &other),
//!     Err(Rejection::SignatureMismatch)
//! );
//! # Ok(())
//! # }
//! ```

mod clock;
pub use clock::*;

mod error;
pub use error::*;

mod resource;
pub use resource::*;

mod secret;
pub use secret::*;

mod signer;
pub use signer::*;

mod token;
pub use token::*;

mod verifier;
pub use verifier::*;
