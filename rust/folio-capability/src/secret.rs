//! The server-held key behind every capability signature.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{CapabilityError, ResourceKey};

type HmacSha256 = Hmac<Sha256>;

/// Length of a rendered signature: 32 bytes of HMAC-SHA256 as hex.
pub const SIGNATURE_LENGTH: usize = 64;

/// Secret key material for HMAC-SHA256 capability signatures.
///
/// The secret is reference counted so signers, verifiers and caches can share
/// it cheaply. Its [`Debug`] output never includes the key.
#[derive(Clone)]
pub struct SigningSecret(Arc<[u8]>);

impl SigningSecret {
    /// Wrap the configured secret.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::MissingSecret`] when the secret is empty.
    /// Treat that as a startup failure.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, CapabilityError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(CapabilityError::MissingSecret);
        }
        Ok(Self(Arc::from(secret)))
    }

    /// Read the secret from an optional configuration value.
    pub fn from_option<S: AsRef<[u8]>>(secret: Option<S>) -> Result<Self, CapabilityError> {
        match secret {
            Some(secret) => Self::new(secret),
            None => Err(CapabilityError::MissingSecret),
        }
    }

    /// Lowercase hex HMAC-SHA256 over `resource:expires_at`.
    pub(crate) fn signature(&self, resource: &ResourceKey, expires_at: u64) -> String {
        hex::encode(self.mac(resource, expires_at).finalize().into_bytes())
    }

    /// Check a rendered signature for `resource:expires_at`.
    ///
    /// Only the exact lowercase hex rendering produced by
    /// [`signature`](Self::signature) is accepted; the MAC bytes are compared
    /// in constant time.
    pub(crate) fn verify(&self, resource: &ResourceKey, expires_at: u64, signature: &str) -> bool {
        let canonical = signature.len() == SIGNATURE_LENGTH
            && signature
                .bytes()
                .all(|byte| matches!(byte, b'0'..=b'9' | b'a'..=b'f'));
        if !canonical {
            return false;
        }

        match hex::decode(signature) {
            Ok(bytes) => self.mac(resource, expires_at).verify_slice(&bytes).is_ok(),
            Err(_) => false,
        }
    }

    fn mac(&self, resource: &ResourceKey, expires_at: u64) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.0).expect("HMAC-SHA256 accepts keys of any size");
        mac.update(resource.as_str().as_bytes());
        mac.update(b":");
        mac.update(expires_at.to_string().as_bytes());
        mac
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}
