//! Authorizing presented capability tokens.

use std::sync::Arc;

use thiserror::Error;

use crate::{Clock, ResourceKey, SigningSecret, SystemClock, TokenClaims};

/// Why a token does not authorize access.
///
/// The variants are distinct for logging; callers facing the network should
/// collapse them into a single unauthorized response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The token could not be decoded into an expiry and a signature.
    #[error("malformed token")]
    Malformed,
    /// The token's expiry has passed.
    #[error("token expired")]
    Expired,
    /// The signature does not match the resource and expiry.
    #[error("invalid signature")]
    SignatureMismatch,
}

impl Rejection {
    /// A stable, machine-readable name for the reason.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::Expired => "expired",
            Self::SignatureMismatch => "invalid_signature",
        }
    }
}

/// A successful verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    /// Unix time (seconds) after which the token is invalid.
    pub expires_at: u64,
    /// Seconds of validity left when the token was checked.
    pub remaining_seconds: u64,
}

/// Checks capability tokens against the resource they are presented for.
#[derive(Debug, Clone)]
pub struct Verifier {
    secret: SigningSecret,
    clock: Arc<dyn Clock>,
}

impl Verifier {
    /// Create a verifier that reads the system clock.
    pub fn new(secret: SigningSecret) -> Self {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    /// Create a verifier with an explicit time source.
    pub fn with_clock(secret: SigningSecret, clock: Arc<dyn Clock>) -> Self {
        Self { secret, clock }
    }

    /// Verify `token` for `resource`.
    ///
    /// Checks run in order: decoding, expiry, then the signature, which is
    /// recomputed from `resource` so a token is only ever valid for the name
    /// it was issued for. A token whose expiry equals the current second is
    /// still valid, with nothing remaining.
    pub fn verify(&self, token: &str, resource: &ResourceKey) -> Result<Grant, Rejection> {
        let claims = TokenClaims::decode(token)?;

        let now = self.clock.now();
        if claims.expires_at < now {
            return Err(Rejection::Expired);
        }

        if !self
            .secret
            .verify(resource, claims.expires_at, &claims.signature)
        {
            return Err(Rejection::SignatureMismatch);
        }

        Ok(Grant {
            expires_at: claims.expires_at,
            remaining_seconds: claims.expires_at - now,
        })
    }
}
