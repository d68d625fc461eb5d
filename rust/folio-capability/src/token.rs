//! Wire format of capability tokens and their lifetimes.
//!
//! A token is `base64url(expires_at ":" signature)`. The resource name is not
//! part of the token; it travels next to it and is bound by the signature.

use base64::Engine;
use base64::alphabet::URL_SAFE;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};

use crate::Rejection;

/// URL-safe base64 that writes no padding and reads either form.
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Shortest lifetime a token may be issued with, in minutes.
pub const MIN_TTL_MINUTES: u64 = 5;

/// Longest lifetime a token may be issued with, in minutes.
pub const MAX_TTL_MINUTES: u64 = 60;

/// Lifetime used when a caller does not ask for one, in minutes.
pub const DEFAULT_TTL_MINUTES: u64 = 60;

/// A token lifetime, clamped to `[MIN_TTL_MINUTES, MAX_TTL_MINUTES]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ttl(u64);

impl Ttl {
    /// Clamp a requested lifetime in minutes.
    pub fn minutes(minutes: u64) -> Self {
        Self(minutes.clamp(MIN_TTL_MINUTES, MAX_TTL_MINUTES))
    }

    /// Clamp an optional lifetime, falling back to [`DEFAULT_TTL_MINUTES`].
    pub fn or_default(minutes: Option<u64>) -> Self {
        Self::minutes(minutes.unwrap_or(DEFAULT_TTL_MINUTES))
    }

    /// The clamped lifetime in minutes.
    pub fn as_minutes(&self) -> u64 {
        self.0
    }

    /// The clamped lifetime in seconds.
    pub fn as_secs(&self) -> u64 {
        self.0 * 60
    }
}

impl Default for Ttl {
    fn default() -> Self {
        Self(DEFAULT_TTL_MINUTES)
    }
}

/// An encoded capability token, as it appears in a `token` query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityToken(String);

impl CapabilityToken {
    pub(crate) fn encode(expires_at: u64, signature: &str) -> Self {
        Self(TOKEN_ENGINE.encode(format!("{expires_at}:{signature}")))
    }

    /// Decode the expiry and signature carried by this token.
    ///
    /// This checks shape only; see [`Verifier`](crate::Verifier) for
    /// authorization.
    pub fn claims(&self) -> Result<TokenClaims, Rejection> {
        TokenClaims::decode(&self.0)
    }

    /// The encoded form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CapabilityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CapabilityToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for CapabilityToken {
    fn from(token: &str) -> Self {
        Self(token.to_owned())
    }
}

/// The decoded contents of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Unix time (seconds) after which the token is invalid.
    pub expires_at: u64,
    /// The signature as it was presented.
    pub signature: String,
}

impl TokenClaims {
    /// Decode `base64url(expires_at ":" signature)`.
    ///
    /// The payload is split on its first `:`. An undecodable payload, a
    /// missing separator, an expiry that is not a plain decimal number or an
    /// empty signature all yield [`Rejection::Malformed`].
    pub fn decode(token: &str) -> Result<Self, Rejection> {
        let payload = TOKEN_ENGINE
            .decode(token.trim())
            .map_err(|_| Rejection::Malformed)?;
        let payload = String::from_utf8(payload).map_err(|_| Rejection::Malformed)?;

        let (expires_at, signature) = payload.split_once(':').ok_or(Rejection::Malformed)?;

        if expires_at.is_empty() || !expires_at.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(Rejection::Malformed);
        }
        let expires_at = expires_at.parse().map_err(|_| Rejection::Malformed)?;

        if signature.is_empty() {
            return Err(Rejection::Malformed);
        }

        Ok(Self {
            expires_at,
            signature: signature.to_owned(),
        })
    }
}
