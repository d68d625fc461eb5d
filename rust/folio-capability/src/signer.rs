//! Issuing capability tokens and signed URLs.

use std::sync::Arc;

use serde::Serialize;
use url::Url;

use crate::{
    CapabilityError, CapabilityToken, Clock, ResourceKey, SigningSecret, SystemClock, Ttl, Verifier,
};

/// A freshly signed capability for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedResource {
    /// The resource the token is bound to.
    pub resource: ResourceKey,
    /// The encoded capability token.
    pub token: CapabilityToken,
    /// `{base_url}/{resource}?token={token}`.
    pub url: Url,
    /// Unix time (seconds) after which the token is invalid.
    pub expires_at: u64,
}

/// Anything that can issue signed resources.
///
/// [`Signer`] is the production implementation; the seam exists so callers
/// such as token caches can be exercised against an instrumented issuer.
pub trait Issue: Send + Sync {
    /// Issue a capability for `resource` valid for `ttl`.
    fn issue(&self, resource: &ResourceKey, ttl: Ttl) -> SignedResource;
}

impl<I: Issue + ?Sized> Issue for Arc<I> {
    fn issue(&self, resource: &ResourceKey, ttl: Ttl) -> SignedResource {
        (**self).issue(resource, ttl)
    }
}

/// Signs resource keys into time-bounded capability URLs.
///
/// ```
/// use folio_capability::{ResourceKey, Signer, SigningSecret, Ttl};
/// use url::Url;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let signer = Signer::new(
///     SigningSecret::new("top secret")?,
///     Url::parse("https://media.example.com/media")?,
/// )?;
///
/// let key = ResourceKey::parse("gallery/a.jpg")?;
/// let signed = signer.sign(&key, Ttl::minutes(10));
///
/// assert!(signed.url.as_str().starts_with("https://media.example.com/media/gallery/a.jpg?token="));
/// assert!(signer.verifier().verify(signed.token.as_str(), &key).is_ok());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Signer {
    secret: SigningSecret,
    base_url: Url,
    clock: Arc<dyn Clock>,
}

impl Signer {
    /// Create a signer that reads the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidBaseUrl`] when `base_url` cannot
    /// carry a path (e.g. `mailto:` or `data:` URLs).
    pub fn new(secret: SigningSecret, base_url: Url) -> Result<Self, CapabilityError> {
        Self::with_clock(secret, base_url, Arc::new(SystemClock))
    }

    /// Create a signer with an explicit time source.
    pub fn with_clock(
        secret: SigningSecret,
        base_url: Url,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CapabilityError> {
        if base_url.cannot_be_a_base() {
            return Err(CapabilityError::InvalidBaseUrl(format!(
                "{base_url} cannot carry a resource path"
            )));
        }

        Ok(Self {
            secret,
            base_url,
            clock,
        })
    }

    /// Sign `resource` for `ttl`.
    pub fn sign(&self, resource: &ResourceKey, ttl: Ttl) -> SignedResource {
        let expires_at = self.clock.now().saturating_add(ttl.as_secs());
        let signature = self.secret.signature(resource, expires_at);
        let token = CapabilityToken::encode(expires_at, &signature);
        let url = self.url_for(resource, &token);

        SignedResource {
            resource: resource.clone(),
            token,
            url,
            expires_at,
        }
    }

    /// Parse `name` and sign it, clamping `ttl_minutes`.
    pub fn sign_name(
        &self,
        name: &str,
        ttl_minutes: Option<u64>,
    ) -> Result<SignedResource, CapabilityError> {
        let resource = ResourceKey::parse(name)?;
        Ok(self.sign(&resource, Ttl::or_default(ttl_minutes)))
    }

    /// A verifier sharing this signer's secret and clock.
    pub fn verifier(&self) -> Verifier {
        Verifier::with_clock(self.secret.clone(), self.clock.clone())
    }

    /// The clock this signer reads.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The URL signed resources are rooted at.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, resource: &ResourceKey, token: &CapabilityToken) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(resource.segments());
        }
        url.query_pairs_mut().append_pair("token", token.as_str());
        url
    }
}

impl Issue for Signer {
    fn issue(&self, resource: &ResourceKey, ttl: Ttl) -> SignedResource {
        self.sign(resource, ttl)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{ManualClock, Rejection};

    const NOW: u64 = 1_700_000_000;

    fn signer(clock: &ManualClock) -> Signer {
        Signer::with_clock(
            SigningSecret::new("top secret").unwrap(),
            Url::parse("https://media.example.com/media").unwrap(),
            Arc::new(clock.clone()),
        )
        .unwrap()
    }

    fn key(name: &str) -> ResourceKey {
        ResourceKey::parse(name).unwrap()
    }

    #[test]
    fn it_computes_expiry_from_the_clamped_ttl() {
        let clock = ManualClock::new(NOW);
        let signer = signer(&clock);

        assert_eq!(signer.sign(&key("a"), Ttl::minutes(10)).expires_at, NOW + 600);
        assert_eq!(signer.sign(&key("a"), Ttl::minutes(1)).expires_at, NOW + 300);
        assert_eq!(signer.sign(&key("a"), Ttl::minutes(600)).expires_at, NOW + 3_600);
    }

    #[test]
    fn it_builds_the_signed_url() {
        let clock = ManualClock::new(NOW);
        let signed = signer(&clock).sign(&key("gallery/a.jpg"), Ttl::minutes(10));

        assert_eq!(
            signed.url.as_str(),
            format!(
                "https://media.example.com/media/gallery/a.jpg?token={}",
                signed.token
            )
        );
        assert_eq!(signed.resource, key("gallery/a.jpg"));
    }

    #[test]
    fn it_percent_encodes_path_segments() {
        let clock = ManualClock::new(NOW);
        let signed = signer(&clock).sign(&key("gallery/summer 2024/a#1.jpg"), Ttl::minutes(10));

        assert_eq!(
            signed.url.path(),
            "/media/gallery/summer%202024/a%231.jpg"
        );
    }

    #[test]
    fn it_tolerates_a_trailing_slash_on_the_base_url() {
        let signer = Signer::new(
            SigningSecret::new("top secret").unwrap(),
            Url::parse("https://media.example.com/media/").unwrap(),
        )
        .unwrap();
        let signed = signer.sign(&key("a.jpg"), Ttl::default());

        assert_eq!(signed.url.path(), "/media/a.jpg");
    }

    #[test]
    fn it_rejects_a_base_url_without_a_path() {
        let result = Signer::new(
            SigningSecret::new("top secret").unwrap(),
            Url::parse("mailto:media@example.com").unwrap(),
        );
        assert!(matches!(result, Err(CapabilityError::InvalidBaseUrl(_))));
    }

    #[test]
    fn it_signs_names_after_normalising_them() {
        let clock = ManualClock::new(NOW);
        let signer = signer(&clock);

        let signed = signer.sign_name("/gallery/a.jpg", None).unwrap();
        assert_eq!(signed.resource.as_str(), "gallery/a.jpg");
        assert_eq!(signed.expires_at, NOW + 3_600);

        assert!(matches!(
            signer.sign_name("../a.jpg", Some(10)),
            Err(CapabilityError::InvalidResource(_))
        ));
        assert!(matches!(
            signer.sign_name("./a.jpg", Some(10)),
            Err(CapabilityError::InvalidResource(_))
        ));
    }

    #[test]
    fn it_keeps_dotted_names_intact_in_the_url() {
        let clock = ManualClock::new(NOW);
        let signed = signer(&clock).sign(&key("gallery/.../.a.jpg"), Ttl::minutes(10));

        assert_eq!(signed.url.path(), "/media/gallery/.../.a.jpg");
    }

    #[test]
    fn it_hands_out_a_verifier_on_the_same_clock() {
        let clock = ManualClock::new(NOW);
        let signer = signer(&clock);
        let signed = signer.sign(&key("a.jpg"), Ttl::minutes(5));

        let verifier = signer.verifier();
        assert!(verifier.verify(signed.token.as_str(), &key("a.jpg")).is_ok());

        clock.advance(Duration::from_secs(301));
        assert_eq!(
            verifier.verify(signed.token.as_str(), &key("a.jpg")),
            Err(Rejection::Expired)
        );
    }

    #[test]
    fn it_serializes_for_api_responses() {
        let clock = ManualClock::new(NOW);
        let signed = signer(&clock).sign(&key("a.jpg"), Ttl::minutes(5));
        let json = serde_json::to_value(&signed).unwrap();

        assert_eq!(json["resource"], "a.jpg");
        assert_eq!(json["expiresAt"], NOW + 300);
        assert_eq!(json["token"], signed.token.as_str());
        assert_eq!(json["url"], signed.url.as_str());
    }
}
