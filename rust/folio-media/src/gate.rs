//! The boundary that turns a (token, resource name) pair into a media object.

use std::sync::Arc;

use folio_capability::{Grant, ResourceKey, Verifier};
use folio_storage::{ObjectStore, StoredObject};

use crate::MediaError;

/// Upper bound on how long clients may cache served media, in seconds.
pub const DEFAULT_MAX_CACHE_AGE: u64 = 300;

/// Authorizes requests for protected media and fetches the objects.
#[derive(Debug, Clone)]
pub struct ResourceGate {
    verifier: Verifier,
    store: Arc<dyn ObjectStore>,
    max_cache_age: u64,
}

impl ResourceGate {
    /// A gate checking tokens with `verifier` and reading from `store`.
    pub fn new(verifier: Verifier, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            verifier,
            store,
            max_cache_age: DEFAULT_MAX_CACHE_AGE,
        }
    }

    /// Cap the `max-age` of served responses at `seconds`.
    pub fn with_max_cache_age(mut self, seconds: u64) -> Self {
        self.max_cache_age = seconds;
        self
    }

    /// The configured cache lifetime cap.
    pub fn max_cache_age(&self) -> u64 {
        self.max_cache_age
    }

    /// Authorize `token` for `name` and fetch the object.
    ///
    /// The name is normalised before the token is looked at, so a traversal
    /// attempt never reaches verification or the store.
    pub async fn open(
        &self,
        token: Option<&str>,
        name: Option<&str>,
    ) -> Result<GrantedObject, MediaError> {
        let token = token
            .filter(|token| !token.is_empty())
            .ok_or(MediaError::MissingParameter("token"))?;
        let name = name
            .filter(|name| !name.is_empty())
            .ok_or(MediaError::MissingParameter("resourceName"))?;

        let key = ResourceKey::parse(name).inspect_err(|error| {
            tracing::warn!(resource = name, %error, "Rejected media resource name");
        })?;

        let grant = self.verifier.verify(token, &key).inspect_err(|rejection| {
            tracing::warn!(resource = %key, reason = rejection.code(), "Rejected media token");
        })?;

        let object = match self.store.get(&key).await {
            Ok(Some(object)) => object,
            Ok(None) => {
                tracing::debug!(resource = %key, "Authorized media not found");
                return Err(MediaError::NotFound(key));
            }
            Err(error) => {
                tracing::error!(resource = %key, %error, "Object store read failed");
                return Err(error.into());
            }
        };

        let max_age = self.max_cache_age.min(grant.remaining_seconds);
        tracing::debug!(
            resource = %key,
            remaining = grant.remaining_seconds,
            max_age,
            "Granted media access"
        );

        Ok(GrantedObject {
            key,
            object,
            grant,
            max_age,
        })
    }
}

/// An authorized object ready to be served.
#[derive(Debug)]
pub struct GrantedObject {
    /// The normalised resource key.
    pub key: ResourceKey,
    /// The object read from the store.
    pub object: StoredObject,
    /// The verification result.
    pub grant: Grant,
    /// Seconds clients may cache the response.
    pub max_age: u64,
}

impl GrantedObject {
    /// The `Cache-Control` header value for this response.
    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.max_age)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use folio_capability::{ManualClock, Rejection, Signer, SigningSecret, Ttl};
    use folio_storage::MemoryObjectStore;
    use testresult::TestResult;
    use url::Url;

    use super::*;

    struct Fixture {
        clock: ManualClock,
        signer: Signer,
        store: MemoryObjectStore,
        gate: ResourceGate,
    }

    async fn fixture() -> Fixture {
        let clock = ManualClock::new(1_700_000_000);
        let signer = Signer::with_clock(
            SigningSecret::new("gate secret").unwrap(),
            Url::parse("https://media.example.com/media").unwrap(),
            Arc::new(clock.clone()),
        )
        .unwrap();
        let store = MemoryObjectStore::new();
        store
            .put(ResourceKey::parse("gallery/a.jpg").unwrap(), b"jpeg".to_vec(), None)
            .await;
        let gate = ResourceGate::new(signer.verifier(), Arc::new(store.clone()));

        Fixture {
            clock,
            signer,
            store,
            gate,
        }
    }

    fn token(signer: &Signer, name: &str, minutes: u64) -> String {
        signer
            .sign(&ResourceKey::parse(name).unwrap(), Ttl::minutes(minutes))
            .token
            .to_string()
    }

    #[tokio::test]
    async fn it_opens_an_authorized_object() -> TestResult {
        let Fixture { signer, gate, .. } = fixture().await;
        let token = token(&signer, "gallery/a.jpg", 60);

        let granted = gate.open(Some(&token), Some("/gallery/a.jpg")).await?;

        assert_eq!(granted.key.as_str(), "gallery/a.jpg");
        assert_eq!(granted.object.metadata.content_type, "image/jpeg");
        assert_eq!(granted.cache_control(), "public, max-age=300");
        assert_eq!(granted.object.body.collect().await?.as_ref(), b"jpeg");
        Ok(())
    }

    #[tokio::test]
    async fn it_caps_cache_lifetime_at_remaining_validity() -> TestResult {
        let Fixture {
            clock,
            signer,
            gate,
            ..
        } = fixture().await;
        let token = token(&signer, "gallery/a.jpg", 5);

        clock.advance(Duration::from_secs(4 * 60));
        let granted = gate.open(Some(&token), Some("gallery/a.jpg")).await?;

        assert_eq!(granted.max_age, 60);
        assert_eq!(granted.grant.remaining_seconds, 60);
        Ok(())
    }

    #[tokio::test]
    async fn it_honours_a_lower_configured_cap() -> TestResult {
        let Fixture { signer, gate, .. } = fixture().await;
        let gate = gate.with_max_cache_age(30);
        let token = token(&signer, "gallery/a.jpg", 60);

        let granted = gate.open(Some(&token), Some("gallery/a.jpg")).await?;
        assert_eq!(granted.max_age, 30);
        Ok(())
    }

    #[tokio::test]
    async fn it_requires_both_parameters() {
        let Fixture { signer, gate, .. } = fixture().await;
        let token = token(&signer, "gallery/a.jpg", 60);

        assert!(matches!(
            gate.open(None, Some("gallery/a.jpg")).await,
            Err(MediaError::MissingParameter("token"))
        ));
        assert!(matches!(
            gate.open(Some(""), Some("gallery/a.jpg")).await,
            Err(MediaError::MissingParameter("token"))
        ));
        assert!(matches!(
            gate.open(Some(&token), None).await,
            Err(MediaError::MissingParameter("resourceName"))
        ));
    }

    #[tokio::test]
    async fn it_rejects_traversal_before_verification() {
        let Fixture { gate, .. } = fixture().await;

        assert!(matches!(
            gate.open(Some("garbage"), Some("../secrets.txt")).await,
            Err(MediaError::InvalidResource(_))
        ));
        assert!(matches!(
            gate.open(Some("garbage"), Some("///")).await,
            Err(MediaError::InvalidResource(_))
        ));
    }

    #[tokio::test]
    async fn it_rejects_a_token_for_another_resource() {
        let Fixture { signer, gate, .. } = fixture().await;
        let token = token(&signer, "gallery/b.jpg", 60);

        assert!(matches!(
            gate.open(Some(&token), Some("gallery/a.jpg")).await,
            Err(MediaError::Unauthorized(Rejection::SignatureMismatch))
        ));
    }

    #[tokio::test]
    async fn it_rejects_an_expired_token() {
        let Fixture {
            clock,
            signer,
            gate,
            ..
        } = fixture().await;
        let token = token(&signer, "gallery/a.jpg", 5);

        clock.advance(Duration::from_secs(6 * 60));
        assert!(matches!(
            gate.open(Some(&token), Some("gallery/a.jpg")).await,
            Err(MediaError::Unauthorized(Rejection::Expired))
        ));
    }

    #[tokio::test]
    async fn it_reports_missing_objects() {
        let Fixture {
            signer,
            store,
            gate,
            ..
        } = fixture().await;
        let key = ResourceKey::parse("gallery/a.jpg").unwrap();
        store.remove(&key).await;
        let token = token(&signer, "gallery/a.jpg", 60);

        assert!(matches!(
            gate.open(Some(&token), Some("gallery/a.jpg")).await,
            Err(MediaError::NotFound(missing)) if missing == key
        ));
    }
}
