use std::sync::Arc;

use folio_capability::Signer;
use folio_storage::ObjectStore;

use crate::{ResourceGate, TokenCache};

/// Everything the HTTP surface needs, shared across requests.
#[derive(Debug)]
pub struct MediaService {
    signer: Signer,
    cache: TokenCache,
    gate: ResourceGate,
    expose_rejection_reasons: bool,
}

impl MediaService {
    /// Wire a signer to a store. Verification shares the signer's secret and
    /// clock.
    pub fn new(signer: Signer, store: Arc<dyn ObjectStore>) -> Self {
        let gate = ResourceGate::new(signer.verifier(), store);
        let cache = TokenCache::for_signer(signer.clone());

        Self {
            signer,
            cache,
            gate,
            expose_rejection_reasons: false,
        }
    }

    /// Cap the cache lifetime of served media.
    pub fn with_max_cache_age(mut self, seconds: u64) -> Self {
        self.gate = self.gate.with_max_cache_age(seconds);
        self
    }

    /// Name the rejection reason in 401 bodies.
    pub fn with_exposed_rejection_reasons(mut self, expose: bool) -> Self {
        self.expose_rejection_reasons = expose;
        self
    }

    /// The signer behind the issuing endpoints.
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// The batch token cache.
    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// The gate behind the resource-proxy endpoint.
    pub fn gate(&self) -> &ResourceGate {
        &self.gate
    }

    /// Whether 401 bodies name the rejection reason.
    pub fn exposes_rejection_reasons(&self) -> bool {
        self.expose_rejection_reasons
    }

    /// Share the service with a router.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
