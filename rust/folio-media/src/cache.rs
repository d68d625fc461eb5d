//! Request-coalescing cache of signed URLs.
//!
//! Entries are keyed by the minute in which the requested tokens would
//! expire, not by resource, so every request whose target expiry lands in the
//! same minute shares one entry and one round of signing work.
//!
//! Buckets are additive: a name requested for the first time in a minute
//! whose entry already exists is signed on its own and merged into that
//! entry. Names already present are never signed again while the entry lives.
//! Each bucket holds at most [DEFAULT_BUCKET_CAPACITY] names (configurable);
//! names arriving once it is full are signed and returned but not remembered.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use folio_capability::{Clock, Issue, ResourceKey, ResourceKeyError, Signer, Ttl};
use parking_lot::RwLock;
use url::Url;

/// Granularity of cache buckets, in seconds.
pub const BUCKET_SECONDS: u64 = 60;

/// Most names a single bucket remembers.
pub const DEFAULT_BUCKET_CAPACITY: usize = 4096;

#[derive(Debug)]
struct CacheEntry {
    /// Target expiry of the call that created the entry.
    expires_at: u64,
    urls: HashMap<ResourceKey, Url>,
}

impl CacheEntry {
    fn new(expires_at: u64) -> Self {
        Self {
            expires_at,
            urls: HashMap::new(),
        }
    }

    fn is_live(&self, now: u64) -> bool {
        self.expires_at > now
    }
}

/// Memoises batches of signed URLs per expiry minute.
///
/// Concurrent misses for the same bucket may both sign; their results are
/// merged and any of them is a valid URL, so the cost is duplicated work only.
#[derive(Debug)]
pub struct TokenCache<I = Signer> {
    issuer: I,
    clock: Arc<dyn Clock>,
    bucket_capacity: usize,
    entries: RwLock<HashMap<u64, CacheEntry>>,
}

impl TokenCache<Signer> {
    /// A cache in front of `signer`, reading the signer's clock.
    pub fn for_signer(signer: Signer) -> Self {
        let clock = signer.clock().clone();
        Self::new(signer, clock)
    }
}

impl<I: Issue> TokenCache<I> {
    /// A cache in front of any issuer.
    pub fn new(issuer: I, clock: Arc<dyn Clock>) -> Self {
        Self {
            issuer,
            clock,
            bucket_capacity: DEFAULT_BUCKET_CAPACITY,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Limit how many names one bucket remembers.
    pub fn with_bucket_capacity(mut self, capacity: usize) -> Self {
        self.bucket_capacity = capacity;
        self
    }

    /// The issuer behind the cache.
    pub fn issuer(&self) -> &I {
        &self.issuer
    }

    /// Signed URLs for every name in `names`, valid for about `ttl`.
    ///
    /// Names are normalised first; any invalid name fails the whole batch
    /// before anything is signed. The result holds exactly the requested
    /// names (deduplicated). URLs stay valid for at least `ttl` minus the
    /// bucket width.
    pub fn get_tokens<S: AsRef<str>>(
        &self,
        names: &[S],
        ttl: Ttl,
    ) -> Result<BTreeMap<ResourceKey, Url>, ResourceKeyError> {
        let keys = names
            .iter()
            .map(|name| ResourceKey::parse(name.as_ref()))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let now = self.clock.now();
        let target_expiry = now.saturating_add(ttl.as_secs());
        let bucket = target_expiry / BUCKET_SECONDS;

        let mut urls = BTreeMap::new();
        let mut missing = Vec::new();
        let hit = {
            let entries = self.entries.read();
            match entries.get(&bucket) {
                Some(entry) if entry.is_live(now) => {
                    for key in &keys {
                        match entry.urls.get(key) {
                            Some(url) => {
                                urls.insert(key.clone(), url.clone());
                            }
                            None => missing.push(key.clone()),
                        }
                    }
                    true
                }
                _ => false,
            }
        };

        if hit && missing.is_empty() {
            tracing::debug!(bucket, names = keys.len(), "Token cache hit");
            return Ok(urls);
        }
        if !hit {
            missing = keys.into_iter().collect();
        }

        tracing::debug!(bucket, signing = missing.len(), hit, "Signing media tokens");
        let signed = missing
            .into_iter()
            .map(|key| {
                let url = self.issuer.issue(&key, ttl).url;
                (key, url)
            })
            .collect::<Vec<_>>();

        let mut entries = self.entries.write();
        if !hit {
            entries.retain(|_, entry| entry.is_live(now));
        }

        let entry = entries
            .entry(bucket)
            .or_insert_with(|| CacheEntry::new(target_expiry));
        if !entry.is_live(now) {
            *entry = CacheEntry::new(target_expiry);
        }

        let mut overflow = 0usize;
        for (key, url) in signed {
            if entry.urls.len() < self.bucket_capacity || entry.urls.contains_key(&key) {
                entry.urls.insert(key.clone(), url.clone());
            } else {
                overflow += 1;
            }
            urls.insert(key, url);
        }
        if overflow > 0 {
            tracing::warn!(bucket, overflow, "Token cache bucket is full");
        }

        Ok(urls)
    }

    /// Drop every entry whose expiry has passed, returning how many went.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of buckets currently held.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no buckets are held.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
