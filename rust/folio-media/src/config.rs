//! Startup configuration, read from flags or the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, ValueEnum};
use folio_capability::{CapabilityError, Signer, SigningSecret};
use folio_storage::{FileSystemObjectStore, MemoryObjectStore, ObjectStore, StorageError};
use thiserror::Error;
use url::Url;

use crate::{DEFAULT_MAX_CACHE_AGE, MediaService};

/// Reasons the service refuses to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The signing secret is absent or the base URL is unusable.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// The public base URL does not parse.
    #[error("invalid public base URL: {0}")]
    BaseUrl(#[from] url::ParseError),

    /// A setting the S3 store needs was not given.
    #[error("incomplete S3 settings: {0} is required")]
    MissingS3Setting(&'static str),

    /// The S3 store was requested from a build without it.
    #[error("this build does not include S3 support")]
    S3Unsupported,

    /// The object store could not be set up.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Where protected media is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// An empty in-process store, for demos.
    Memory,
    /// Files below `--store-root`.
    Fs,
    /// An S3-compatible bucket such as R2.
    S3,
}

/// Connection settings for the S3 store.
#[derive(Clone, Args)]
pub struct S3Settings {
    /// Bucket endpoint, e.g. `https://<account>.r2.cloudflarestorage.com`
    #[arg(long = "s3-endpoint", env = "FOLIO_S3_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Signing region
    #[arg(long = "s3-region", env = "FOLIO_S3_REGION", default_value = "auto")]
    pub region: String,

    /// Bucket name
    #[arg(long = "s3-bucket", env = "FOLIO_S3_BUCKET")]
    pub bucket: Option<String>,

    /// Access key id
    #[arg(long = "s3-access-key-id", env = "FOLIO_S3_ACCESS_KEY_ID")]
    pub access_key_id: Option<String>,

    /// Secret access key
    #[arg(
        long = "s3-secret-access-key",
        env = "FOLIO_S3_SECRET_ACCESS_KEY",
        hide_env_values = true
    )]
    pub secret_access_key: Option<String>,
}

/// Configuration of the `folio-media` server.
///
/// Not `Debug`, as it holds the signing secret.
#[derive(Clone, Parser)]
#[command(name = "folio-media")]
#[command(bin_name = "folio-media")]
#[command(about = "Serves protected media behind signed, expiring links", long_about = None)]
pub struct MediaConfig {
    /// HMAC key for media tokens
    #[arg(long, env = "FOLIO_SIGNING_SECRET", hide_env_values = true)]
    pub signing_secret: Option<String>,

    /// URL that signed links are rooted at
    #[arg(
        long,
        env = "FOLIO_PUBLIC_BASE_URL",
        default_value = "http://127.0.0.1:8787/media"
    )]
    pub public_base_url: String,

    /// Address to listen on
    #[arg(long, env = "FOLIO_LISTEN", default_value = "127.0.0.1:8787")]
    pub listen: SocketAddr,

    /// Upper bound for `Cache-Control: max-age` on served media, in seconds
    #[arg(long, env = "FOLIO_MAX_CACHE_AGE", default_value_t = DEFAULT_MAX_CACHE_AGE)]
    pub max_cache_age: u64,

    /// Name the rejection reason in 401 responses
    #[arg(long, env = "FOLIO_EXPOSE_REJECTION_REASONS")]
    pub expose_rejection_reasons: bool,

    /// Object store backend
    #[arg(long, env = "FOLIO_STORE", value_enum, default_value_t = StoreKind::Fs)]
    pub store: StoreKind,

    /// Media directory for the `fs` store
    #[arg(long, env = "FOLIO_STORE_ROOT", default_value = "./media")]
    pub store_root: PathBuf,

    #[command(flatten)]
    pub s3: S3Settings,
}

impl MediaConfig {
    /// The signer described by the secret and base URL.
    pub fn signer(&self) -> Result<Signer, ConfigError> {
        let secret = SigningSecret::from_option(self.signing_secret.as_deref())?;
        let base_url = Url::parse(&self.public_base_url)?;
        Ok(Signer::new(secret, base_url)?)
    }

    /// Open the configured object store.
    pub async fn object_store(&self) -> Result<Arc<dyn ObjectStore>, ConfigError> {
        Ok(match self.store {
            StoreKind::Memory => Arc::new(MemoryObjectStore::new()),
            StoreKind::Fs => Arc::new(FileSystemObjectStore::new(&self.store_root).await?),
            StoreKind::S3 => self.s3_store()?,
        })
    }

    #[cfg(feature = "s3")]
    fn s3_store(&self) -> Result<Arc<dyn ObjectStore>, ConfigError> {
        use folio_storage::{S3Address, S3Credentials, S3ObjectStore};

        let settings = &self.s3;
        let endpoint = settings
            .endpoint
            .clone()
            .ok_or(ConfigError::MissingS3Setting("FOLIO_S3_ENDPOINT"))?;
        let bucket = settings
            .bucket
            .clone()
            .ok_or(ConfigError::MissingS3Setting("FOLIO_S3_BUCKET"))?;
        let access_key_id = settings
            .access_key_id
            .clone()
            .ok_or(ConfigError::MissingS3Setting("FOLIO_S3_ACCESS_KEY_ID"))?;
        let secret_access_key = settings
            .secret_access_key
            .clone()
            .ok_or(ConfigError::MissingS3Setting("FOLIO_S3_SECRET_ACCESS_KEY"))?;

        let credentials = S3Credentials::new(
            S3Address::new(endpoint, settings.region.clone(), bucket),
            access_key_id,
            secret_access_key,
        )?;
        Ok(Arc::new(S3ObjectStore::new(credentials)))
    }

    #[cfg(not(feature = "s3"))]
    fn s3_store(&self) -> Result<Arc<dyn ObjectStore>, ConfigError> {
        Err(ConfigError::S3Unsupported)
    }

    /// Assemble the service. Fails before anything is served if the secret
    /// is missing or the store cannot be opened.
    pub async fn build(&self) -> Result<MediaService, ConfigError> {
        let signer = self.signer()?;
        let store = self.object_store().await?;

        tracing::info!(
            base_url = %signer.base_url(),
            store = ?self.store,
            max_cache_age = self.max_cache_age,
            expose_rejection_reasons = self.expose_rejection_reasons,
            "Configured media service"
        );

        Ok(MediaService::new(signer, store)
            .with_max_cache_age(self.max_cache_age)
            .with_exposed_rejection_reasons(self.expose_rejection_reasons))
    }
}
