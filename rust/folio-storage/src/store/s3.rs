//! An [ObjectStore] over S3-compatible buckets (AWS S3, Cloudflare R2,
//! MinIO), reading objects through SigV4 presigned GET requests.

use std::fmt::Write;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folio_capability::ResourceKey;
use futures_util::TryStreamExt;
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use sha2::{Digest, Sha256};
use url::{Host, Url};

use crate::{ObjectBody, ObjectMetadata, ObjectStore, StorageError, StoredObject, guess_content_type};

/// Lifetime of the presigned URLs the store issues to itself, in seconds.
const PRESIGN_EXPIRES: u64 = 300;

/// Location of an S3-compatible bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Address {
    /// Endpoint URL, e.g. `https://<account>.r2.cloudflarestorage.com`.
    pub endpoint: String,
    /// Signing region; `auto` for R2.
    pub region: String,
    /// Bucket name.
    pub bucket: String,
}

impl S3Address {
    /// Bundle an endpoint, region and bucket.
    pub fn new(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: region.into(),
            bucket: bucket.into(),
        }
    }
}

/// Access keys plus the address they are valid for.
#[derive(Clone)]
pub struct S3Credentials {
    address: S3Address,
    endpoint: Url,
    access_key_id: String,
    secret_access_key: String,
    path_style: bool,
}

impl S3Credentials {
    /// Create credentials for `address`.
    ///
    /// Path-style URLs (`endpoint/bucket/key`) are used for IP addresses and
    /// `localhost`; virtual-hosted URLs (`bucket.endpoint/key`) otherwise.
    pub fn new(
        address: S3Address,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let endpoint = Url::parse(&address.endpoint)
            .map_err(|error| StorageError::Configuration(format!("S3 endpoint: {error}")))?;
        if endpoint.host_str().is_none() {
            return Err(StorageError::Configuration(
                "S3 endpoint has no host".into(),
            ));
        }
        let path_style = match endpoint.host() {
            Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
            Some(Host::Domain(domain)) => domain == "localhost",
            None => false,
        };

        Ok(Self {
            address,
            endpoint,
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            path_style,
        })
    }

    /// Force path-style (`true`) or virtual-hosted (`false`) URLs.
    pub fn with_path_style(mut self, path_style: bool) -> Self {
        self.path_style = path_style;
        self
    }

    /// The bucket address.
    pub fn address(&self) -> &S3Address {
        &self.address
    }

    /// Presign a GET for `key`, valid for `expires` seconds from `time`.
    pub fn presign_get(
        &self,
        key: &ResourceKey,
        time: DateTime<Utc>,
        expires: u64,
    ) -> Result<Url, StorageError> {
        let timestamp = time.format("%Y%m%dT%H%M%SZ").to_string();
        let date = &timestamp[..8];
        let scope = format!("{date}/{}/s3/aws4_request", self.address.region);

        let mut url = self.endpoint.clone();
        let mut canonical_uri = String::new();
        if self.path_style {
            write!(canonical_uri, "/{}", uri_encode(&self.address.bucket)).ok();
        } else {
            let host = self.endpoint.host_str().unwrap_or_default();
            url.set_host(Some(&format!("{}.{host}", self.address.bucket)))
                .map_err(|error| StorageError::Configuration(format!("S3 host: {error}")))?;
        }
        for segment in key.segments() {
            write!(canonical_uri, "/{}", uri_encode(segment)).ok();
        }
        url.set_path(&canonical_uri);

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_owned(),
            (None, _) => return Err(StorageError::Configuration("S3 URL has no host".into())),
        };

        let mut query = [
            ("X-Amz-Algorithm", "AWS4-HMAC-SHA256".to_owned()),
            (
                "X-Amz-Credential",
                format!("{}/{scope}", self.access_key_id),
            ),
            ("X-Amz-Date", timestamp.clone()),
            ("X-Amz-Expires", expires.to_string()),
            ("X-Amz-SignedHeaders", "host".to_owned()),
        ];
        query.sort_by(|a, b| a.0.cmp(b.0));
        let canonical_query = query
            .iter()
            .map(|(name, value)| format!("{}={}", uri_encode(name), uri_encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "GET\n{canonical_uri}\n{canonical_query}\nhost:{host}\n\nhost\nUNSIGNED-PAYLOAD"
        );
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{timestamp}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signing_key = [
            date,
            self.address.region.as_str(),
            "s3",
            "aws4_request",
        ]
        .iter()
        .fold(
            format!("AWS4{}", self.secret_access_key).into_bytes(),
            |key, part| hmac_sha256(&key, part.as_bytes()),
        );
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        url.set_query(Some(&format!(
            "{canonical_query}&X-Amz-Signature={signature}"
        )));
        Ok(url)
    }
}

impl std::fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Credentials")
            .field("address", &self.address)
            .field("access_key_id", &self.access_key_id)
            .field("path_style", &self.path_style)
            .finish_non_exhaustive()
    }
}

/// Reads objects from an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: reqwest::Client,
    credentials: S3Credentials,
}

impl S3ObjectStore {
    /// Create a store with a fresh HTTP client.
    pub fn new(credentials: S3Credentials) -> Self {
        Self::with_client(reqwest::Client::new(), credentials)
    }

    /// Create a store sharing an existing HTTP client.
    pub fn with_client(client: reqwest::Client, credentials: S3Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, key: &ResourceKey) -> Result<Option<StoredObject>, StorageError> {
        let url = self
            .credentials
            .presign_get(key, Utc::now(), PRESIGN_EXPIRES)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| StorageError::Unavailable(format!("S3 request failed: {error}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => {
                return Err(StorageError::Unavailable(format!(
                    "S3 responded with {status} for {key}"
                )));
            }
            _ => {}
        }

        let headers = response.headers();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| guess_content_type(key).to_owned());
        let etag = headers
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim_start_matches("W/").trim_matches('"').to_owned())
            .unwrap_or_default();
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok());

        tracing::trace!(%key, %content_type, "Fetched object from S3");

        let body = response
            .bytes_stream()
            .map_err(|error| StorageError::Unavailable(format!("S3 body: {error}")));

        Ok(Some(StoredObject {
            metadata: ObjectMetadata {
                content_type,
                etag,
                content_length,
            },
            body: ObjectBody::from_stream(body),
        }))
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key).expect("HMAC-SHA256 accepts keys of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Percent-encode everything except RFC 3986 unreserved characters.
fn uri_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => {
                write!(encoded, "%{byte:02X}").ok();
            }
        }
    }
    encoded
}
