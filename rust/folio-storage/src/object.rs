//! Objects as returned by a store: a byte stream plus the metadata needed to
//! serve it over HTTP.

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt, TryStreamExt};

use folio_capability::ResourceKey;

use crate::StorageError;

/// Content type used when nothing better is known.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Descriptive metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// MIME type of the body.
    pub content_type: String,
    /// Entity tag, without surrounding quotes.
    pub etag: String,
    /// Size of the body in bytes, when the store knows it up front.
    pub content_length: Option<u64>,
}

impl ObjectMetadata {
    /// The entity tag as a quoted `ETag` header value.
    pub fn etag_header(&self) -> String {
        format!("\"{}\"", self.etag)
    }

    /// Whether an `If-None-Match` header value matches this object.
    ///
    /// Handles lists, weak validators and `*`.
    pub fn matches_if_none_match(&self, header: &str) -> bool {
        header.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || candidate.trim_start_matches("W/").trim_matches('"') == self.etag
        })
    }
}

/// The body of a stored object, read lazily.
pub struct ObjectBody(BoxStream<'static, Result<Bytes, StorageError>>);

impl ObjectBody {
    /// A body backed by any stream of byte chunks.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, StorageError>> + Send + 'static,
    {
        Self(stream.boxed())
    }

    /// A body that is already in memory.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes: Bytes = bytes.into();
        Self::from_stream(stream::once(std::future::ready(Ok(bytes))))
    }

    /// The chunk stream, for handing to an HTTP body.
    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes, StorageError>> {
        self.0
    }

    /// Read the whole body into memory.
    pub async fn collect(self) -> Result<Bytes, StorageError> {
        let buffer = self
            .0
            .try_fold(BytesMut::new(), |mut buffer, chunk| async move {
                buffer.extend_from_slice(&chunk);
                Ok(buffer)
            })
            .await?;
        Ok(buffer.freeze())
    }
}

impl std::fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ObjectBody(..)")
    }
}

/// An object read from a store.
#[derive(Debug)]
pub struct StoredObject {
    /// What the body is.
    pub metadata: ObjectMetadata,
    /// The body itself.
    pub body: ObjectBody,
}

/// Guess a MIME type from a resource name's extension.
///
/// Covers the media a portfolio serves; anything else is
/// [`DEFAULT_CONTENT_TYPE`].
pub fn guess_content_type(key: &ResourceKey) -> &'static str {
    let Some(extension) = key.extension() else {
        return DEFAULT_CONTENT_TYPE;
    };

    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
