use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use folio_capability::ResourceKey;
use futures_util::TryStreamExt;
use tokio_util::io::ReaderStream;

use crate::{ObjectBody, ObjectMetadata, ObjectStore, StorageError, StoredObject, guess_content_type};

/// A file-system-based [ObjectStore]. Objects are the regular files below a
/// root directory, addressed by their relative path.
///
/// Symlinks are followed only while their target stays below the root.
#[derive(Debug, Clone)]
pub struct FileSystemObjectStore {
    root_dir: PathBuf,
}

impl FileSystemObjectStore {
    /// Creates a store serving the files below `root_dir`.
    ///
    /// # Errors
    ///
    /// Fails with [StorageError::Configuration] if `root_dir` is not an
    /// existing directory.
    pub async fn new<Pathlike>(root_dir: Pathlike) -> Result<Self, StorageError>
    where
        Pathlike: AsRef<Path>,
    {
        let root_dir = tokio::fs::canonicalize(root_dir.as_ref())
            .await
            .map_err(|error| {
                StorageError::Configuration(format!(
                    "{}: {error}",
                    root_dir.as_ref().display()
                ))
            })?;

        if !tokio::fs::metadata(&root_dir).await?.is_dir() {
            return Err(StorageError::Configuration(format!(
                "{} is not a directory",
                root_dir.display()
            )));
        }

        Ok(Self { root_dir })
    }

    /// The directory objects are served from.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn make_path(&self, key: &ResourceKey) -> Option<PathBuf> {
        let mut path = self.root_dir.clone();
        for segment in key.segments() {
            // Keys are already free of `..`; absolute or drive-prefixed
            // segments would still replace the root when pushed.
            let segment = Path::new(segment);
            if segment.has_root() || segment.is_absolute() {
                return None;
            }
            path.push(segment);
        }
        path.starts_with(&self.root_dir).then_some(path)
    }
}

#[async_trait]
impl ObjectStore for FileSystemObjectStore {
    async fn get(&self, key: &ResourceKey) -> Result<Option<StoredObject>, StorageError> {
        let Some(path) = self.make_path(key) else {
            return Ok(None);
        };

        let path = match tokio::fs::canonicalize(&path).await {
            Ok(resolved) => resolved,
            Err(error) if is_absent(&error) => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        if !path.starts_with(&self.root_dir) {
            tracing::warn!(resource = %key, "Refused object resolving outside the media root");
            return Ok(None);
        }

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(error) if is_absent(&error) => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Ok(None);
        }

        let modified = metadata
            .modified()
            .ok()
            .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
            .map(|since| since.as_nanos())
            .unwrap_or_default();

        tracing::trace!(path = %path.display(), "Opened object file");

        Ok(Some(StoredObject {
            metadata: ObjectMetadata {
                content_type: guess_content_type(key).to_owned(),
                etag: format!("{modified:x}-{:x}", metadata.len()),
                content_length: Some(metadata.len()),
            },
            body: ObjectBody::from_stream(ReaderStream::new(file).map_err(StorageError::from)),
        }))
    }
}

fn is_absent(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::NotFound | ErrorKind::NotADirectory | ErrorKind::IsADirectory
    )
}
