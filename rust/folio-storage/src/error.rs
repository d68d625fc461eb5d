use thiserror::Error;

/// Failures of an object store itself, as opposed to an absent object.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be reached or failed while serving a read.
    #[error("object store unavailable: {0}")]
    Unavailable(String),

    /// The store was constructed with settings it cannot work with.
    #[error("object store misconfigured: {0}")]
    Configuration(String),
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        StorageError::Unavailable(error.to_string())
    }
}
