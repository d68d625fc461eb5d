use thiserror::Error;

use crate::ResourceKeyError;

/// Errors raised while configuring or using a [`Signer`](crate::Signer).
///
/// None of these are per-request authorization failures; those are reported
/// as a [`Rejection`](crate::Rejection).
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// No signing secret was configured, so no link can ever be signed.
    #[error("the media signing secret is not configured")]
    MissingSecret,

    /// The public base URL cannot have resource paths appended to it.
    #[error("invalid public base URL: {0}")]
    InvalidBaseUrl(String),

    /// The resource name does not address an object.
    #[error("invalid resource name: {0}")]
    InvalidResource(#[from] ResourceKeyError),
}
