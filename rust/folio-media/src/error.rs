use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use folio_capability::{Rejection, ResourceKey, ResourceKeyError};
use folio_storage::StorageError;
use serde_json::{Value, json};
use thiserror::Error;

/// Failures surfaced by the media endpoints.
#[derive(Debug, Error)]
pub enum MediaError {
    /// A required query or body parameter was absent or empty.
    #[error("missing parameter `{0}`")]
    MissingParameter(&'static str),

    /// The request could not be understood.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The resource name failed normalisation.
    #[error("invalid resource name: {0}")]
    InvalidResource(#[from] ResourceKeyError),

    /// The presented token does not authorize the resource.
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] Rejection),

    /// The resource is authorized but does not exist.
    #[error("no media stored under {0}")]
    NotFound(ResourceKey),

    /// The object store could not be read.
    #[error(transparent)]
    StoreUnavailable(#[from] StorageError),
}

impl MediaError {
    /// The HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) | Self::BadRequest(_) | Self::InvalidResource(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render the error, naming the rejection reason of a 401 only when
    /// `expose_reasons` is set.
    pub fn into_response_with(self, expose_reasons: bool) -> Response {
        let status = self.status();
        let body: Value = match &self {
            Self::MissingParameter(_) | Self::BadRequest(_) | Self::InvalidResource(_) => json!({
                "error": "bad_request",
                "message": self.to_string(),
            }),
            Self::Unauthorized(rejection) if expose_reasons => json!({
                "error": "unauthorized",
                "reason": rejection.code(),
            }),
            Self::Unauthorized(_) => json!({ "error": "unauthorized" }),
            Self::NotFound(_) => json!({ "error": "not_found" }),
            Self::StoreUnavailable(_) => json!({ "error": "internal" }),
        };

        (status, Json(body)).into_response()
    }
}

impl IntoResponse for MediaError {
    fn into_response(self) -> Response {
        self.into_response_with(false)
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use testresult::TestResult;

    use super::*;

    async fn body_of(response: Response) -> TestResult<Value> {
        let bytes = response.into_body().collect().await?.to_bytes();
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[test]
    fn it_maps_errors_to_statuses() {
        assert_eq!(
            MediaError::MissingParameter("token").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            MediaError::InvalidResource(ResourceKeyError::Traversal).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            MediaError::Unauthorized(Rejection::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            MediaError::NotFound(ResourceKey::parse("a").unwrap()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            MediaError::StoreUnavailable(StorageError::Unavailable("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn it_hides_rejection_reasons_by_default() -> TestResult {
        let response = MediaError::Unauthorized(Rejection::SignatureMismatch).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_of(response).await?, json!({ "error": "unauthorized" }));
        Ok(())
    }

    #[tokio::test]
    async fn it_names_rejection_reasons_when_asked() -> TestResult {
        let response = MediaError::Unauthorized(Rejection::Expired).into_response_with(true);
        assert_eq!(
            body_of(response).await?,
            json!({ "error": "unauthorized", "reason": "expired" })
        );
        Ok(())
    }

    #[tokio::test]
    async fn it_keeps_store_details_out_of_the_body() -> TestResult {
        let response =
            MediaError::StoreUnavailable(StorageError::Unavailable("10.0.0.7 refused".into()))
                .into_response_with(true);
        assert_eq!(body_of(response).await?, json!({ "error": "internal" }));
        Ok(())
    }
}
