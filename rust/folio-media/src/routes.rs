//! The HTTP surface: the resource proxy, the issuing endpoints and a health
//! probe.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use folio_capability::{CapabilityToken, ResourceKey, Ttl};
use folio_storage::DEFAULT_CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use url::Url;

use crate::{GrantedObject, MediaError, MediaService};

/// Most names accepted by one batch issuing request.
pub const MAX_BATCH_SIZE: usize = 256;

/// Build the application router around a shared service.
pub fn router(service: Arc<MediaService>) -> Router {
    Router::new()
        .route("/media", get(serve_by_query))
        .route("/media/{*resource}", get(serve_by_path))
        .route("/api/media/token", post(issue_token))
        .route("/api/media/tokens", post(issue_tokens))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
struct MediaQuery {
    token: Option<String>,
    #[serde(rename = "resourceName")]
    resource_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest {
    resource_name: String,
    ttl_minutes: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    resource_name: ResourceKey,
    token: CapabilityToken,
    url: Url,
    expires_at: u64,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokensRequest {
    resource_names: Vec<String>,
    ttl_minutes: Option<u64>,
}

#[derive(Debug, Serialize)]
struct TokensResponse {
    urls: BTreeMap<String, Url>,
}

async fn serve_by_query(
    State(service): State<Arc<MediaService>>,
    headers: HeaderMap,
    query: Result<Query<MediaQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            return MediaError::BadRequest(rejection.body_text()).into_response();
        }
    };

    serve(
        &service,
        &headers,
        query.token.as_deref(),
        query.resource_name.as_deref(),
    )
    .await
}

async fn serve_by_path(
    State(service): State<Arc<MediaService>>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    query: Result<Query<MediaQuery>, QueryRejection>,
) -> Response {
    let token = match query {
        Ok(Query(query)) => query.token,
        Err(rejection) => {
            return MediaError::BadRequest(rejection.body_text()).into_response();
        }
    };

    serve(&service, &headers, token.as_deref(), Some(&resource)).await
}

async fn serve(
    service: &MediaService,
    headers: &HeaderMap,
    token: Option<&str>,
    name: Option<&str>,
) -> Response {
    match service.gate().open(token, name).await {
        Ok(granted) => object_response(granted, headers),
        Err(error) => error.into_response_with(service.exposes_rejection_reasons()),
    }
}

fn object_response(granted: GrantedObject, request_headers: &HeaderMap) -> Response {
    let cache_control = granted.cache_control();
    let GrantedObject { key, object, .. } = granted;
    let metadata = object.metadata;

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&cache_control) {
        headers.insert(CACHE_CONTROL, value);
    }
    let etag = if metadata.etag.is_empty() {
        None
    } else {
        HeaderValue::from_str(&metadata.etag_header()).ok()
    };
    if let Some(etag) = &etag {
        headers.insert(ETAG, etag.clone());
    }

    let revalidated = etag.is_some()
        && request_headers
            .get(IF_NONE_MATCH)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| metadata.matches_if_none_match(value));
    if revalidated {
        tracing::debug!(resource = %key, "Media not modified");
        return (StatusCode::NOT_MODIFIED, headers).into_response();
    }

    let content_type = HeaderValue::from_str(&metadata.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    headers.insert(CONTENT_TYPE, content_type);
    if let Some(length) = metadata.content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }

    let body = Body::from_stream(object.body.into_stream());
    (StatusCode::OK, headers, body).into_response()
}

async fn issue_token(
    State(service): State<Arc<MediaService>>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, MediaError> {
    let Json(request) = payload.map_err(|rejection| MediaError::BadRequest(rejection.body_text()))?;

    let key = ResourceKey::parse(&request.resource_name)?;
    let signer = service.signer();
    let signed = signer.sign(&key, Ttl::or_default(request.ttl_minutes));
    let expires_in = signed.expires_at.saturating_sub(signer.clock().now());
    tracing::debug!(resource = %key, expires_at = signed.expires_at, "Issued media token");

    Ok(Json(TokenResponse {
        resource_name: signed.resource,
        token: signed.token,
        url: signed.url,
        expires_at: signed.expires_at,
        expires_in,
    }))
}

async fn issue_tokens(
    State(service): State<Arc<MediaService>>,
    payload: Result<Json<TokensRequest>, JsonRejection>,
) -> Result<Json<TokensResponse>, MediaError> {
    let Json(request) = payload.map_err(|rejection| MediaError::BadRequest(rejection.body_text()))?;

    if request.resource_names.len() > MAX_BATCH_SIZE {
        return Err(MediaError::BadRequest(format!(
            "at most {MAX_BATCH_SIZE} resource names per request"
        )));
    }

    let urls = service
        .cache()
        .get_tokens(request.resource_names.as_slice(), Ttl::or_default(request.ttl_minutes))?
        .into_iter()
        .map(|(key, url)| (key.into(), url))
        .collect();

    Ok(Json(TokensResponse { urls }))
}

async fn health() -> &'static str {
    "ok"
}
