//! Server side of the HTTP file-transfer plane (spec §4.6): an `axum`
//! router serving `/<dbPath>/<filename>` with GET for ranged downloads and
//! POST/PUT for validated uploads.

use crate::chunk_store::{ChunkFileMetadata, ChunkStoreBackend};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Clone)]
struct HandlerState {
    backend: Arc<dyn ChunkStoreBackend>,
}

/// Build the router served over the HTTP plane's substreams.
pub fn router(backend: Arc<dyn ChunkStoreBackend>) -> Router {
    Router::new()
        .route("/*path", get(get_file).post(upload).put(upload))
        .with_state(HandlerState { backend })
}

async fn get_file(
    State(state): State<HandlerState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_range_header);

    match state.backend.read_file(&path, range).await {
        Ok(data) => {
            let status = if range.is_some() {
                StatusCode::PARTIAL_CONTENT
            } else {
                StatusCode::OK
            };
            (
                status,
                [(header::CONTENT_TYPE, "application/octet-stream")],
                data,
            )
                .into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, format!("not found: {path}")).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Parses a single-range `Range: bytes=START-END` header. Multi-range
/// requests are not produced by this protocol's clients and are ignored
/// (treated as no range), matching the client's own "one contiguous
/// subrange per request" access pattern (spec §4.6).
fn parse_range_header(value: &str) -> Option<(u64, u64)> {
    let spec = value.strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    let start: u64 = start.parse().ok()?;
    let end: u64 = end.parse().ok()?;
    Some((start, end))
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    num_chunks: Option<u64>,
    content_length: Option<u64>,
    content_hash: Option<String>,
    split_offset: Option<u64>,
}

fn validate_upload(params: &UploadParams) -> Result<ChunkFileMetadata, &'static str> {
    let num_chunks = params.num_chunks.ok_or("missing num_chunks")?;
    let content_length = params.content_length.ok_or("missing content_length")?;
    let content_hash_raw = params.content_hash.as_deref().ok_or("missing content_hash")?;
    let content_hash = base64::Engine::decode(
        &base64::engine::general_purpose::URL_SAFE_NO_PAD,
        content_hash_raw,
    )
    .map_err(|_| "malformed content_hash")?;
    let split_offset = params.split_offset.unwrap_or(0);

    Ok(ChunkFileMetadata {
        num_chunks,
        content_length,
        content_hash,
        split_offset,
    })
}

async fn upload(
    State(state): State<HandlerState>,
    Path(path): Path<String>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Response {
    let metadata = match validate_upload(&params) {
        Ok(v) => v,
        Err(reason) => return (StatusCode::BAD_REQUEST, reason).into_response(),
    };

    match state.backend.write_file(&path, body.to_vec(), metadata).await {
        Ok(()) => (StatusCode::OK, "").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_range() {
        assert_eq!(parse_range_header("bytes=0-99"), Some((0, 99)));
        assert_eq!(parse_range_header("bytes=100-199"), Some((100, 199)));
        assert_eq!(parse_range_header("garbage"), None);
    }

    #[test]
    fn validate_upload_requires_all_fields() {
        let missing = UploadParams {
            num_chunks: None,
            content_length: Some(10),
            content_hash: Some("abc".into()),
            split_offset: None,
        };
        assert!(validate_upload(&missing).is_err());
    }

    #[test]
    fn validate_upload_accepts_default_split_offset() {
        let params = UploadParams {
            num_chunks: Some(1),
            content_length: Some(3),
            content_hash: Some(
                base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, b"abc"),
            ),
            split_offset: None,
        };
        let validated = validate_upload(&params).unwrap();
        assert_eq!(validated.split_offset, 0);
    }

    #[test]
    fn validate_upload_rejects_malformed_hash() {
        let params = UploadParams {
            num_chunks: Some(1),
            content_length: Some(3),
            content_hash: Some("not-valid-base64url!!".into()),
            split_offset: None,
        };
        assert!(validate_upload(&params).is_err());
    }
}
