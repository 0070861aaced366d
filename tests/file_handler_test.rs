//! Exercises the HTTP file-transfer handler directly through its `axum`
//! router, without a network socket or mux substream.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use ssh_remote_transport::chunk_store::FsBackend;
use ssh_remote_transport::file_handler;
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn get_returns_full_file_contents() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("table.bin"), b"0123456789").unwrap();

    let router = file_handler::router(Arc::new(FsBackend::new(dir.path())));
    let response = router
        .oneshot(
            Request::builder()
                .uri("/table.bin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"0123456789");
}

#[tokio::test]
async fn get_honors_byte_range() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("table.bin"), b"0123456789").unwrap();

    let router = file_handler::router(Arc::new(FsBackend::new(dir.path())));
    let response = router
        .oneshot(
            Request::builder()
                .uri("/table.bin")
                .header("Range", "bytes=2-5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"2345");
}

#[tokio::test]
async fn get_missing_file_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let router = file_handler::router(Arc::new(FsBackend::new(dir.path())));
    let response = router
        .oneshot(
            Request::builder()
                .uri("/missing.bin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_validates_required_params() {
    let dir = tempfile::tempdir().unwrap();
    let router = file_handler::router(Arc::new(FsBackend::new(dir.path())));

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/table.bin?num_chunks=1&content_length=5")
                .body(Body::from("hello"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_then_get_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let router = file_handler::router(Arc::new(FsBackend::new(dir.path())));

    let hash = base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, b"hello");
    let uri = format!("/table.bin?num_chunks=1&content_length=5&content_hash={hash}");

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(uri)
                .body(Body::from("hello"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/table.bin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"hello");
}
