mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{MockBackend, multipart_body, staged_files, test_app, test_app_with, test_config};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

async fn json_body(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn upload_request(bucket: &str, key: &str, filename: &str, content: &str) -> Request<Body> {
    let boundary = "---------------------------123456789012345678901234567";
    Request::builder()
        .method("POST")
        .uri("/s3/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(multipart_body(boundary, bucket, key, filename, content)))
        .unwrap()
}

#[tokio::test]
async fn test_bucket_flow() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(Arc::new(MockBackend::default()), dir.path());

    // 1. Create
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/s3/create?bucketName=reports")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["location"], "/reports");

    // 2. Duplicate create
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/s3/create?bucketName=reports")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // 3. Check existing and absent
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/s3/check/reports")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["found"], true);
    assert_eq!(json["message"], "Bucket found");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/s3/check/definitely-absent-random-name")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["found"], false);
    assert_eq!(json["message"], "Bucket not found");

    // 4. List
    let response = app
        .oneshot(Request::builder().uri("/s3/list").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json, serde_json::json!(["reports"]));
}

#[tokio::test]
async fn test_upload_then_download_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(MockBackend::with_bucket("uploads"));
    let app = test_app(backend.clone(), dir.path());

    let response = app
        .clone()
        .oneshot(upload_request(
            "uploads",
            "notes/2024/todo.txt",
            "todo.txt",
            "Hello, this is a test file content!",
        ))
        .await
        .unwrap();
    let status = response.status();
    let json = json_body(response).await;
    assert_eq!(status, StatusCode::OK, "upload failed: {json}");
    assert_eq!(json["size"], 35);
    assert!(json.get("warning").is_none());

    // Staging file is gone once the upload returns
    assert_eq!(staged_files(dir.path()), 0);
    assert_eq!(
        backend.object("uploads", "notes/2024/todo.txt").unwrap().as_ref(),
        b"Hello, this is a test file content!"
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/s3/download?bucketName=uploads&key=notes/2024/todo.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["message"], "File downloaded successfully");

    let downloaded = std::fs::read(dir.path().join("todo.txt")).unwrap();
    assert_eq!(downloaded, b"Hello, this is a test file content!");
}

#[tokio::test]
async fn test_upload_to_missing_bucket_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(Arc::new(MockBackend::default()), dir.path());

    let response = app
        .oneshot(upload_request("nowhere", "a.txt", "a.txt", "data"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(staged_files(dir.path()), 0);
}

#[tokio::test]
async fn test_upload_without_file_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(Arc::new(MockBackend::with_bucket("uploads")), dir.path());

    let boundary = "XBOUNDARY";
    let body = format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"bucketName\"\r\n\r\n\
        uploads\r\n\
        --{boundary}--\r\n"
    );
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/s3/upload")
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Missing 'file' field");
}

#[tokio::test]
async fn test_file_over_max_size_is_payload_too_large() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(MockBackend::with_bucket("uploads"));
    let config = s3_gateway::config::GatewayConfig {
        max_file_size: 16,
        ..test_config(dir.path())
    };
    let app = test_app_with(backend.clone(), config);

    let response = app
        .oneshot(upload_request("uploads", "big.bin", "big.bin", &"x".repeat(4096)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(backend.object("uploads", "big.bin").is_none());
    assert_eq!(staged_files(dir.path()), 0);
}

#[tokio::test]
async fn test_body_over_limit_is_payload_too_large() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(MockBackend::with_bucket("uploads"));
    let config = s3_gateway::config::GatewayConfig {
        max_file_size: 16,
        ..test_config(dir.path())
    };
    let app = test_app_with(backend.clone(), config);

    // Larger than the file limit plus the multipart allowance
    let content = "x".repeat(11 * 1024 * 1024);
    let response = app
        .oneshot(upload_request("uploads", "huge.bin", "huge.bin", &content))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(backend.object("uploads", "huge.bin").is_none());
}

#[tokio::test]
async fn test_upload_reports_cleanup_warning() {
    let dir = tempfile::tempdir().unwrap();
    let mut backend = MockBackend::with_bucket("uploads");
    backend.consume_staged_files = true;
    let backend = Arc::new(backend);
    let app = test_app(backend.clone(), dir.path());

    let response = app
        .oneshot(upload_request("uploads", "a.txt", "a.txt", "data"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["message"], "File uploaded successfully");
    assert!(json["warning"].is_string());
    assert_eq!(backend.object("uploads", "a.txt").unwrap().as_ref(), b"data");
}

#[tokio::test]
async fn test_download_into_unusable_destination_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("occupied");
    std::fs::write(&destination, b"a regular file").unwrap();
    let app = test_app(
        Arc::new(MockBackend::with_object("uploads", "a.txt", b"data")),
        &destination,
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/s3/download?bucketName=uploads&key=a.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error"], "Local storage failure");
    assert_eq!(std::fs::read(&destination).unwrap(), b"a regular file");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_download_missing_key_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(Arc::new(MockBackend::with_bucket("uploads")), dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/s3/download?bucketName=uploads&key=missing.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!dir.path().join("missing.txt").exists());
}

#[tokio::test]
async fn test_download_key_without_leaf_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(Arc::new(MockBackend::with_bucket("uploads")), dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/s3/download?bucketName=uploads&key=folder/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_request_id() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(Arc::new(MockBackend::default()), dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["backend"], "connected");
}
