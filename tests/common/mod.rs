#![allow(dead_code)]

use s3_gateway::config::GatewayConfig;
use s3_gateway::{AppState, create_app};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub use s3_gateway::services::mock::MockBackend;

pub fn test_config(destination: &Path) -> GatewayConfig {
    GatewayConfig {
        destination_folder: destination.to_path_buf(),
        backend_timeout: Duration::from_secs(2),
        ..GatewayConfig::default()
    }
}

pub fn test_app(backend: Arc<MockBackend>, destination: &Path) -> axum::Router {
    test_app_with(backend, test_config(destination))
}

pub fn test_app_with(backend: Arc<MockBackend>, config: GatewayConfig) -> axum::Router {
    create_app(AppState::new(backend, config))
}

/// Files the last upload left in the staging area.
pub fn staged_files(destination: &Path) -> usize {
    std::fs::read_dir(destination.join(s3_gateway::services::staging::STAGING_DIR))
        .map(|d| d.count())
        .unwrap_or(0)
}

pub fn multipart_body(boundary: &str, bucket: &str, key: &str, filename: &str, content: &str) -> String {
    format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"bucketName\"\r\n\r\n\
        {bucket}\r\n\
        --{boundary}\r\n\
        Content-Disposition: form-data; name=\"key\"\r\n\r\n\
        {key}\r\n\
        --{boundary}\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
        Content-Type: text/plain\r\n\r\n\
        {content}\r\n\
        --{boundary}--\r\n"
    )
}
