use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use utoipa::ToSchema;

/// Operation a presigned URL authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GrantMethod {
    /// GET the object
    Read,
    /// PUT the object
    Write,
}

impl GrantMethod {
    pub fn http_method(&self) -> &'static str {
        match self {
            GrantMethod::Read => "GET",
            GrantMethod::Write => "PUT",
        }
    }
}

/// Outcome of a put as reported by the backend.
#[derive(Debug, Clone)]
pub struct PutReceipt {
    pub success: bool,
    pub e_tag: Option<String>,
}

impl PutReceipt {
    pub fn is_success(&self) -> bool {
        self.success
    }
}

#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Returns the location reported by the backend, if any.
    async fn create_bucket(&self, bucket: &str) -> GatewayResult<Option<String>>;
    async fn head_bucket(&self, bucket: &str) -> GatewayResult<()>;
    async fn list_buckets(&self) -> GatewayResult<Vec<String>>;
    /// Uploads the file at `body` as the whole object.
    async fn put_object(&self, bucket: &str, key: &str, body: &Path) -> GatewayResult<PutReceipt>;
    async fn get_object(&self, bucket: &str, key: &str) -> GatewayResult<Bytes>;
    async fn presign(
        &self,
        method: GrantMethod,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> GatewayResult<String>;
}

/// Runs a backend round trip, failing with `Timeout` once `limit` elapses.
pub async fn bounded<T, F>(limit: Duration, fut: F) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| GatewayError::Timeout(limit))?
}

pub struct S3Backend {
    client: Client,
    region: String,
}

impl S3Backend {
    pub fn new(client: Client, region: String) -> Self {
        Self { client, region }
    }
}

fn classify<E>(err: SdkError<E, HttpResponse>, target: &str) -> GatewayError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) | SdkError::ResponseError(_) => {
            GatewayError::BackendUnavailable(format!("{}: {}", target, DisplayErrorContext(&err)))
        }
        SdkError::ServiceError(ctx) => {
            let status = ctx.raw().status().as_u16();
            match ctx.err().code() {
                Some("NoSuchBucket") | Some("NoSuchKey") | Some("NotFound") => {
                    GatewayError::NotFound(target.to_string())
                }
                Some("BucketAlreadyExists") | Some("BucketAlreadyOwnedByYou") => {
                    GatewayError::AlreadyExists(target.to_string())
                }
                _ if status == 404 => GatewayError::NotFound(target.to_string()),
                code => GatewayError::Rejected(format!(
                    "{}: {} (status {})",
                    target,
                    ctx.err().message().or(code).unwrap_or("unknown error"),
                    status
                )),
            }
        }
        _ => GatewayError::Rejected(format!("{}: {}", target, DisplayErrorContext(&err))),
    }
}

#[async_trait]
impl ObjectBackend for S3Backend {
    async fn create_bucket(&self, bucket: &str) -> GatewayResult<Option<String>> {
        let mut request = self.client.create_bucket().bucket(bucket);

        // us-east-1 rejects an explicit location constraint
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        let output = request.send().await.map_err(|e| classify(e, bucket))?;
        Ok(output.location().map(str::to_string))
    }

    async fn head_bucket(&self, bucket: &str) -> GatewayResult<()> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| classify(e, bucket))?;
        Ok(())
    }

    async fn list_buckets(&self) -> GatewayResult<Vec<String>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| classify(e, "list_buckets"))?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: &Path) -> GatewayResult<PutReceipt> {
        let target = format!("{}/{}", bucket, key);
        let stream = ByteStream::from_path(body).await.map_err(|e| {
            GatewayError::local_io(
                format!("reading staged file {}", body.display()),
                std::io::Error::other(e),
            )
        })?;

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(stream)
            .send()
            .await
            .map_err(|e| classify(e, &target))?;

        // The SDK only deserializes an output for a 2xx response
        Ok(PutReceipt {
            success: true,
            e_tag: output.e_tag().map(str::to_string),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> GatewayResult<Bytes> {
        let target = format!("{}/{}", bucket, key);
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(e, &target))?;

        let data = output.body.collect().await.map_err(|e| {
            GatewayError::BackendUnavailable(format!("{}: body stream failed: {}", target, e))
        })?;
        Ok(data.into_bytes())
    }

    async fn presign(
        &self,
        method: GrantMethod,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> GatewayResult<String> {
        let config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| GatewayError::SigningFailure(e.to_string()))?;

        let request = match method {
            GrantMethod::Read => self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .presigned(config)
                .await
                .map_err(|e| GatewayError::SigningFailure(DisplayErrorContext(&e).to_string()))?,
            GrantMethod::Write => self
                .client
                .put_object()
                .bucket(bucket)
                .key(key)
                .presigned(config)
                .await
                .map_err(|e| GatewayError::SigningFailure(DisplayErrorContext(&e).to_string()))?,
        };

        Ok(request.uri().to_string())
    }
}
