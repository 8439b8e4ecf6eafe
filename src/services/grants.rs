use crate::error::{GatewayError, GatewayResult};
use crate::services::backend::{ObjectBackend, bounded};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use crate::services::backend::GrantMethod;

/// A presigned URL together with what it authorizes.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub method: GrantMethod,
    pub bucket: String,
    pub key: String,
    pub expires_in: Duration,
    pub issued_at: DateTime<Utc>,
    pub url: String,
}

impl AccessGrant {
    pub fn expires_at(&self) -> DateTime<Utc> {
        // expires_in is capped at 7 days so this cannot overflow
        self.issued_at + chrono::Duration::from_std(self.expires_in).unwrap_or(chrono::Duration::zero())
    }
}

/// Issues method-scoped, time-bounded URLs. Never touches local disk.
pub struct GrantIssuer {
    backend: Arc<dyn ObjectBackend>,
    max_expiry: Duration,
    backend_timeout: Duration,
}

impl GrantIssuer {
    pub fn new(backend: Arc<dyn ObjectBackend>, max_expiry: Duration, backend_timeout: Duration) -> Self {
        Self {
            backend,
            max_expiry,
            backend_timeout,
        }
    }

    pub async fn issue(
        &self,
        method: GrantMethod,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> GatewayResult<AccessGrant> {
        if bucket.trim().is_empty() || key.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "bucket name and key are required".to_string(),
            ));
        }
        if expires_in.is_zero() {
            return Err(GatewayError::SigningFailure(
                "expiry must be positive".to_string(),
            ));
        }
        if expires_in > self.max_expiry {
            return Err(GatewayError::SigningFailure(format!(
                "expiry of {}s exceeds the maximum of {}s",
                expires_in.as_secs(),
                self.max_expiry.as_secs()
            )));
        }

        let issued_at = Utc::now();
        let url = bounded(
            self.backend_timeout,
            self.backend.presign(method, bucket, key, expires_in),
        )
        .await?;

        let parsed = url::Url::parse(&url).map_err(|e| {
            GatewayError::SigningFailure(format!("backend returned an invalid URL: {}", e))
        })?;

        info!(
            "🔑 Issued {:?} grant for {}/{} via {} (expires in {}s)",
            method,
            bucket,
            key,
            parsed.host_str().unwrap_or("unknown host"),
            expires_in.as_secs()
        );

        Ok(AccessGrant {
            method,
            bucket: bucket.to_string(),
            key: key.to_string(),
            expires_in,
            issued_at,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mock::MockBackend;

    fn issuer() -> GrantIssuer {
        issuer_for(Arc::new(MockBackend::with_bucket("media")))
    }

    fn issuer_for(backend: Arc<MockBackend>) -> GrantIssuer {
        GrantIssuer::new(backend, Duration::from_secs(3600), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_issue_keeps_requested_expiry() {
        let grant = issuer()
            .issue(GrantMethod::Read, "media", "clips/a.mp4", Duration::from_secs(300))
            .await
            .unwrap();

        assert_eq!(grant.expires_in, Duration::from_secs(300));
        assert_eq!(grant.expires_at() - grant.issued_at, chrono::Duration::seconds(300));
        assert!(grant.url.contains("X-Amz-Expires=300"));
    }

    #[tokio::test]
    async fn test_write_grant_is_scoped_to_put() {
        let backend = Arc::new(MockBackend::with_bucket("media"));
        let grant = issuer_for(backend.clone())
            .issue(GrantMethod::Write, "media", "upload.bin", Duration::from_secs(60))
            .await
            .unwrap();

        let now = std::time::SystemTime::now();
        assert!(backend.dereference(&grant.url, "PUT", now).is_ok());
        assert!(backend.dereference(&grant.url, "GET", now).is_err());
    }

    #[tokio::test]
    async fn test_identical_requests_yield_distinct_urls() {
        let issuer = issuer();
        let a = issuer
            .issue(GrantMethod::Read, "media", "a", Duration::from_secs(60))
            .await
            .unwrap();
        let b = issuer
            .issue(GrantMethod::Read, "media", "a", Duration::from_secs(60))
            .await
            .unwrap();
        assert_ne!(a.url, b.url);
    }

    #[tokio::test]
    async fn test_expiry_out_of_range_is_rejected() {
        let issuer = issuer();
        let zero = issuer
            .issue(GrantMethod::Read, "media", "a", Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(zero, GatewayError::SigningFailure(_)));

        let too_long = issuer
            .issue(GrantMethod::Read, "media", "a", Duration::from_secs(3601))
            .await
            .unwrap_err();
        assert!(matches!(too_long, GatewayError::SigningFailure(_)));
    }

    #[tokio::test]
    async fn test_requires_bucket_and_key() {
        let err = issuer()
            .issue(GrantMethod::Write, "media", "", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }
}
