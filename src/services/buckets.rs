use crate::error::{GatewayError, GatewayResult};
use crate::services::backend::{ObjectBackend, bounded};
use std::sync::Arc;
use std::time::Duration;

/// Thin pass-through for bucket-level operations.
pub struct BucketRegistry {
    backend: Arc<dyn ObjectBackend>,
    backend_timeout: Duration,
}

impl BucketRegistry {
    pub fn new(backend: Arc<dyn ObjectBackend>, backend_timeout: Duration) -> Self {
        Self {
            backend,
            backend_timeout,
        }
    }

    /// Creates `name` and returns the location the backend reported, falling
    /// back to `/name` when it reported none.
    pub async fn create(&self, name: &str) -> GatewayResult<String> {
        require_name(name)?;
        let location = bounded(self.backend_timeout, self.backend.create_bucket(name)).await?;
        tracing::info!("🪣 Bucket '{}' created", name);
        Ok(location.unwrap_or_else(|| format!("/{}", name)))
    }

    /// `false` only when the backend says the bucket is absent.
    pub async fn exists(&self, name: &str) -> GatewayResult<bool> {
        require_name(name)?;
        match bounded(self.backend_timeout, self.backend.head_bucket(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn list(&self) -> GatewayResult<Vec<String>> {
        bounded(self.backend_timeout, self.backend.list_buckets()).await
    }
}

fn require_name(name: &str) -> GatewayResult<()> {
    if name.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "bucket name is required".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mock::MockBackend;

    fn registry(backend: MockBackend) -> BucketRegistry {
        BucketRegistry::new(Arc::new(backend), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_created_bucket_exists() {
        let registry = registry(MockBackend::default());
        let location = registry.create("fresh-bucket").await.unwrap();
        assert_eq!(location, "/fresh-bucket");
        assert!(registry.exists("fresh-bucket").await.unwrap());
        assert!(!registry.exists("definitely-absent-random-name").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_create_is_already_exists() {
        let registry = registry(MockBackend::with_bucket("taken"));
        let err = registry.create("taken").await.unwrap_err();
        assert!(matches!(err, GatewayError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_exists_propagates_backend_failures() {
        let mut backend = MockBackend::default();
        backend.offline = true;
        let err = registry(backend).exists("any").await.unwrap_err();
        assert!(matches!(err, GatewayError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_list() {
        let registry = registry(MockBackend::with_bucket("alpha"));
        registry.create("beta").await.unwrap();
        assert_eq!(registry.list().await.unwrap(), vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_empty_name_is_invalid() {
        let err = registry(MockBackend::default()).exists("").await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }
}
