//! In-memory backend shared by unit and integration tests.
//!
//! Its presigned URLs carry a keyed signature that [`MockBackend::dereference`]
//! checks the way a real object store would, so grant tests can exercise
//! method scoping and expiry without network access.

use crate::error::{GatewayError, GatewayResult};
use crate::services::backend::{GrantMethod, ObjectBackend, PutReceipt};
use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const MOCK_SECRET: &str = "mock-secret-key";

#[derive(Default)]
pub struct MockBackend {
    pub buckets: Mutex<BTreeMap<String, BTreeMap<String, Bytes>>>,
    /// Acknowledge puts with a negative success indicator
    pub refuse_puts: bool,
    /// Every call fails as if the backend were unreachable
    pub offline: bool,
    /// Delay applied to put/get round trips
    pub latency: Option<Duration>,
    /// Delete the staged body after storing it, as an outside cleaner would
    pub consume_staged_files: bool,
}

impl MockBackend {
    pub fn with_bucket(name: &str) -> Self {
        let backend = Self::default();
        backend
            .buckets
            .lock()
            .unwrap()
            .insert(name.to_string(), BTreeMap::new());
        backend
    }

    /// Backend holding a single object.
    pub fn with_object(bucket: &str, key: &str, data: &[u8]) -> Self {
        let backend = Self::with_bucket(bucket);
        backend
            .buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), Bytes::copy_from_slice(data));
        backend
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|b| b.get(key).cloned())
    }

    fn check_online(&self) -> GatewayResult<()> {
        if self.offline {
            Err(GatewayError::BackendUnavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn sign(method: &str, path: &str, issued: u64, expires: u64, nonce: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(MOCK_SECRET.as_bytes());
        hasher.update(format!("{method}\n{path}\n{issued}\n{expires}\n{nonce}").as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Accepts `url` presented with `http_method` at `at`, as the backend
    /// would when a client uses a presigned URL directly.
    pub fn dereference(&self, url: &str, http_method: &str, at: SystemTime) -> Result<(), String> {
        let parsed = url::Url::parse(url).map_err(|e| e.to_string())?;
        let query: BTreeMap<String, String> = parsed.query_pairs().into_owned().collect();
        let field = |name: &str| {
            query
                .get(name)
                .cloned()
                .ok_or_else(|| format!("missing {name}"))
        };

        let issued: u64 = field("X-Amz-Date")?.parse().map_err(|_| "bad date")?;
        let expires: u64 = field("X-Amz-Expires")?.parse().map_err(|_| "bad expiry")?;
        let nonce = field("X-Nonce")?;
        let signature = field("X-Amz-Signature")?;

        let expected = Self::sign(http_method, parsed.path(), issued, expires, &nonce);
        if signature != expected {
            return Err("SignatureDoesNotMatch".to_string());
        }

        let now = at
            .duration_since(UNIX_EPOCH)
            .map_err(|e| e.to_string())?
            .as_secs();
        if now > issued + expires {
            return Err("AccessDenied: Request has expired".to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectBackend for MockBackend {
    async fn create_bucket(&self, bucket: &str) -> GatewayResult<Option<String>> {
        self.check_online()?;
        let mut buckets = self.buckets.lock().unwrap();
        if buckets.contains_key(bucket) {
            return Err(GatewayError::AlreadyExists(bucket.to_string()));
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(Some(format!("/{}", bucket)))
    }

    async fn head_bucket(&self, bucket: &str) -> GatewayResult<()> {
        self.check_online()?;
        if self.buckets.lock().unwrap().contains_key(bucket) {
            Ok(())
        } else {
            Err(GatewayError::NotFound(bucket.to_string()))
        }
    }

    async fn list_buckets(&self) -> GatewayResult<Vec<String>> {
        self.check_online()?;
        Ok(self.buckets.lock().unwrap().keys().cloned().collect())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: &Path) -> GatewayResult<PutReceipt> {
        self.check_online()?;
        self.simulate_latency().await;
        let data = tokio::fs::read(body)
            .await
            .map_err(|e| GatewayError::local_io("reading staged file", e))?;

        if self.refuse_puts {
            return Ok(PutReceipt {
                success: false,
                e_tag: None,
            });
        }

        {
            let mut buckets = self.buckets.lock().unwrap();
            let objects = buckets
                .get_mut(bucket)
                .ok_or_else(|| GatewayError::NotFound(bucket.to_string()))?;
            objects.insert(key.to_string(), Bytes::from(data));
        }

        if self.consume_staged_files {
            tokio::fs::remove_file(body)
                .await
                .map_err(|e| GatewayError::local_io("consuming staged file", e))?;
        }

        Ok(PutReceipt {
            success: true,
            e_tag: Some("\"mock\"".to_string()),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> GatewayResult<Bytes> {
        self.check_online()?;
        self.simulate_latency().await;
        self.object(bucket, key)
            .ok_or_else(|| GatewayError::NotFound(format!("{}/{}", bucket, key)))
    }

    async fn presign(
        &self,
        method: GrantMethod,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> GatewayResult<String> {
        self.check_online()?;
        let issued = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| GatewayError::SigningFailure(e.to_string()))?
            .as_secs();
        let nonce = uuid::Uuid::new_v4().to_string();
        let path = format!("/{}/{}", bucket, key);
        let signature = Self::sign(
            method.http_method(),
            &path,
            issued,
            expires_in.as_secs(),
            &nonce,
        );
        Ok(format!(
            "http://mock.local{}?X-Amz-Date={}&X-Amz-Expires={}&X-Nonce={}&X-Amz-Signature={}",
            path,
            issued,
            expires_in.as_secs(),
            nonce,
            signature
        ))
    }
}
