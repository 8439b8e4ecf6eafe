use crate::error::{GatewayError, GatewayResult};
use crate::services::backend::{ObjectBackend, bounded};
use crate::services::staging::StagingArea;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

/// Local filename for an object key: the segment after the last `/`.
///
/// `"a/b/c.txt"` gives `"c.txt"`, a key without `/` is its own leaf and a key
/// ending in `/` gives the empty string.
pub fn derive_leaf(key: &str) -> &str {
    match key.rfind('/') {
        Some(idx) => &key[idx + 1..],
        None => key,
    }
}

#[derive(Debug, Clone)]
pub struct UploadReport {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    pub e_tag: Option<String>,
    /// Set when the object was stored but its staging file could not be removed
    pub cleanup_warning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub path: PathBuf,
    pub size: u64,
}

/// Moves whole objects between local disk and the backend.
pub struct TransferService {
    backend: Arc<dyn ObjectBackend>,
    staging: StagingArea,
    destination: PathBuf,
    backend_timeout: Duration,
}

impl TransferService {
    pub fn new(
        backend: Arc<dyn ObjectBackend>,
        staging: StagingArea,
        destination: PathBuf,
        backend_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            staging,
            destination,
            backend_timeout,
        }
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Stages `bytes`, puts them at `bucket/key`, then releases the staging
    /// file whatever the backend said.
    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> GatewayResult<UploadReport> {
        require_non_empty("bucket name", bucket)?;
        require_non_empty("key", key)?;

        let staged = self.staging.stage(original_name, bytes).await?;
        let size = staged.size();

        let outcome = bounded(
            self.backend_timeout,
            self.backend.put_object(bucket, key, staged.path()),
        )
        .await
        .and_then(|receipt| {
            if receipt.is_success() {
                Ok(receipt)
            } else {
                Err(GatewayError::Rejected(format!(
                    "backend did not acknowledge upload of {}/{}",
                    bucket, key
                )))
            }
        });

        let released = self.staging.release(staged).await;

        match (outcome, released) {
            (Ok(receipt), Ok(())) => {
                info!("⬆️  Uploaded {} bytes to {}/{}", size, bucket, key);
                Ok(UploadReport {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    size,
                    e_tag: receipt.e_tag,
                    cleanup_warning: None,
                })
            }
            (Ok(receipt), Err(cleanup)) => {
                warn!(
                    "⚠️  Uploaded {}/{} but staging cleanup failed: {}",
                    bucket, key, cleanup
                );
                Ok(UploadReport {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    size,
                    e_tag: receipt.e_tag,
                    cleanup_warning: Some(cleanup.to_string()),
                })
            }
            (Err(e), released) => {
                if let Err(cleanup) = released {
                    error!(
                        "❌ Staging cleanup failed after failed upload of {}/{}: {}",
                        bucket, key, cleanup
                    );
                }
                error!("❌ Upload of {}/{} failed: {}", bucket, key, e);
                Err(e)
            }
        }
    }

    /// Fetches `bucket/key` and writes it to the destination directory under
    /// the key's leaf name.
    pub async fn download(&self, bucket: &str, key: &str) -> GatewayResult<DownloadReport> {
        require_non_empty("bucket name", bucket)?;

        let leaf = derive_leaf(key);
        if leaf.is_empty() || leaf == "." || leaf == ".." {
            return Err(GatewayError::InvalidRequest(format!(
                "key {:?} has no usable leaf name",
                key
            )));
        }

        let data = bounded(self.backend_timeout, self.backend.get_object(bucket, key)).await?;

        tokio::fs::create_dir_all(&self.destination)
            .await
            .map_err(|e| {
                GatewayError::local_io(
                    format!("creating destination {}", self.destination.display()),
                    e,
                )
            })?;

        let target = self.destination.join(leaf);
        if let Err(e) = write_all(&target, &data).await {
            let _ = tokio::fs::remove_file(&target).await;
            return Err(GatewayError::local_io(
                format!("writing {}", target.display()),
                e,
            ));
        }

        info!(
            "⬇️  Downloaded {}/{} ({} bytes) to {}",
            bucket,
            key,
            data.len(),
            target.display()
        );

        Ok(DownloadReport {
            path: target,
            size: data.len() as u64,
        })
    }
}

async fn write_all(target: &std::path::Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(target)
        .await?;
    file.write_all(data).await?;
    file.flush().await
}

fn require_non_empty(what: &str, value: &str) -> GatewayResult<()> {
    if value.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(format!("{} is required", what)));
    }
    Ok(())
}
