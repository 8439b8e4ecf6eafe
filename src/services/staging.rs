use crate::error::{GatewayError, GatewayResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Marks files the sweeper is allowed to delete.
pub const STAGING_PREFIX: &str = ".staging-";

/// Subdirectory of the destination folder that holds uniquely named staging files.
pub const STAGING_DIR: &str = ".staging";

/// Owns the scratch directory backing in-flight uploads.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
    unique_names: bool,
}

/// A local file holding payload bytes for exactly one transfer.
///
/// Hand it back through [`StagingArea::release`]. If it is dropped first (for
/// example because the request future was cancelled) the file is removed
/// synchronously on drop.
#[derive(Debug)]
pub struct StagingFile {
    path: PathBuf,
    size: u64,
    released: bool,
}

impl StagingFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => warn!(
                "🧹 Staging file {} dropped without release, removed",
                self.path.display()
            ),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => error!(
                "❌ Failed to remove unreleased staging file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Reduces a client-supplied filename to a safe single path component.
pub fn sanitize_filename(original_name: &str) -> GatewayResult<String> {
    let name = original_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    if name.is_empty() || name == "." || name == ".." {
        return Err(GatewayError::InvalidRequest(format!(
            "invalid filename: {:?}",
            original_name
        )));
    }

    if name.len() != original_name.len() {
        warn!("Path components stripped from filename: {}", original_name);
    }

    Ok(name
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|' | ';') {
                '_'
            } else {
                c
            }
        })
        .collect())
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>, unique_names: bool) -> Self {
        Self {
            root: root.into(),
            unique_names,
        }
    }

    /// Staging area serving `destination`.
    ///
    /// Unique staging files live in their own subdirectory so the sweeper
    /// never sees downloaded files. Shared names stay in `destination` itself.
    pub fn for_destination(destination: impl AsRef<Path>, unique_names: bool) -> Self {
        let destination = destination.as_ref();
        let root = if unique_names {
            destination.join(STAGING_DIR)
        } else {
            destination.to_path_buf()
        };
        Self::new(root, unique_names)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the staging file for `original_name`.
    ///
    /// Without unique names this is the sanitized original name, so two
    /// concurrent uploads of the same filename race and the last writer wins.
    pub fn staging_name(&self, original_name: &str) -> GatewayResult<String> {
        let name = sanitize_filename(original_name)?;
        if self.unique_names {
            Ok(format!("{}{}-{}", STAGING_PREFIX, Uuid::new_v4(), name))
        } else {
            Ok(name)
        }
    }

    pub async fn stage(&self, original_name: &str, bytes: &[u8]) -> GatewayResult<StagingFile> {
        let name = self.staging_name(original_name)?;

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            GatewayError::local_io(
                format!("creating staging directory {}", self.root.display()),
                e,
            )
        })?;

        let path = self.root.join(name);
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            // Don't leave a half-written file behind
            let _ = tokio::fs::remove_file(&path).await;
            return Err(GatewayError::local_io(
                format!("writing staging file {}", path.display()),
                e,
            ));
        }

        debug!("📝 Staged {} bytes at {}", bytes.len(), path.display());

        Ok(StagingFile {
            path,
            size: bytes.len() as u64,
            released: false,
        })
    }

    pub async fn release(&self, mut file: StagingFile) -> GatewayResult<()> {
        // Whatever happens the caller hears about it, so Drop must not retry
        file.released = true;
        tokio::fs::remove_file(&file.path).await.map_err(|e| {
            GatewayError::local_io(
                format!("removing staging file {}", file.path.display()),
                e,
            )
        })?;
        debug!("🗑️  Released staging file {}", file.path.display());
        Ok(())
    }

    /// Deletes prefixed staging files last modified more than `older_than` ago.
    ///
    /// Shared-name staging files cannot be told apart from other files, so
    /// nothing is swept without unique names.
    pub async fn sweep(&self, older_than: Duration) -> GatewayResult<usize> {
        if !self.unique_names {
            return Ok(0);
        }

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(GatewayError::local_io(
                    format!("reading staging directory {}", self.root.display()),
                    e,
                ));
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| GatewayError::local_io("listing staging directory", e))?
        {
            let is_staging = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(STAGING_PREFIX));
            if !is_staging {
                continue;
            }

            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            let age = metadata
                .modified()
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .unwrap_or_default();

            if metadata.is_file() && age >= older_than {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(
                        "Failed to sweep staging file {}: {}",
                        entry.path().display(),
                        e
                    ),
                }
            }
        }

        Ok(removed)
    }
}
