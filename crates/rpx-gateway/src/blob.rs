//! # Blob Store
//!
//! Cached bodies live on the local filesystem at
//! `<root>/<repository>/<path>`, mirroring the upstream layout.
//!
//! ## Publication Invariant
//!
//! A blob at its final path is always complete. Writers stream into a
//! uniquely named file under `<root>/.staging/` and [`BlobWriter::finalize`]
//! renames it into place, which replaces any previous copy atomically. A
//! reader that opened the old copy keeps reading the old inode. Repository
//! names cannot start with `.`, so the staging directory never collides with
//! a repository tree.
//!
//! A writer that is dropped without being finalized removes its staging file.

use std::path::{Path, PathBuf};

use rpx_core::{CachePath, RepositoryName};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Name of the staging directory below the storage root.
pub const STAGING_DIR: &str = ".staging";

/// Local filesystem failure in the blob store.
#[derive(Debug, thiserror::Error)]
#[error("{action} {path}: {source}")]
pub struct BlobError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl BlobError {
    fn new(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Hierarchical byte storage keyed by `(repository, path)`.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a store rooted at `root`. Directories are created on demand.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final location of a blob.
    pub fn blob_path(&self, repository: &RepositoryName, path: &CachePath) -> PathBuf {
        let mut full = self.root.join(repository.as_str());
        full.extend(path.segments());
        full
    }

    /// Whether a regular file exists at the blob's final location.
    pub async fn exists(&self, repository: &RepositoryName, path: &CachePath) -> bool {
        fs::metadata(self.blob_path(repository, path))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Open a finalized blob for reading.
    pub async fn open_for_read(
        &self,
        repository: &RepositoryName,
        path: &CachePath,
    ) -> Result<fs::File, BlobError> {
        let target = self.blob_path(repository, path);
        fs::File::open(&target)
            .await
            .map_err(|e| BlobError::new("open", &target, e))
    }

    /// Start writing a new copy of a blob.
    ///
    /// Creates the parent directories of the final location and the staging
    /// directory. Nothing becomes visible at the final path until
    /// [`BlobWriter::finalize`].
    pub async fn open_for_write(
        &self,
        repository: &RepositoryName,
        path: &CachePath,
    ) -> Result<BlobWriter, BlobError> {
        let target = self.blob_path(repository, path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| BlobError::new("create directory", parent, e))?;
        }

        let staging_dir = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging_dir)
            .await
            .map_err(|e| BlobError::new("create directory", &staging_dir, e))?;

        let staging = staging_dir.join(format!("{}.part", Uuid::new_v4()));
        let file = fs::File::create(&staging)
            .await
            .map_err(|e| BlobError::new("create", &staging, e))?;

        Ok(BlobWriter {
            file: Some(file),
            staging,
            target,
            written: 0,
        })
    }
}

/// An in-progress blob write.
#[derive(Debug)]
pub struct BlobWriter {
    file: Option<fs::File>,
    staging: PathBuf,
    target: PathBuf,
    written: u64,
}

impl BlobWriter {
    /// Append a chunk to the staging file.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), BlobError> {
        let file = self.file.as_mut().ok_or_else(|| {
            BlobError::new(
                "write",
                &self.staging,
                std::io::Error::other("writer already closed"),
            )
        })?;
        file.write_all(chunk)
            .await
            .map_err(|e| BlobError::new("write", &self.staging, e))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush, sync, and atomically publish the blob at its final location.
    ///
    /// Returns the number of bytes published.
    pub async fn finalize(mut self) -> Result<u64, BlobError> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .await
                .map_err(|e| BlobError::new("flush", &self.staging, e))?;
            file.sync_all()
                .await
                .map_err(|e| BlobError::new("sync", &self.staging, e))?;
        }
        fs::rename(&self.staging, &self.target)
            .await
            .map_err(|e| BlobError::new("rename", &self.target, e))?;
        // Published; nothing left for Drop to clean up.
        self.staging = PathBuf::new();
        Ok(self.written)
    }
}

impl Drop for BlobWriter {
    fn drop(&mut self) {
        if self.staging.as_os_str().is_empty() {
            return;
        }
        self.file.take();
        if let Err(e) = std::fs::remove_file(&self.staging) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    staging = %self.staging.display(),
                    error = %e,
                    "failed to remove abandoned staging file"
                );
            }
        }
    }
}
