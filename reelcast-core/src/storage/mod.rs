//! Object storage for background clips and published videos.
//!
//! The pipeline only sees the [`ObjectStore`] trait. [`LocalObjectStore`] is
//! the filesystem-backed implementation used in development and tests; cloud
//! stores (S3-compatible buckets) implement the same trait out of tree.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;
    async fn write(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
    /// Public URL of an object. Purely computed; it does not check existence.
    fn public_url(&self, bucket: &str, key: &str) -> String;
}

/// Filesystem-backed [`ObjectStore`]: `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    fn validate(name: &str) -> Result<(), StorageError> {
        if name.trim().is_empty()
            || name.contains("..")
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(StorageError::InvalidKey(name.to_owned()));
        }
        Ok(())
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        Self::validate(bucket)?;
        Self::validate(key)?;
        Ok(self.root.join(bucket).join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let target = self.object_path(bucket, key)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write to a sibling temp file and rename so readers never observe a
        // half-written object.
        let temp = target.with_extension("tmp");
        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&temp, &target).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base.trim_end_matches('/'),
            bucket,
            key
        )
    }
}
