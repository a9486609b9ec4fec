//! Blob storage collaborator.
//!
//! The transform step only ever calls [`BlobStore::get`] once and
//! [`BlobStore::put`] once. [`StorageProvider`] implements it over
//! `object_store` for S3, a local directory tree, or process memory.

mod local;
mod memory;
mod s3;

pub use s3::S3Config;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, TransformError};

/// Whole-object get/put over named buckets. A put is atomic: readers see
/// either the complete object or nothing.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;

    async fn put(&self, bucket: &str, key: &str, data: Bytes, content_type: &str) -> Result<()>;

    /// Human-readable location of an object, reported back to callers.
    fn uri(&self, bucket: &str, key: &str) -> String {
        format!("{bucket}/{key}")
    }
}

/// Which backend a [`StorageProvider`] talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    S3(S3Config),
    /// Each bucket is a sub-directory of `root`.
    Local { root: PathBuf },
    Memory,
}

enum Backend {
    S3(S3Config),
    Local(PathBuf),
    Memory(memory::MemoryBuckets),
}

/// `object_store`-backed [`BlobStore`].
pub struct StorageProvider {
    backend: Backend,
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.backend {
            Backend::S3(config) => write!(f, "StorageProvider<s3 {:?}>", config.region),
            Backend::Local(root) => write!(f, "StorageProvider<{}>", root.display()),
            Backend::Memory(_) => f.write_str("StorageProvider<memory>"),
        }
    }
}

impl StorageProvider {
    pub fn new(config: StorageConfig) -> Self {
        let backend = match config {
            StorageConfig::S3(config) => Backend::S3(config),
            StorageConfig::Local { root } => Backend::Local(root),
            StorageConfig::Memory => Backend::Memory(memory::MemoryBuckets::default()),
        };
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(StorageConfig::Memory)
    }

    fn store_for(&self, bucket: &str) -> object_store::Result<Arc<dyn ObjectStore>> {
        match &self.backend {
            Backend::S3(config) => s3::store_for(config, bucket),
            Backend::Local(root) => local::store_for(root, bucket),
            Backend::Memory(buckets) => Ok(buckets.store_for(bucket)),
        }
    }

    fn put_options(&self, content_type: &str) -> PutOptions {
        // the local filesystem backend rejects object attributes
        if matches!(self.backend, Backend::Local(_)) {
            return PutOptions::default();
        }
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        PutOptions {
            attributes,
            ..Default::default()
        }
    }
}

fn io_error(location: String) -> impl FnOnce(object_store::Error) -> TransformError {
    move |source| TransformError::Io { location, source }
}

#[async_trait]
impl BlobStore for StorageProvider {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let location = self.uri(bucket, key);
        let store = self.store_for(bucket).map_err(io_error(location.clone()))?;
        let data = store
            .get(&Path::from(key))
            .await
            .map_err(io_error(location.clone()))?
            .bytes()
            .await
            .map_err(io_error(location.clone()))?;
        debug!(%location, bytes = data.len(), "read object");
        Ok(data)
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        let location = self.uri(bucket, key);
        let store = self.store_for(bucket).map_err(io_error(location.clone()))?;
        let size = data.len();
        store
            .put_opts(
                &Path::from(key),
                PutPayload::from(data),
                self.put_options(content_type),
            )
            .await
            .map_err(io_error(location.clone()))?;
        debug!(%location, bytes = size, "wrote object");
        Ok(())
    }

    fn uri(&self, bucket: &str, key: &str) -> String {
        match &self.backend {
            Backend::S3(_) => format!("s3://{bucket}/{key}"),
            Backend::Local(root) => format!("file://{}/{bucket}/{key}", root.display()),
            Backend::Memory(_) => format!("memory://{bucket}/{key}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_memory_round_trip() -> Result<()> {
        let store = StorageProvider::in_memory();
        let key = "tables/a/a.parquet";
        store
            .put("processed", key, Bytes::from_static(b"PAR1"), "application/octet-stream")
            .await?;
        let data = store.get("processed", key).await?;
        assert_eq!(&data[..], b"PAR1");

        // buckets are isolated
        assert!(store.get("raw", key).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_object_is_io_error() {
        let store = StorageProvider::in_memory();
        let err = store.get("raw", "nope.csv").await.unwrap_err();
        assert_eq!(err.kind(), "IOError");
        assert!(err.to_string().contains("memory://raw/nope.csv"), "{err}");
    }

    #[tokio::test]
    async fn test_local_backend_writes_under_bucket_dir() -> Result<()> {
        let tmp = tempdir()?;
        let store = StorageProvider::new(StorageConfig::Local {
            root: tmp.path().to_path_buf(),
        });
        let key = "tables/o/o.parquet";
        store
            .put("processed", key, Bytes::from_static(b"abc"), "text/plain")
            .await?;

        let on_disk = tmp.path().join("processed").join(key);
        assert_eq!(std::fs::read(on_disk)?, b"abc");
        assert_eq!(&store.get("processed", key).await?[..], b"abc");
        assert_eq!(
            store.uri("processed", "k"),
            format!("file://{}/processed/k", tmp.path().display())
        );
        Ok(())
    }

    #[test]
    fn test_s3_uri() {
        let store = StorageProvider::new(StorageConfig::S3(S3Config::default()));
        assert_eq!(store.uri("bkt", "tables/x/x.parquet"), "s3://bkt/tables/x/x.parquet");
    }
}
