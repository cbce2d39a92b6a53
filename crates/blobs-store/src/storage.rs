//! Where block bytes live: memory, a local directory, or an S3 bucket.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};

use crate::error::{BlobStoreError, Result};

/// Backend block bytes are written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    /// Lost on exit
    #[default]
    Memory,

    Local {
        /// Created if missing
        path: PathBuf,
    },

    /// Any S3-compatible service; the bucket must already exist
    S3 {
        /// plain `http://` endpoints are allowed
        endpoint: String,
        access_key: String,
        secret_key: String,
        bucket: String,
        /// `us-east-1` when unset
        region: Option<String>,
    },
}

const BLOCK_PREFIX: &str = "blocks/";
const DEFAULT_S3_REGION: &str = "us-east-1";

/// Block bytes on one of the configured backends
#[derive(Debug, Clone)]
pub(crate) struct Storage {
    inner: Arc<dyn ObjectStore>,
}

fn invalid(e: object_store::Error) -> BlobStoreError {
    BlobStoreError::InvalidConfig(e.to_string())
}

/// Build an S3 client and make sure its bucket exists
async fn open_s3(
    endpoint: &str,
    access_key: &str,
    secret_key: &str,
    bucket: &str,
    region: Option<&str>,
) -> Result<Arc<dyn ObjectStore>> {
    let store = AmazonS3Builder::new()
        .with_endpoint(endpoint)
        .with_access_key_id(access_key)
        .with_secret_access_key(secret_key)
        .with_bucket_name(bucket)
        .with_region(region.unwrap_or(DEFAULT_S3_REGION))
        .with_allow_http(endpoint.starts_with("http://"))
        .build()
        .map_err(invalid)?;

    // listing one entry is the cheapest probe for a missing bucket
    let probe = store.list(None).try_next().await;
    match probe {
        Ok(_) => Ok(Arc::new(store)),
        Err(object_store::Error::NotFound { .. }) => {
            Err(BlobStoreError::BucketNotFound(bucket.to_string()))
        }
        Err(e) if e.to_string().contains("NoSuchBucket") => {
            Err(BlobStoreError::BucketNotFound(bucket.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

impl Storage {
    pub async fn new(config: &ObjectStoreConfig) -> Result<Self> {
        let inner: Arc<dyn ObjectStore> = match config {
            ObjectStoreConfig::Memory => Arc::new(InMemory::new()),
            ObjectStoreConfig::Local { path } => {
                tokio::fs::create_dir_all(path).await?;
                Arc::new(LocalFileSystem::new_with_prefix(path).map_err(invalid)?)
            }
            ObjectStoreConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region,
            } => {
                open_s3(
                    endpoint,
                    access_key,
                    secret_key,
                    bucket,
                    region.as_deref(),
                )
                .await?
            }
        };
        Ok(Self { inner })
    }

    fn block_path(id: &str) -> ObjectPath {
        ObjectPath::from(format!("{}{}", BLOCK_PREFIX, id))
    }

    pub async fn put_block(&self, id: &str, data: Bytes) -> Result<()> {
        self.inner.put(&Self::block_path(id), data.into()).await?;
        Ok(())
    }

    pub async fn get_block(&self, id: &str) -> Result<Option<Bytes>> {
        match self.inner.get(&Self::block_path(id)).await {
            Ok(result) => Ok(Some(result.bytes().await?)),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn has_block(&self, id: &str) -> Result<bool> {
        match self.inner.head(&Self::block_path(id)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Every block id under the `blocks/` prefix
    pub async fn list_block_ids(&self) -> Result<Vec<String>> {
        let prefix = ObjectPath::from(BLOCK_PREFIX);
        let listed: Vec<_> = self.inner.list(Some(&prefix)).try_collect().await?;
        let ids = listed
            .iter()
            .filter_map(|meta| meta.location.as_ref().strip_prefix(BLOCK_PREFIX))
            .map(str::to_string)
            .collect();
        Ok(ids)
    }
}
