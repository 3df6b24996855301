//! Static asset storage for texture images (local filesystem or S3).

use std::sync::Arc;

use aq_common::{AqError, AqResult};
use bytes::Bytes;
use object_store::{
    aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory, path::Path, ObjectStore,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Configuration for an S3-compatible bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Use "us-east-1" for MinIO
    pub region: String,
    pub allow_http: bool,
}

/// Writes assets below a root and reports the URI each one is reachable at.
pub struct AssetStore {
    store: Arc<dyn ObjectStore>,
    root_uri: String,
}

fn storage_error(context: &str, path: &str, err: object_store::Error) -> AqError {
    AqError::Persistence(format!("{} {}: {}", context, path, err))
}

impl AssetStore {
    /// Store assets in a local directory, creating it if needed.
    pub fn local(root: impl AsRef<std::path::Path>) -> AqResult<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| {
            AqError::Persistence(format!("Failed to create {}: {}", root.display(), e))
        })?;
        let store = LocalFileSystem::new_with_prefix(root)
            .map_err(|e| storage_error("Failed to open", &root.display().to_string(), e))?;

        Ok(Self {
            store: Arc::new(store),
            root_uri: root.display().to_string().trim_end_matches('/').to_string(),
        })
    }

    pub fn s3(config: &S3Config) -> AqResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_region(&config.region);

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| AqError::Persistence(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self {
            store: Arc::new(store),
            root_uri: format!("s3://{}", config.bucket),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            root_uri: "memory://".to_string(),
        }
    }

    /// URI of an asset path relative to the root.
    pub fn uri(&self, path: &str) -> String {
        if self.root_uri.ends_with('/') {
            format!("{}{}", self.root_uri, path)
        } else {
            format!("{}/{}", self.root_uri, path)
        }
    }

    /// Write bytes and return the asset's URI.
    #[instrument(skip(self, data), fields(path = %path))]
    pub async fn put(&self, path: &str, data: Bytes) -> AqResult<String> {
        let location = Path::from(path);
        debug!(size = data.len(), "Writing asset");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| storage_error("Failed to write", path, e))?;

        Ok(self.uri(path))
    }
}
