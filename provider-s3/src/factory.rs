//! Factory turning stored remote configurations into S3 clients.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::{
    error::Result as BridgeResult,
    object_store::{ObjectStoreFactory, RemoteObjectStore},
    storage::RemoteConfig,
};
use core_runtime::logging::redact_if_sensitive;
use tracing::{debug, instrument};

use crate::client::S3ObjectStore;
use crate::error::{Result, S3Error};

/// Creates one [`S3ObjectStore`] per remote configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3StoreFactory;

impl S3StoreFactory {
    pub fn new() -> Self {
        Self
    }

    /// Rejects configurations that can never produce a working client.
    ///
    /// Credentials and bucket existence are checked by the server on first use.
    pub fn validate(config: &RemoteConfig) -> Result<()> {
        let url = config.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(S3Error::InvalidConfig(format!(
                "endpoint '{}' must start with http:// or https://",
                redact_if_sensitive("url", url)
            )));
        }
        let host = url
            .split_once("://")
            .map(|(_, rest)| rest.split('/').next().unwrap_or(""))
            .unwrap_or("");
        if host.is_empty() {
            return Err(S3Error::InvalidConfig("endpoint has no host".to_string()));
        }
        if config.bucket.trim().is_empty() {
            return Err(S3Error::InvalidConfig("bucket name is empty".to_string()));
        }
        if config.access_key.is_empty() || config.secret_key.is_empty() {
            return Err(S3Error::InvalidConfig(
                "access key and secret key are required".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStoreFactory for S3StoreFactory {
    #[instrument(skip(self, config), fields(remote_id = %config.id, bucket = %config.bucket))]
    async fn connect(&self, config: &RemoteConfig) -> BridgeResult<Arc<dyn RemoteObjectStore>> {
        Self::validate(config)?;
        debug!(
            endpoint = %redact_if_sensitive("url", &config.url),
            prefix = config.prefix.as_deref().unwrap_or(""),
            "Connecting to object store"
        );

        let store = S3ObjectStore::connect(config).await?;
        Ok(Arc::new(store))
    }
}
