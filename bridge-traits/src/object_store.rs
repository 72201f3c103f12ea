//! Remote Object Store Abstraction
//!
//! The slice of an S3-compatible API the sync engine needs: list what is
//! already there and put one object at a time.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{error::Result, media::DynAsyncRead, storage::RemoteConfig};

/// An object already present at the remote.
///
/// Snapshots are produced fresh for every listing and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Object name relative to the configured prefix
    pub name: String,
    /// Size in bytes when the listing reports it
    pub size: Option<u64>,
}

impl RemoteObject {
    pub fn new(name: impl Into<String>, size: Option<u64>) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Remote object store client
///
/// One instance is bound to a single endpoint, bucket and prefix.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::object_store::RemoteObjectStore;
///
/// async fn remote_names(store: &dyn RemoteObjectStore) -> Result<Vec<String>> {
///     let objects = store.list_objects().await?;
///     Ok(objects.into_iter().map(|o| o.name).collect())
/// }
/// ```
#[async_trait]
pub trait RemoteObjectStore: Send + Sync {
    /// List every object under the configured prefix, following pagination
    /// until the listing is complete.
    async fn list_objects(&self) -> Result<Vec<RemoteObject>>;

    /// Upload one object.
    ///
    /// The store consumes `stream` and drops it before returning, whatever the
    /// result. `size` is the declared content length; implementations may
    /// reject a stream that yields a different number of bytes.
    async fn put_object(
        &self,
        stream: Box<DynAsyncRead>,
        name: &str,
        content_type: &str,
        size: u64,
    ) -> Result<()>;
}

/// Creates object store clients from remote configurations.
#[async_trait]
pub trait ObjectStoreFactory: Send + Sync {
    /// Build a client for `config`.
    ///
    /// This validates the configuration and prepares credentials; it does not
    /// need to contact the remote.
    async fn connect(&self, config: &RemoteConfig) -> Result<Arc<dyn RemoteObjectStore>>;
}
