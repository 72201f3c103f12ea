//! Remote Configuration Storage
//!
//! Remote targets (endpoint, bucket, credentials) are persisted by the host in
//! whatever key/value store it already has. The core only needs CRUD access.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BridgeError, Result};

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a remote configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteConfigId(Uuid);

impl RemoteConfigId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an ID from its string form.
    ///
    /// # Errors
    ///
    /// Returns `OperationFailed` if the string is not a valid UUID.
    pub fn from_string(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid remote id '{}': {}", s, e)))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RemoteConfigId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RemoteConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RemoteConfigId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// Remote configuration
// ============================================================================

/// Connection settings for one S3-compatible target.
///
/// `Debug` never prints the credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub id: RemoteConfigId,
    /// Display name shown by the host
    pub name: String,
    /// Endpoint URL, e.g. `https://s3.eu-central-1.amazonaws.com` or a MinIO host
    pub url: String,
    pub bucket: String,
    /// Key prefix under which objects are stored; `None` means bucket root
    #[serde(default)]
    pub prefix: Option<String>,
    /// Signing region; `None` lets the provider pick its default
    #[serde(default)]
    pub region: Option<String>,
    pub access_key: String,
    pub secret_key: String,
}

impl RemoteConfig {
    /// Create a configuration with a fresh id and no prefix or region.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        bucket: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            id: RemoteConfigId::new(),
            name: name.into(),
            url: url.into(),
            bucket: bucket.into(),
            prefix: None,
            region: None,
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("url", &self.url)
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("region", &self.region)
            .field("access_key", &"[REDACTED]")
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Persistent store of remote configurations.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::{RemoteConfig, RemoteConfigStore};
///
/// async fn add_minio(store: &dyn RemoteConfigStore) -> Result<()> {
///     let config = RemoteConfig::new("nas", "http://nas.local:9000", "photos", "key", "secret");
///     store.save(&config).await
/// }
/// ```
#[async_trait]
pub trait RemoteConfigStore: Send + Sync {
    /// Load one configuration, `None` if it does not exist
    async fn get(&self, id: RemoteConfigId) -> Result<Option<RemoteConfig>>;

    /// All configurations, in insertion order
    async fn list(&self) -> Result<Vec<RemoteConfig>>;

    /// Insert or replace by id
    async fn save(&self, config: &RemoteConfig) -> Result<()>;

    /// Remove a configuration. Deleting an unknown id is not an error.
    async fn delete(&self, id: RemoteConfigId) -> Result<()>;
}
