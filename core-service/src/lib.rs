//! Core service façade and bootstrap helpers.
//!
//! This crate wires a validated [`CoreConfig`] into the sync engine and
//! exposes the operations a host UI needs: manage remotes, preview a diff,
//! start and follow sync runs. Desktop apps typically enable the
//! `desktop-shims` feature, which supplies the S3 client factory from
//! `provider-s3` and the directory and JSON adapters from `bridge-desktop`.
//!
//! ```rust,ignore
//! let service = CoreService::new(CoreConfig::builder().media_root("/home/me/Pictures").build()?)?;
//!
//! let remote = RemoteConfig::new("nas", "http://nas:9000", "photos", key, secret);
//! let remote_id = service.add_remote(remote).await?;
//!
//! let preview = service.create_diff(remote_id).await?;
//! println!("{} items ({} bytes) to upload", preview.missing_count, preview.missing_bytes);
//!
//! let job_id = service.start_sync(remote_id).await?;
//! let job = service.wait_for_sync(job_id).await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{
    object_store::ObjectStoreFactory,
    storage::{RemoteConfig, RemoteConfigId, RemoteConfigStore},
};
use core_async::sync::watch;
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, RemoteEvent};
use core_sync::{
    DiffSummary, SyncConfig, SyncCoordinator, SyncError, SyncJob, SyncJobId,
};
use tracing::{info, instrument};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    remotes: Arc<dyn RemoteConfigStore>,
    event_bus: Arc<EventBus>,
    coordinator: SyncCoordinator,
}

impl CoreService {
    /// Create a service from a built configuration.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityMissing` when no `ObjectStoreFactory` was injected
    /// and the `desktop-shims` feature is disabled.
    pub fn new(config: CoreConfig) -> Result<Self> {
        let store_factory = match config.object_store_factory.clone() {
            Some(factory) => factory,
            None => provide_default_store_factory()?,
        };

        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));
        let sync_config = SyncConfig {
            sync_timeout: config.sync_timeout,
            constraints: config.constraints.clone(),
            ..SyncConfig::default()
        };

        let mut coordinator = SyncCoordinator::new(
            sync_config,
            Arc::clone(&event_bus),
            Arc::clone(&config.media_source),
            Arc::clone(&config.remote_config_store),
            store_factory,
        );
        if let Some(monitor) = config.network_monitor.clone() {
            coordinator = coordinator.with_network_monitor(monitor);
        }
        if let Some(monitor) = config.power_monitor.clone() {
            coordinator = coordinator.with_power_monitor(monitor);
        }

        Ok(Self {
            remotes: config.remote_config_store,
            event_bus,
            coordinator,
        })
    }

    /// Build a service with every desktop default.
    #[cfg(feature = "desktop-shims")]
    pub fn bootstrap_desktop() -> Result<Self> {
        Self::new(CoreConfig::builder().build()?)
    }

    // ------------------------------------------------------------------------
    // Remotes
    // ------------------------------------------------------------------------

    /// Store a remote, replacing any existing one with the same id.
    #[instrument(skip(self, remote), fields(remote_id = %remote.id))]
    pub async fn add_remote(&self, remote: RemoteConfig) -> Result<RemoteConfigId> {
        validate_remote(&remote)?;
        self.remotes.save(&remote).await?;

        self.event_bus
            .emit(CoreEvent::Remote(RemoteEvent::Saved {
                remote_id: remote.id.to_string(),
                name: remote.name.clone(),
            }))
            .ok();
        info!(name = %remote.name, bucket = %remote.bucket, "Saved remote");
        Ok(remote.id)
    }

    pub async fn list_remotes(&self) -> Result<Vec<RemoteConfig>> {
        Ok(self.remotes.list().await?)
    }

    pub async fn get_remote(&self, remote_id: RemoteConfigId) -> Result<RemoteConfig> {
        self.remotes.get(remote_id).await?.ok_or_else(|| {
            CoreError::Sync(SyncError::RemoteNotFound {
                remote_id: remote_id.to_string(),
            })
        })
    }

    /// Delete a remote. Refused while a sync run for it is active.
    #[instrument(skip(self))]
    pub async fn remove_remote(&self, remote_id: RemoteConfigId) -> Result<()> {
        if self.coordinator.is_sync_active(remote_id).await {
            return Err(SyncError::SyncInProgress {
                remote_id: remote_id.to_string(),
            }
            .into());
        }

        self.remotes.delete(remote_id).await?;
        self.event_bus
            .emit(CoreEvent::Remote(RemoteEvent::Removed {
                remote_id: remote_id.to_string(),
            }))
            .ok();
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------------

    /// Preview what a sync run would upload.
    pub async fn create_diff(&self, remote_id: RemoteConfigId) -> Result<DiffSummary> {
        let diff = self.coordinator.compute_diff(remote_id).await?;
        Ok(diff.summary())
    }

    pub async fn start_sync(&self, remote_id: RemoteConfigId) -> Result<SyncJobId> {
        Ok(self.coordinator.start_sync(remote_id).await?)
    }

    pub async fn cancel_sync(&self, job_id: SyncJobId) -> Result<()> {
        Ok(self.coordinator.cancel_sync(job_id).await?)
    }

    pub async fn sync_status(&self, job_id: SyncJobId) -> Result<SyncJob> {
        Ok(self.coordinator.get_status(job_id).await?)
    }

    pub async fn watch_sync(&self, job_id: SyncJobId) -> Result<watch::Receiver<SyncJob>> {
        Ok(self.coordinator.subscribe(job_id).await?)
    }

    pub async fn wait_for_sync(&self, job_id: SyncJobId) -> Result<SyncJob> {
        Ok(self.coordinator.wait_for_completion(job_id).await?)
    }

    pub async fn is_sync_active(&self, remote_id: RemoteConfigId) -> bool {
        self.coordinator.is_sync_active(remote_id).await
    }

    /// Runs against a remote since startup, most recent first.
    pub async fn sync_history(&self, remote_id: RemoteConfigId) -> Vec<SyncJob> {
        self.coordinator.list_jobs(remote_id).await
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }
}

fn validate_remote(remote: &RemoteConfig) -> Result<()> {
    let required = [
        ("name", remote.name.as_str()),
        ("url", remote.url.as_str()),
        ("bucket", remote.bucket.as_str()),
        ("access_key", remote.access_key.as_str()),
        ("secret_key", remote.secret_key.as_str()),
    ];

    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(CoreError::InvalidInput {
                field: field.to_string(),
                message: "must not be empty".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_store_factory() -> Result<Arc<dyn ObjectStoreFactory>> {
    Ok(Arc::new(provider_s3::S3StoreFactory::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_store_factory() -> Result<Arc<dyn ObjectStoreFactory>> {
    Err(CoreError::CapabilityMissing {
        capability: "ObjectStoreFactory".to_string(),
        message: "ObjectStoreFactory implementation is required to reach remotes. \
                 Desktop: enable the 'desktop-shims' feature to use the S3 client. \
                 Mobile: inject provider_s3::S3StoreFactory or a platform client."
            .to_string(),
    })
}
