//! # Core Configuration Module
//!
//! Provides configuration management for the zimsync core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance holding every bridge and setting the sync engine needs. It
//! enforces fail-fast validation so that a missing capability is reported
//! when the host wires the core together, not halfway through a sync run.
//!
//! ## Required Dependencies
//!
//! - `LocalMediaSource` - The media library to mirror
//! - `RemoteConfigStore` - Where remote targets are persisted
//!
//! ## Optional Dependencies
//!
//! - `ObjectStoreFactory` - Builds store clients (the service layer supplies
//!   the S3 client when `desktop-shims` is enabled)
//! - `NetworkMonitor` - Evaluates the network constraints before a run
//! - `PowerMonitor` - Evaluates the low battery constraint before a run
//!
//! When the `desktop-shims` feature is enabled, a `DirectoryMediaSource` over
//! the configured media roots and a `JsonRemoteConfigStore` inside the data
//! directory are injected if not provided.
//!
//! ## Usage
//!
//! ### Desktop Defaults
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .data_dir("/home/me/.local/share/zimsync")
//!     .media_root("/home/me/Pictures")
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ### Custom Bridges
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .media_source(Arc::new(MediaStoreSource::new(context)))
//!     .remote_config_store(Arc::new(DataStoreRemotes::new(context)))
//!     .network_monitor(Arc::new(ConnectivityMonitor::new(context)))
//!     .power_monitor(Arc::new(BatteryMonitor::new(context)))
//!     .sync_timeout_secs(2 * 60 * 60)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    LocalMediaSource, NetworkMonitor, ObjectStoreFactory, PowerMonitor, RemoteConfigStore,
    TaskConstraints,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound for a whole sync run.
pub const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 60 * 60;

/// Longest accepted sync timeout.
pub const MAX_SYNC_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Default capacity of the event bus.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Core configuration.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Directory for engine state (remote configs with the desktop store)
    pub data_dir: Option<PathBuf>,

    /// Root directories scanned by the desktop media source
    pub media_roots: Vec<PathBuf>,

    /// Local media library (required)
    pub media_source: Arc<dyn LocalMediaSource>,

    /// Persistent remote configurations (required)
    pub remote_config_store: Arc<dyn RemoteConfigStore>,

    /// Object store client factory (optional at this layer)
    pub object_store_factory: Option<Arc<dyn ObjectStoreFactory>>,

    /// Network connectivity monitor (optional)
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    /// Battery monitor (optional)
    pub power_monitor: Option<Arc<dyn PowerMonitor>>,

    /// Conditions checked before a sync run starts
    pub constraints: TaskConstraints,

    /// Upper bound for one sync run, diff included
    pub sync_timeout: Duration,

    /// Capacity of the broadcast event bus
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("data_dir", &self.data_dir)
            .field("media_roots", &self.media_roots)
            .field("media_source", &"LocalMediaSource { ... }")
            .field("remote_config_store", &"RemoteConfigStore { ... }")
            .field(
                "object_store_factory",
                &self
                    .object_store_factory
                    .as_ref()
                    .map(|_| "ObjectStoreFactory { ... }"),
            )
            .field(
                "network_monitor",
                &self
                    .network_monitor
                    .as_ref()
                    .map(|_| "NetworkMonitor { ... }"),
            )
            .field(
                "power_monitor",
                &self.power_monitor.as_ref().map(|_| "PowerMonitor { ... }"),
            )
            .field("constraints", &self.constraints)
            .field("sync_timeout", &self.sync_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The sync timeout is within (0, 24h]
    /// - The event buffer holds at least one event
    /// - Constraints are consistent (unmetered implies network)
    pub fn validate(&self) -> Result<()> {
        if self.sync_timeout.is_zero() {
            return Err(Error::Config(
                "Sync timeout must be greater than 0 seconds".to_string(),
            ));
        }

        if self.sync_timeout > Duration::from_secs(MAX_SYNC_TIMEOUT_SECS) {
            return Err(Error::Config(format!(
                "Sync timeout exceeds maximum of {} seconds",
                MAX_SYNC_TIMEOUT_SECS
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.constraints.requires_unmetered && !self.constraints.requires_network {
            return Err(Error::Config(
                "Unmetered network required but network is not. \
                 Set requires_network or drop requires_unmetered."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn media_source_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "LocalMediaSource".to_string(),
        message: "LocalMediaSource implementation is required to enumerate local media. \
                 Desktop: enable the 'desktop-shims' feature to use DirectoryMediaSource. \
                 Android: inject a MediaStore-backed source. \
                 iOS: inject a PhotoKit-backed source."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn remote_config_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "RemoteConfigStore".to_string(),
        message: "RemoteConfigStore implementation is required to persist remote targets. \
                 Desktop: enable the 'desktop-shims' feature to use JsonRemoteConfigStore. \
                 Mobile: inject a store over the platform key/value storage."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_media_source(media_roots: &[PathBuf]) -> Result<Arc<dyn LocalMediaSource>> {
    use bridge_desktop::DirectoryMediaSource;

    let source = if media_roots.is_empty() {
        DirectoryMediaSource::with_default_roots()
    } else {
        DirectoryMediaSource::new(media_roots.to_vec())
    };
    if source.roots().is_empty() {
        return Err(Error::Config(
            "No media roots configured and the platform defines no picture or video \
             directory. Use .media_root() to set one."
                .to_string(),
        ));
    }
    Ok(Arc::new(source))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_media_source(_media_roots: &[PathBuf]) -> Result<Arc<dyn LocalMediaSource>> {
    Err(media_source_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_remote_config_store(
    data_dir: Option<&PathBuf>,
) -> Result<Arc<dyn RemoteConfigStore>> {
    use bridge_desktop::{default_data_dir, JsonRemoteConfigStore};

    let dir = data_dir.cloned().unwrap_or_else(default_data_dir);
    Ok(Arc::new(JsonRemoteConfigStore::in_directory(&dir)))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_remote_config_store(
    _data_dir: Option<&PathBuf>,
) -> Result<Arc<dyn RemoteConfigStore>> {
    Err(remote_config_store_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    data_dir: Option<PathBuf>,
    media_roots: Vec<PathBuf>,
    media_source: Option<Arc<dyn LocalMediaSource>>,
    remote_config_store: Option<Arc<dyn RemoteConfigStore>>,
    object_store_factory: Option<Arc<dyn ObjectStoreFactory>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    power_monitor: Option<Arc<dyn PowerMonitor>>,
    constraints: Option<TaskConstraints>,
    sync_timeout_secs: Option<u64>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the data directory.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().data_dir("/var/lib/zimsync");
    /// ```
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Adds a media root for the desktop media source.
    ///
    /// Ignored when a media source is injected explicitly.
    pub fn media_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.media_roots.push(path.into());
        self
    }

    /// Sets the local media source (required unless `desktop-shims` is enabled).
    pub fn media_source(mut self, source: Arc<dyn LocalMediaSource>) -> Self {
        self.media_source = Some(source);
        self
    }

    /// Sets the remote configuration store (required unless `desktop-shims`
    /// is enabled).
    pub fn remote_config_store(mut self, store: Arc<dyn RemoteConfigStore>) -> Self {
        self.remote_config_store = Some(store);
        self
    }

    /// Sets the object store factory.
    pub fn object_store_factory(mut self, factory: Arc<dyn ObjectStoreFactory>) -> Self {
        self.object_store_factory = Some(factory);
        self
    }

    /// Sets the network monitor (optional).
    ///
    /// Without one, network constraints cannot be evaluated and are treated
    /// as satisfied.
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Sets the power monitor (optional).
    ///
    /// Without one, the low battery constraint is treated as satisfied.
    pub fn power_monitor(mut self, monitor: Arc<dyn PowerMonitor>) -> Self {
        self.power_monitor = Some(monitor);
        self
    }

    /// Sets the run constraints.
    ///
    /// Default: network required, battery not low.
    pub fn constraints(mut self, constraints: TaskConstraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// Sets the timeout for one sync run in seconds.
    ///
    /// Default: 3600
    pub fn sync_timeout_secs(mut self, secs: u64) -> Self {
        self.sync_timeout_secs = Some(secs);
        self
    }

    /// Sets the event bus capacity.
    ///
    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - `CapabilityMissing` when a required bridge is absent and no desktop
    ///   default is available
    /// - `Config` when a setting is out of range or inconsistent
    pub fn build(self) -> Result<CoreConfig> {
        let media_source = match self.media_source {
            Some(source) => source,
            None => provide_default_media_source(&self.media_roots)?,
        };

        let remote_config_store = match self.remote_config_store {
            Some(store) => store,
            None => provide_default_remote_config_store(self.data_dir.as_ref())?,
        };

        let config = CoreConfig {
            data_dir: self.data_dir,
            media_roots: self.media_roots,
            media_source,
            remote_config_store,
            object_store_factory: self.object_store_factory,
            network_monitor: self.network_monitor,
            power_monitor: self.power_monitor,
            constraints: self.constraints.unwrap_or_default(),
            sync_timeout: Duration::from_secs(
                self.sync_timeout_secs.unwrap_or(DEFAULT_SYNC_TIMEOUT_SECS),
            ),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
