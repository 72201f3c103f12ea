//! # Host Bridge Traits
//!
//! Capabilities the sync engine needs from its host, expressed as traits.
//!
//! ## Overview
//!
//! The core never touches a filesystem, a media database or an HTTP client
//! directly. Each host (desktop, Android, iOS) ships adapters for the traits
//! below and injects them through `core_runtime::config::CoreConfigBuilder`.
//!
//! ## Traits
//!
//! ### Sync endpoints
//! - [`LocalMediaSource`](media::LocalMediaSource) - Enumerate local photos/videos and open their streams
//! - [`RemoteObjectStore`](object_store::RemoteObjectStore) - List and put objects on an S3-compatible target
//! - [`ObjectStoreFactory`](object_store::ObjectStoreFactory) - Build a store client from a [`RemoteConfig`]
//!
//! ### Persistence
//! - [`RemoteConfigStore`](storage::RemoteConfigStore) - CRUD over configured remotes
//!
//! ### Platform Integration
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity and metered network detection
//! - [`PowerMonitor`](background::PowerMonitor) - Low battery detection for run constraints
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! Missing required capabilities are reported when the core is configured, not
//! when a sync run first needs them:
//!
//! ```ignore
//! let media_source = self.media_source.ok_or_else(|| Error::CapabilityMissing {
//!     capability: "LocalMediaSource".to_string(),
//!     message: "No media source provided. \
//!              Desktop: enable the desktop-shims feature. \
//!              Mobile: inject the platform media adapter.".to_string(),
//! })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits return [`BridgeError`](error::BridgeError). Adapters
//! should convert platform errors into it with enough context (object key,
//! file path, endpoint) for the message to be shown to a user verbatim.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared across the
//! tasks a host spawns for sync runs.

pub mod background;
pub mod error;
pub mod log;
pub mod media;
pub mod network;
pub mod object_store;
pub mod storage;

pub use error::BridgeError;

pub use background::{PowerMonitor, TaskConstraints};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{DynAsyncRead, LocalItem, LocalMediaSource};
pub use network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use object_store::{ObjectStoreFactory, RemoteObject, RemoteObjectStore};
pub use storage::{RemoteConfig, RemoteConfigId, RemoteConfigStore};
