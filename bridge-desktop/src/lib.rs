//! # Desktop Bridge Implementations
//!
//! Default implementations of the bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `LocalMediaSource` using a walk over picture/video directories (`tokio::fs`)
//! - `RemoteConfigStore` backed by a JSON document in the platform data directory
//! - `RemoteConfigStore` held in memory, for tests and throwaway sessions
//! - `NetworkMonitor` using a TCP reachability probe
//!
//! No `PowerMonitor` is provided: desktop hosts without a battery leave it out
//! and the low-battery constraint is skipped.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DirectoryMediaSource, JsonRemoteConfigStore};
//! use std::path::PathBuf;
//!
//! let media = DirectoryMediaSource::new(vec![PathBuf::from("/home/me/Pictures")]);
//! let remotes = JsonRemoteConfigStore::with_default_location();
//! ```

mod config_store;
mod media;
mod network;

pub use config_store::{default_data_dir, JsonRemoteConfigStore, MemoryRemoteConfigStore};
pub use media::{media_content_type, DirectoryMediaSource};
pub use network::DesktopNetworkMonitor;
