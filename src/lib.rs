//! Workspace umbrella crate.
//!
//! Host applications can depend on `zimsync-workspace` and get the service
//! façade plus the sync engine types without wiring each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(feature = "desktop-shims")]
pub use core_sync as sync;
