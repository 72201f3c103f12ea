//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the zimsync crates:
//! - Logging and tracing setup, with redaction of credentials
//! - `CoreConfig`, the validated set of injected capabilities
//! - The event bus that carries diff and sync activity to the host
//!
//! Nothing here talks to a remote. The sync engine (`core-sync`) and the
//! object store providers build on these pieces.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, DiffEvent, EventBus, EventStream, RemoteEvent, SyncEvent};
pub use logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};
