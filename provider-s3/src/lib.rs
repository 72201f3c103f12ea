//! # S3 Provider
//!
//! Implements `RemoteObjectStore` for Amazon S3 and S3-compatible servers
//! (MinIO, Garage, Backblaze B2, Wasabi).
//!
//! ## Overview
//!
//! This module provides:
//! - Paginated listing of the objects under a remote's key prefix
//! - Single-request uploads with a declared content length
//! - `S3StoreFactory`, which validates a `RemoteConfig` and builds a client
//!
//! Keys are `<prefix>/<item name>`; see [`KeyPrefix`].

pub mod client;
pub mod error;
pub mod factory;
pub mod key;

pub use client::{S3ObjectStore, DEFAULT_REGION};
pub use error::{Result, S3Error};
pub use factory::S3StoreFactory;
pub use key::KeyPrefix;
