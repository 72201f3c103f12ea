//! Async runtime façade for the zimsync workspace.
//!
//! Every `core-*`, `bridge-*` and `provider-*` crate goes through this crate
//! instead of naming Tokio directly, so the executor can be swapped in one
//! place. Today the implementation is Tokio on native targets.
//!
//! # Modules
//!
//! - `task`: spawning sync runs off the caller's control path
//! - `time`: sleeps and timeouts for whole-run deadlines
//! - `sync`: locks, channels and the cancellation token handed to runs
//! - `io`: the `AsyncRead` family used for media streams
//! - `runtime`: `block_on` for synchronous entry points
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::CancellationToken;
//! use core_async::task;
//!
//! async fn example() {
//!     let token = CancellationToken::new();
//!     let child = token.clone();
//!
//!     let handle = task::spawn(async move {
//!         child.cancelled().await;
//!         "stopped"
//!     });
//!
//!     token.cancel();
//!     assert_eq!(handle.await.unwrap(), "stopped");
//! }
//! ```

pub use core_async_macros::{main, test};

pub mod io;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
