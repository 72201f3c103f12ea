//! Synchronization primitives.
//!
//! Async-aware locks and channels from `tokio::sync`, plus the
//! [`CancellationToken`] that hosts hand to a sync run. A run checks the token
//! between items; cancelling it never interrupts an upload that is already in
//! flight.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{watch, Mutex};
//!
//! async fn example() {
//!     let counter = Mutex::new(0u64);
//!     *counter.lock().await += 1;
//!
//!     let (tx, rx) = watch::channel(0u64);
//!     tx.send_replace(*counter.lock().await);
//!     assert_eq!(*rx.borrow(), 1);
//! }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard, Semaphore, SemaphorePermit,
};

pub use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};
