//! Task spawning.
//!
//! Sync runs are long-lived and mostly waiting on network I/O, so hosts spawn
//! them as tasks rather than awaiting them inline on a UI or control path.

pub use tokio::task::{spawn_blocking, yield_now, JoinError, JoinHandle};

/// Spawns a future onto the current runtime.
///
/// The returned handle can be awaited for the task's output or dropped to
/// detach the task.
///
/// # Examples
///
/// ```rust
/// use core_async::task::spawn;
///
/// # async fn example() {
/// let handle = spawn(async { 42 });
/// assert_eq!(handle.await.unwrap(), 42);
/// # }
/// ```
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Result type for joined tasks.
pub type Result<T> = std::result::Result<T, JoinError>;
