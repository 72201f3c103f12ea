//! Runtime entry points.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a fresh current-thread runtime.
///
/// Used by the `#[core_async::test]` / `#[core_async::main]` macros and by
/// synchronous call sites that need to drive a bridge future once.
///
/// # Panics
///
/// Panics if the Tokio runtime cannot be constructed (for example when the
/// process is out of file descriptors).
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on: failed to build Tokio runtime")
        .block_on(future)
}
