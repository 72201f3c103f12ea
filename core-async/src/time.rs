//! Time primitives.
//!
//! `timeout` bounds a whole sync run; the host decides the deadline.

pub use tokio::time::{error::Elapsed, interval, sleep, sleep_until, timeout, Interval, Sleep, Timeout};

pub use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
