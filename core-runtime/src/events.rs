//! # Event Bus System
//!
//! Typed broadcast of engine activity using `tokio::sync::broadcast`, so a UI
//! (or a notification, or a log shipper) can follow diffs and sync runs
//! without polling the coordinator.
//!
//! ## Overview
//!
//! - **Event Types**: `CoreEvent` wraps per-domain enums (`DiffEvent`,
//!   `SyncEvent`, `RemoteEvent`)
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Receiver wrapper with optional filtering
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Sync(SyncEvent::Cancelled {
//!         job_id: "job-1".to_string(),
//!         items_transferred: 3,
//!         bytes_transferred: 4096,
//!     }))
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Sync cancelled");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind and missed `n`
//!   events. Progress events are the usual casualty; the terminal event of a
//!   run is still delivered if the subscriber keeps reading.
//! - **`RecvError::Closed`**: all senders were dropped, the core shut down.
//!
//! `emit` fails only when nobody is subscribed, which publishers ignore.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

use crate::config::DEFAULT_EVENT_BUFFER_SIZE;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Diff computation events
    Diff(DiffEvent),
    /// Sync run lifecycle events
    Sync(SyncEvent),
    /// Remote configuration changes
    Remote(RemoteEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Diff(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Remote(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Diff(DiffEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::Cancelled { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::Started { .. }) => EventSeverity::Info,
            CoreEvent::Diff(DiffEvent::Computed { .. }) => EventSeverity::Info,
            CoreEvent::Remote(_) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::Progress { .. }) => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Diff Events
// ============================================================================

/// Events emitted when the local/remote difference is computed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DiffEvent {
    Computed {
        remote_id: String,
        /// Objects already at the remote
        remote_count: u64,
        /// Local items eligible for upload
        local_count: u64,
        /// Local items missing at the remote
        missing_count: u64,
        /// Bytes that a sync run would upload
        missing_bytes: u64,
    },
    Failed {
        remote_id: String,
        message: String,
    },
}

impl DiffEvent {
    fn description(&self) -> &str {
        match self {
            DiffEvent::Computed { .. } => "Diff computed",
            DiffEvent::Failed { .. } => "Diff failed",
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events covering one sync run from start to outcome.
///
/// Counters are cumulative for the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// Run accepted and spawned.
    Started {
        job_id: String,
        remote_id: String,
    },
    /// One more item fully uploaded.
    Progress {
        job_id: String,
        items_transferred: u64,
        bytes_transferred: u64,
        /// Items to upload in this run
        total_items: u64,
        /// Bytes to upload in this run
        total_bytes: u64,
        /// Byte-based progress (0-100)
        percent: u8,
    },
    /// Every missing item was uploaded.
    Completed {
        job_id: String,
        items_transferred: u64,
        bytes_transferred: u64,
        duration_secs: u64,
    },
    /// The run stopped at the first error.
    Failed {
        job_id: String,
        /// Error message, suitable for display verbatim
        message: String,
        items_transferred: u64,
        bytes_transferred: u64,
    },
    /// The host cancelled the run between two items.
    Cancelled {
        job_id: String,
        items_transferred: u64,
        bytes_transferred: u64,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync started",
            SyncEvent::Progress { .. } => "Sync in progress",
            SyncEvent::Completed { .. } => "Sync completed successfully",
            SyncEvent::Failed { .. } => "Sync failed",
            SyncEvent::Cancelled { .. } => "Sync cancelled",
        }
    }

    /// Job the event belongs to.
    pub fn job_id(&self) -> &str {
        match self {
            SyncEvent::Started { job_id, .. }
            | SyncEvent::Progress { job_id, .. }
            | SyncEvent::Completed { job_id, .. }
            | SyncEvent::Failed { job_id, .. }
            | SyncEvent::Cancelled { job_id, .. } => job_id,
        }
    }

    /// Whether this event ends its run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncEvent::Completed { .. } | SyncEvent::Failed { .. } | SyncEvent::Cancelled { .. }
        )
    }
}

// ============================================================================
// Remote Events
// ============================================================================

/// Changes to the set of configured remotes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum RemoteEvent {
    Saved { remote_id: String, name: String },
    Removed { remote_id: String },
}

impl RemoteEvent {
    fn description(&self) -> &str {
        match self {
            RemoteEvent::Saved { .. } => "Remote saved",
            RemoteEvent::Removed { .. } => "Remote removed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cloning the bus shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// `capacity` is the number of events buffered per subscriber before the
    /// slowest one starts lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(16);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream, SyncEvent};
///
/// let event_bus = EventBus::new(100);
/// let failures = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Sync(SyncEvent::Failed { .. })));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Only sync events of one job.
    pub fn for_job(self, job_id: impl Into<String>) -> Self {
        let job_id = job_id.into();
        self.filter(move |event| matches!(event, CoreEvent::Sync(e) if e.job_id() == job_id))
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive a matching event without waiting.
    ///
    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.matches(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(job_id: &str, items: u64) -> CoreEvent {
        CoreEvent::Sync(SyncEvent::Progress {
            job_id: job_id.to_string(),
            items_transferred: items,
            bytes_transferred: items * 10,
            total_items: 4,
            total_bytes: 40,
            percent: (items * 25) as u8,
        })
    }

    #[test]
    fn test_event_bus_creation() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(EventBus::default().subscriber_count(), 0);
    }

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(10);
        assert!(bus.emit(progress("job", 1)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive() {
        let bus = EventBus::new(10);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        assert_eq!(bus.emit(progress("job", 1)).unwrap(), 2);

        assert_eq!(a.recv().await.unwrap(), progress("job", 1));
        assert_eq!(b.recv().await.unwrap(), progress("job", 1));
    }

    #[tokio::test]
    async fn test_stream_for_job_skips_other_jobs() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe()).for_job("mine");

        bus.emit(progress("other", 1)).unwrap();
        bus.emit(CoreEvent::Remote(RemoteEvent::Removed {
            remote_id: "r".to_string(),
        }))
        .unwrap();
        bus.emit(progress("mine", 2)).unwrap();

        assert_eq!(stream.recv().await.unwrap(), progress("mine", 2));
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagging_subscriber() {
        let bus = EventBus::new(2);
        let mut stream = EventStream::new(bus.subscribe());

        for i in 0..4 {
            bus.emit(progress("job", i)).unwrap();
        }

        assert!(matches!(stream.try_recv(), Some(Err(RecvError::Lagged(2)))));
        assert_eq!(stream.recv().await.unwrap(), progress("job", 2));
    }

    #[test]
    fn test_severity_and_description() {
        let failed = CoreEvent::Sync(SyncEvent::Failed {
            job_id: "job".to_string(),
            message: "fml".to_string(),
            items_transferred: 0,
            bytes_transferred: 0,
        });
        assert_eq!(failed.severity(), EventSeverity::Error);
        assert_eq!(failed.description(), "Sync failed");
        assert_eq!(progress("job", 1).severity(), EventSeverity::Debug);
        assert!(EventSeverity::Error > EventSeverity::Warning);
    }

    #[test]
    fn test_terminal_events() {
        let completed = SyncEvent::Completed {
            job_id: "job".to_string(),
            items_transferred: 2,
            bytes_transferred: 150,
            duration_secs: 1,
        };
        assert!(completed.is_terminal());
        assert_eq!(completed.job_id(), "job");

        let CoreEvent::Sync(progress) = progress("job", 1) else {
            unreachable!()
        };
        assert!(!progress.is_terminal());
    }

    #[test]
    fn test_serialization_shape() {
        let event = CoreEvent::Diff(DiffEvent::Computed {
            remote_id: "r".to_string(),
            remote_count: 1,
            local_count: 2,
            missing_count: 1,
            missing_bytes: 50,
        });
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "Diff");
        assert_eq!(json["payload"]["event"], "Computed");
        assert_eq!(json["payload"]["missing_bytes"], 50);

        let back: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
