//! # Runtime events emitted by the manager and plugin run loops.
//!
//! [`EventKind`] groups events into:
//! - **Load events**: plugin loaded or skipped while building the registry
//! - **Probe events**: one probe execution (starting, completed, failed, timeout)
//! - **Plugin lifecycle**: run loop started, stopped, dead
//! - **Manager events**: forced runs and shutdown
//! - **Subscriber events**: overflow and panics inside subscribers
//!
//! Each event carries a process-wide monotonically increasing `seq`.
//!
//! ## Example
//! ```rust
//! use probevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ForcedRunRequested)
//!     .with_plugin("disk")
//!     .with_handle(3);
//!
//! assert_eq!(ev.plugin.as_deref(), Some("disk"));
//! assert_eq!(ev.handle, Some(3));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::plugins::ProbeStatus;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing (`plugin` = subscriber name).
    SubscriberPanicked,
    /// Subscriber dropped an event (`plugin` = subscriber name, `reason` = full/closed).
    SubscriberOverflow,

    // === Load events ===
    /// Plugin constructed and registered.
    PluginLoaded,
    /// Plugin disabled or failed to load (`reason`).
    PluginSkipped,

    // === Plugin lifecycle ===
    /// Run loop spawned.
    PluginStarted,
    /// Run loop exited after cancellation.
    PluginStopped,
    /// Run loop exited after a fatal probe error (`reason`).
    PluginDead,

    // === Probe events ===
    /// Probe execution is starting (`run`, `forced` in `reason`).
    ProbeStarting,
    /// Probe produced a result (`status`, `run`).
    ProbeCompleted,
    /// Probe returned an error (`reason`, `run`).
    ProbeFailed,
    /// Probe exceeded its timeout (`timeout_ms`, `run`); followed by `ProbeFailed`.
    TimeoutHit,

    // === Manager events ===
    /// Plugin flagged for a forced run (`handle`).
    ForcedRunRequested,
    /// Stop requested for all plugins.
    ShutdownRequested,
    /// Every plugin reported not running.
    AllStopped,
    /// Grace period exceeded; some plugins did not stop in time.
    GraceExceeded,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Plugin (or subscriber) name, if applicable.
    pub plugin: Option<Arc<str>>,
    /// Human-readable reason (errors, skip causes, overflow details).
    pub reason: Option<Arc<str>>,
    /// Per-plugin run counter (starting from 1).
    pub run: Option<u64>,
    /// Probe status for `ProbeCompleted`.
    pub status: Option<ProbeStatus>,
    /// Process handle for `ForcedRunRequested`.
    pub handle: Option<usize>,
    /// Probe timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            plugin: None,
            reason: None,
            run: None,
            status: None,
            handle: None,
            timeout_ms: None,
        }
    }

    /// Attaches a plugin name.
    #[inline]
    pub fn with_plugin(mut self, plugin: impl Into<Arc<str>>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the plugin's run counter.
    #[inline]
    pub fn with_run(mut self, run: u64) -> Self {
        self.run = Some(run);
        self
    }

    /// Attaches a probe status.
    #[inline]
    pub fn with_status(mut self, status: ProbeStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a process handle.
    #[inline]
    pub fn with_handle(mut self, handle: usize) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_plugin(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_plugin(subscriber)
            .with_reason(info)
    }

    /// True for events produced by the subscriber machinery itself.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
