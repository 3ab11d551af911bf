//! # The `Subscribe` extension point.
//!
//! Implement [`Subscribe`] to receive manager events: plugin loading, probe
//! executions, forced-run requests and shutdown progress. Typical uses are
//! metrics, alerting on `ProbeFailed`, or keeping an external status page.
//!
//! ```text
//! SubscriberSet::emit(ev)
//!   ├─ wants(ev.kind)? no → skipped for this subscriber
//!   └─ try_send → [bounded queue] → worker → on_event(ev)
//!                       │                        └─ panic → SubscriberPanicked
//!                       └─ full → SubscriberOverflow
//! ```
//!
//! A subscriber only slows down its own queue; each queue is drained in order.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use probevisor::{Event, EventKind, Subscribe};
//!
//! struct FailureCounter(std::sync::atomic::AtomicU64);
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, _ev: &Event) {
//!         self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!     }
//!
//!     fn name(&self) -> &'static str { "failure-counter" }
//!
//!     fn wants(&self, kind: EventKind) -> bool {
//!         matches!(kind, EventKind::ProbeFailed | EventKind::TimeoutHit)
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

/// Receiver of manager events.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event on the subscriber's own worker task.
    async fn on_event(&self, event: &Event);

    /// Name reported in overflow and panic events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue length before events are dropped (minimum 1).
    fn queue_capacity(&self) -> usize {
        1024
    }

    /// Whether events of `kind` should be queued at all. Default: every kind.
    fn wants(&self, kind: EventKind) -> bool {
        let _ = kind;
        true
    }
}
