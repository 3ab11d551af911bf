//! # LogWriter: renders events through `tracing`
//!
//! A subscriber that turns every [`Event`] into a `tracing` record with
//! structured fields. Install any `tracing` subscriber in the host to see them.
//!
//! ## Example output (with a fmt subscriber)
//! ```text
//! INFO  plugin="disk" run=4 status=Ok probe completed
//! WARN  plugin="disk" run=5 reason="execution failed: exit 127" probe failed
//! INFO  plugin="disk" handle=2 forced run requested
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let plugin = e.plugin.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::PluginLoaded => tracing::info!(plugin, "plugin loaded"),
            EventKind::PluginSkipped => tracing::warn!(plugin, reason, "plugin skipped"),
            EventKind::PluginStarted => tracing::debug!(plugin, "plugin started"),
            EventKind::PluginStopped => tracing::debug!(plugin, "plugin stopped"),
            EventKind::PluginDead => tracing::error!(plugin, reason, "plugin dead"),
            EventKind::ProbeStarting => {
                tracing::debug!(plugin, run = ?e.run, reason, "probe starting")
            }
            EventKind::ProbeCompleted => {
                tracing::info!(plugin, run = ?e.run, status = ?e.status, "probe completed")
            }
            EventKind::ProbeFailed => {
                tracing::warn!(plugin, run = ?e.run, reason, "probe failed")
            }
            EventKind::TimeoutHit => {
                tracing::warn!(plugin, run = ?e.run, timeout_ms = ?e.timeout_ms, "probe timeout")
            }
            EventKind::ForcedRunRequested => {
                tracing::info!(plugin, handle = ?e.handle, "forced run requested")
            }
            EventKind::ShutdownRequested => tracing::info!("shutdown requested"),
            EventKind::AllStopped => tracing::info!("all plugins stopped"),
            EventKind::GraceExceeded => tracing::warn!("grace exceeded"),
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = plugin, reason, "subscriber overflow")
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(subscriber = plugin, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::plugins::ProbeStatus;

    #[tokio::test]
    async fn renders_every_event_kind() {
        let writer = LogWriter::new();
        assert_eq!(writer.name(), "LogWriter");

        let kinds = [
            EventKind::SubscriberPanicked,
            EventKind::SubscriberOverflow,
            EventKind::PluginLoaded,
            EventKind::PluginSkipped,
            EventKind::PluginStarted,
            EventKind::PluginStopped,
            EventKind::PluginDead,
            EventKind::ProbeStarting,
            EventKind::ProbeCompleted,
            EventKind::ProbeFailed,
            EventKind::TimeoutHit,
            EventKind::ForcedRunRequested,
            EventKind::ShutdownRequested,
            EventKind::AllStopped,
            EventKind::GraceExceeded,
        ];
        for kind in kinds {
            assert!(writer.wants(kind));
            writer.on_event(&Event::new(kind)).await;
            let full = Event::new(kind)
                .with_plugin("disk")
                .with_reason("exit 127")
                .with_run(4)
                .with_status(ProbeStatus::Warn)
                .with_handle(2)
                .with_timeout(Duration::from_millis(250));
            writer.on_event(&full).await;
        }
    }
}
