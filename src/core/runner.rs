//! # Run a single probe execution.
//!
//! Executes one attempt of a [`Probe`] with optional timeout and publishes
//! the terminal event to the [`Bus`].
//!
//! ## Event flow
//! ```text
//! Success:
//!   probe.run() → Ok(output)  → publish ProbeCompleted{status}
//!
//! Failure:
//!   probe.run() → Err(e)      → publish ProbeFailed
//!
//! Timeout:
//!   timeout exceeded → cancel req.ctx → publish TimeoutHit
//!                                     → publish ProbeFailed (timeout)
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event: `ProbeCompleted` or `ProbeFailed`.
//! - `Canceled` is a shutdown, not a failure: nothing is published for it.
//! - The gate permit is held by the caller; this function never touches it.

use std::time::Duration;
use tokio::time;

use crate::{
    error::ProbeError,
    events::{Bus, Event, EventKind},
    plugins::{Probe, ProbeOutput, ProbeRequest},
};

/// Executes `probe` once for `req`, publishing lifecycle events to `bus`.
pub(crate) async fn run_once(
    probe: &dyn Probe,
    req: ProbeRequest,
    timeout: Option<Duration>,
    run: u64,
    bus: &Bus,
) -> Result<ProbeOutput, ProbeError> {
    let plugin = req.plugin.clone();
    let ctx = req.ctx.clone();

    let res = if let Some(dur) = timeout.filter(|d| *d > Duration::ZERO) {
        match time::timeout(dur, probe.run(req)).await {
            Ok(r) => r,
            Err(_elapsed) => {
                ctx.cancel();
                bus.publish(
                    Event::new(EventKind::TimeoutHit)
                        .with_plugin(plugin.clone())
                        .with_timeout(dur)
                        .with_run(run),
                );
                Err(ProbeError::Timeout { timeout: dur })
            }
        }
    } else {
        probe.run(req).await
    };

    match &res {
        Ok(out) => bus.publish(
            Event::new(EventKind::ProbeCompleted)
                .with_plugin(plugin)
                .with_status(out.status)
                .with_run(run),
        ),
        Err(ProbeError::Canceled) => {}
        Err(e) => bus.publish(
            Event::new(EventKind::ProbeFailed)
                .with_plugin(plugin)
                .with_reason(e.to_string())
                .with_run(run),
        ),
    }
    res
}
