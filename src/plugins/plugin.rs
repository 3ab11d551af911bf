//! # Plugin: one monitoring unit and its run loop.
//!
//! A [`Plugin`] owns its resolved parameters and its probe, and shares the
//! [`ConcurrencyGate`] with every other plugin of the manager.
//!
//! ## Run loop
//! ```text
//! Plugin::start() ──► tokio::spawn(run)
//!
//! loop {
//!   ├─► wait: cancelled │ forced-run wake-up │ next interval tick
//!   ├─► forced = take force flag
//!   ├─► acquire gate permit (cancellable)
//!   ├─► publish ProbeStarting
//!   ├─► run_once(probe, timeout)
//!   ├─► release permit
//!   ├─► record last_result (+ forced_result if forced and not re-forced meanwhile)
//!   └─► schedule next tick = now + Interval
//! }
//! ```
//!
//! ## Rules
//! - `force` and `forced_result` change together under one lock, shared by
//!   [`Plugin::force_run`] (ledger side) and the loop (result side).
//! - A result is stored in `forced_result` only when no newer forced run was
//!   requested while the probe executed.
//! - Liveness flips to `false` when the loop exits, including on panic.
//! - `Interval` absent or `0` means the probe only runs when forced.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::{keys, seconds, Params};
use crate::core::{run_once, ConcurrencyGate};
use crate::error::{PluginError, ProbeError};
use crate::events::{Bus, Event, EventKind};

use super::probe::{ProbeRef, ProbeRequest};
use super::result::RunResult;

/// A named, configured monitoring unit.
pub struct Plugin {
    name: Arc<str>,
    params: Arc<Params>,
    interval: Option<Duration>,
    timeout: Option<Duration>,
    probe: ProbeRef,
    gate: ConcurrencyGate,
    bus: Bus,

    /// Pending forced-run flag; guards `forced_result` writes.
    force: Mutex<bool>,
    forced_result: watch::Sender<Option<RunResult>>,
    last_result: watch::Sender<Option<RunResult>>,
    wake: Notify,

    alive: watch::Sender<bool>,
    token: Mutex<Option<CancellationToken>>,
    runs: AtomicU64,
}

impl Plugin {
    /// Creates a plugin from its resolved parameters.
    ///
    /// Validates `Interval` and `Timeout` (non-negative seconds). A plugin
    /// without `Timeout` uses `default_timeout`.
    pub fn new(
        name: impl Into<Arc<str>>,
        params: Params,
        probe: ProbeRef,
        gate: ConcurrencyGate,
        bus: Bus,
        default_timeout: Option<Duration>,
    ) -> Result<Self, PluginError> {
        let interval = seconds(&params, keys::INTERVAL)?;
        let timeout = seconds(&params, keys::TIMEOUT)?.or(default_timeout);

        Ok(Self {
            name: name.into(),
            params: Arc::new(params),
            interval,
            timeout,
            probe,
            gate,
            bus,
            force: Mutex::new(false),
            forced_result: watch::Sender::new(None),
            last_result: watch::Sender::new(None),
            wake: Notify::new(),
            alive: watch::Sender::new(false),
            token: Mutex::new(None),
            runs: AtomicU64::new(0),
        })
    }

    /// Plugin name (registry key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Scheduled interval, `None` when the plugin only runs on demand.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Effective probe timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The gate this plugin executes under.
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Number of probe executions started so far.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    /// True while a forced run is pending (not yet picked up by the loop).
    pub fn force(&self) -> bool {
        *self.force.lock()
    }

    /// Result of the latest completed forced run, `None` while one is pending.
    pub fn forced_result(&self) -> Option<RunResult> {
        (*self.forced_result.borrow()).clone()
    }

    /// Result of the latest completed execution, forced or scheduled.
    pub fn last_result(&self) -> Option<RunResult> {
        (*self.last_result.borrow()).clone()
    }

    /// True while the run loop is running.
    pub fn is_alive(&self) -> bool {
        *self.alive.borrow()
    }

    /// Requests an immediate run: sets `force`, clears `forced_result`, wakes the loop.
    ///
    /// Calling it again before the loop picks it up is harmless; the result slot
    /// is cleared again either way.
    pub fn force_run(&self) {
        {
            let mut force = self.force.lock();
            *force = true;
            self.forced_result.send_replace(None);
        }
        self.wake.notify_one();
    }

    /// Spawns the run loop as a child of `parent`.
    ///
    /// Returns `false` if the loop is already running.
    pub fn start(self: &Arc<Self>, parent: &CancellationToken) -> bool {
        let token = {
            let mut slot = self.token.lock();
            if self.is_alive() {
                return false;
            }
            let token = parent.child_token();
            *slot = Some(token.clone());
            token
        };

        self.alive.send_replace(true);
        let me = Arc::clone(self);
        tokio::spawn(me.run(token));
        true
    }

    /// Requests termination of the run loop. Does not wait.
    pub fn terminate(&self) {
        if let Some(token) = self.token.lock().as_ref() {
            token.cancel();
        }
    }

    /// True while the run loop is alive but has been asked to stop.
    pub fn is_terminating(&self) -> bool {
        self.is_alive()
            && self
                .token
                .lock()
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
    }

    /// Resolves once the run loop is not running.
    pub async fn wait_stopped(&self) {
        let mut rx = self.alive.subscribe();
        let _ = rx.wait_for(|alive| !*alive).await;
    }

    /// Waits for the pending forced run to produce a result.
    ///
    /// Returns `None` if the run loop stops first.
    pub async fn wait_forced_result(&self) -> Option<RunResult> {
        let mut result = self.forced_result.subscribe();
        let mut alive = self.alive.subscribe();
        loop {
            let current = (*result.borrow_and_update()).clone();
            if current.is_some() {
                return current;
            }
            if !*alive.borrow_and_update() {
                return None;
            }
            tokio::select! {
                changed = result.changed() => if changed.is_err() { return None; },
                changed = alive.changed() => if changed.is_err() { return None; },
            }
        }
    }

    /// Clears the pending flag and reports whether a forced run was pending.
    fn take_force(&self) -> bool {
        std::mem::replace(&mut *self.force.lock(), false)
    }

    /// Stores a finished result.
    fn record(&self, result: RunResult) {
        self.last_result.send_replace(Some(result.clone()));
        if result.forced {
            let pending = self.force.lock();
            if !*pending {
                self.forced_result.send_replace(Some(result));
            }
        }
    }

    async fn run(self: Arc<Self>, token: CancellationToken) {
        let _alive = AliveGuard(&self.alive);
        self.bus
            .publish(Event::new(EventKind::PluginStarted).with_plugin(self.name.clone()));

        let mut next = self.interval.map(|_| Instant::now());
        let exit = loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break EventKind::PluginStopped,
                _ = self.wake.notified() => {}
                _ = tick(next) => {}
            }
            let forced = self.take_force();

            let permit = tokio::select! {
                biased;
                _ = token.cancelled() => break EventKind::PluginStopped,
                permit = self.gate.acquire() => match permit {
                    Ok(permit) => permit,
                    Err(_closed) => break EventKind::PluginStopped,
                },
            };

            let run = self.runs.fetch_add(1, Ordering::Relaxed) + 1;
            self.bus.publish(
                Event::new(EventKind::ProbeStarting)
                    .with_plugin(self.name.clone())
                    .with_run(run)
                    .with_reason(if forced { "forced" } else { "scheduled" }),
            );

            let req = ProbeRequest {
                plugin: self.name.clone(),
                params: self.params.clone(),
                forced,
                ctx: token.child_token(),
            };
            let started_at = Utc::now();
            let clock = Instant::now();
            let outcome = run_once(self.probe.as_ref(), req, self.timeout, run, &self.bus).await;
            drop(permit);

            if token.is_cancelled() {
                break EventKind::PluginStopped;
            }
            self.record(RunResult::from_outcome(
                &outcome,
                forced,
                run,
                started_at,
                clock.elapsed(),
            ));

            if let Err(ProbeError::Fatal { error }) = &outcome {
                tracing::error!(
                    plugin = %self.name,
                    %error,
                    "plugin stopped after fatal probe error"
                );
                self.bus.publish(
                    Event::new(EventKind::PluginDead)
                        .with_plugin(self.name.clone())
                        .with_reason(error.as_str()),
                );
                break EventKind::PluginDead;
            }

            next = self.interval.map(|every| Instant::now() + every);
        };

        if exit == EventKind::PluginStopped {
            self.bus
                .publish(Event::new(EventKind::PluginStopped).with_plugin(self.name.clone()));
        }
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("force", &self.force())
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

/// Sleeps until `deadline`, or forever when there is none.
async fn tick(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

/// Marks the plugin not alive when the run loop ends, even by panic.
struct AliveGuard<'a>(&'a watch::Sender<bool>);

impl Drop for AliveGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}
