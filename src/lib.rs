//! # probevisor
//!
//! **Probevisor** manages a set of monitoring plugins: it loads them from
//! configuration with template inheritance, runs their probes on a schedule
//! under a global concurrency bound, and lets callers force immediate runs
//! and fetch the results later by handle.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ConfigSources { plugins, templates, actions }
//!            │
//!            ▼
//!   ManagerBuilder::build()
//!     └─► PluginRegistry::load_all()
//!            BasePlugin < Template < options  (merge)
//!            Action name → action params      (substitute)
//!            ProbeFactory::build()            (one probe per plugin)
//!            │
//!            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  PluginManager                                                    │
//! │  - PluginRegistry (name → Arc<Plugin>)                            │
//! │  - ProcessLedger  (handle → forced-run record)                    │
//! │  - ConcurrencyGate (shared by every plugin)                       │
//! │  - Bus (broadcast events) ──► SubscriberSet                       │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   ┌──────────┐       ┌──────────┐       ┌──────────┐
//!   │  Plugin  │       │  Plugin  │       │  Plugin  │
//!   │ run loop │       │ run loop │       │ run loop │
//!   └────┬─────┘       └────┬─────┘       └────┬─────┘
//!        └──── acquire ─────┼──── gate ────────┘
//!                           ▼
//!                   Probe::run(request)
//! ```
//!
//! ### Forced runs
//! ```text
//! add_process(names, filter) ──► handle
//!   └─► for each target: force = true, forced_result = None, wake loop
//!
//! run loop: take force ─► run probe ─► forced_result = Some(result)
//!
//! get_process(handle) ──► ProcessRecord::results() / wait()
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Manager**       | Lifecycle, lookup, forced runs, daemon mode.                 | [`PluginManager`], [`ManagerBuilder`]       |
//! | **Configuration** | Runtime settings, input maps, template/action resolution.    | [`ManagerConfig`], [`ConfigSources`]        |
//! | **Probes**        | The checks plugins run.                                      | [`Probe`], [`ProbeFn`], [`CommandProbe`]    |
//! | **Concurrency**   | Global bound on probes in flight.                            | [`ConcurrencyGate`]                         |
//! | **Subscriber API**| Hook into runtime events.                                    | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors for loading, lookup and probe execution.        | [`ManagerError`], [`ProbeError`]            |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a subscriber rendering events through `tracing`.
//!
//! ## Example
//! ```rust
//! use probevisor::{
//!     ConfigSources, Filter, PluginManager, ProbeError, ProbeFn, ProbeOutput, ProbeRequest,
//!     SharedProbe,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sources = ConfigSources::from_json_str(r#"{
//!         "templates": { "BasePlugin": { "Interval": 60 }, "Disk": { "Role": "disk" } },
//!         "plugins": {
//!             "root_fs": { "Template": "Disk", "Path": "/" },
//!             "uptime":  { "Interval": 30 }
//!         }
//!     }"#)?;
//!
//!     let probe = ProbeFn::arc(|req: ProbeRequest| async move {
//!         Ok::<_, ProbeError>(ProbeOutput::ok(format!("{} looks fine", req.plugin)))
//!     });
//!
//!     let manager = PluginManager::builder(sources)
//!         .with_factory(SharedProbe(probe))
//!         .build()?;
//!     manager.start().await;
//!
//!     let handle = manager.add_process(None, Some(&Filter::new("Role", "disk"))).await?;
//!     let results = manager.get_process(handle).await?.wait().await;
//!     assert_eq!(results.len(), 1);
//!
//!     manager.stop(true).await;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod plugins;
mod subscribers;

// ---- Public re-exports ----

pub use crate::config::{
    keys, merge, ConfigResolver, ConfigSources, Filter, ManagerConfig, Params, BASE_TEMPLATE,
};
pub use crate::core::{
    ConcurrencyGate, GateClosed, GatePermit, LoadFailure, LoadReport, ManagerBuilder, PluginEnv,
    PluginManager, PluginRegistry, PluginSelection, ProcessLedger, ProcessRecord, ShutdownSignal,
};
pub use crate::error::{
    ConfigError, LoadError, ManagerError, PluginError, ProbeError, RuntimeError,
};
pub use crate::events::{Bus, Event, EventKind};
pub use crate::plugins::{
    CommandProbe, CommandProbeFactory, FactoryFn, Plugin, Probe, ProbeFactory, ProbeFn,
    ProbeOutput, ProbeRef, ProbeRequest, ProbeStatus, RunResult, SharedProbe,
};
pub use crate::subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use crate::subscribers::LogWriter;
