//! Runtime core: orchestration and lifecycle.
//!
//! The public entry point is [`PluginManager`], built through [`ManagerBuilder`].
//!
//! Internal modules:
//! - [`gate`]: counting semaphore bounding concurrent probe executions;
//! - [`runner`]: executes one probe attempt with timeout and event publishing;
//! - [`registry`]: loads plugins from configuration and looks them up;
//! - [`ledger`]: append-only log of forced-run requests;
//! - [`manager`]: start/stop, forced runs, daemon mode;
//! - [`shutdown`]: cross-platform termination signal handling.

mod builder;
mod gate;
mod ledger;
mod manager;
mod registry;
mod runner;
mod shutdown;

pub use builder::ManagerBuilder;
pub use gate::{ConcurrencyGate, GateClosed, GatePermit};
pub use ledger::{ProcessLedger, ProcessRecord};
pub use manager::PluginManager;
pub use registry::{LoadFailure, LoadReport, PluginEnv, PluginRegistry, PluginSelection};
pub use shutdown::ShutdownSignal;

pub(crate) use runner::run_once;
