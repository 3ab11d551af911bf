//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `PluginRegistry` (load), `PluginManager` (forced runs, shutdown),
//!   `Plugin` run loops and `runner::run_once`, `SubscriberSet` workers.
//! - **Consumers**: the manager's subscriber listener, which fans out to `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
