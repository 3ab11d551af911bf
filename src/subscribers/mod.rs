//! # Event subscribers.
//!
//! ```text
//! Plugin run loop ── publish(Event) ──► Bus ──► manager listener ──► SubscriberSet
//!                                                                 ┌──────┼──────┐
//!                                                                 ▼      ▼      ▼
//!                                                            LogWriter Metrics Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
