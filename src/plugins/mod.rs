//! # Plugins and probes.
//!
//! - [`Plugin`] a named, configured monitoring unit with its own run loop
//! - [`Probe`] the async check a plugin executes ([`ProbeFn`], [`CommandProbe`])
//! - [`ProbeFactory`] builds a probe from resolved parameters at load time
//! - [`RunResult`] the recorded outcome of one execution

mod command;
mod factory;
mod plugin;
mod probe;
mod probe_fn;
mod result;

pub use command::{CommandProbe, CommandProbeFactory};
pub use factory::{FactoryFn, ProbeFactory, SharedProbe};
pub use plugin::Plugin;
pub use probe::{Probe, ProbeOutput, ProbeRef, ProbeRequest, ProbeStatus};
pub use probe_fn::ProbeFn;
pub use result::RunResult;
