//! # Probe factories.
//!
//! The registry asks a [`ProbeFactory`] for a probe once per plugin, after
//! parameters are resolved. A factory error skips that plugin only.
//!
//! - [`SharedProbe`] hands the same probe to every plugin (parameters drive behavior)
//! - [`FactoryFn`] wraps a closure
//! - [`CommandProbeFactory`](crate::CommandProbeFactory) builds shell command probes

use crate::config::Params;
use crate::error::PluginError;

use super::probe::ProbeRef;

/// Builds the probe a plugin will run.
pub trait ProbeFactory: Send + Sync + 'static {
    /// Returns the probe for `plugin` configured with `params`.
    fn build(&self, plugin: &str, params: &Params) -> Result<ProbeRef, PluginError>;
}

/// Factory returning one shared probe for every plugin.
#[derive(Clone)]
pub struct SharedProbe(pub ProbeRef);

impl ProbeFactory for SharedProbe {
    fn build(&self, _plugin: &str, _params: &Params) -> Result<ProbeRef, PluginError> {
        Ok(self.0.clone())
    }
}

/// Closure-backed factory.
pub struct FactoryFn<F> {
    f: F,
}

impl<F> FactoryFn<F>
where
    F: Fn(&str, &Params) -> Result<ProbeRef, PluginError> + Send + Sync + 'static,
{
    /// Wraps `f` as a [`ProbeFactory`].
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ProbeFactory for FactoryFn<F>
where
    F: Fn(&str, &Params) -> Result<ProbeRef, PluginError> + Send + Sync + 'static,
{
    fn build(&self, plugin: &str, params: &Params) -> Result<ProbeRef, PluginError> {
        (self.f)(plugin, params)
    }
}
