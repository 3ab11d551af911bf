use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use crate::{
    config::{ConfigSources, ManagerConfig},
    error::ManagerError,
    events::{Bus, Event},
    plugins::{CommandProbeFactory, ProbeFactory},
    subscribers::{Subscribe, SubscriberSet},
};

use super::{
    gate::ConcurrencyGate,
    manager::PluginManager,
    registry::{PluginEnv, PluginRegistry},
};

/// Builder for constructing a [`PluginManager`].
pub struct ManagerBuilder {
    sources: ConfigSources,
    cfg: ManagerConfig,
    factory: Box<dyn ProbeFactory>,
    gate: Option<ConcurrencyGate>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ManagerBuilder {
    /// Creates a builder with default configuration and the command probe.
    pub fn new(sources: ConfigSources) -> Self {
        Self {
            sources,
            cfg: ManagerConfig::default(),
            factory: Box::new(CommandProbeFactory),
            gate: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the manager configuration.
    pub fn with_config(mut self, cfg: ManagerConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets the factory that builds each plugin's probe.
    pub fn with_factory(mut self, factory: impl ProbeFactory) -> Self {
        self.factory = Box::new(factory);
        self
    }

    /// Uses an existing gate instead of creating one from
    /// [`ManagerConfig::max_concurrent`].
    ///
    /// Lets several managers share one concurrency budget.
    pub fn with_gate(mut self, gate: ConcurrencyGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (loading, probe runs, shutdown)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Loads the plugins and returns the manager.
    ///
    /// Plugins are not started. Must be called inside a tokio runtime when
    /// subscribers are set.
    pub fn build(self) -> Result<PluginManager, ManagerError> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let gate = self
            .gate
            .unwrap_or_else(|| ConcurrencyGate::new(self.cfg.concurrency_limit()));

        // Subscribe before loading so load events reach subscribers.
        let rx = (!self.subscribers.is_empty()).then(|| bus.subscribe());

        let env = PluginEnv {
            gate: gate.clone(),
            bus: bus.clone(),
            default_timeout: self.cfg.default_timeout(),
        };
        let (registry, report) = PluginRegistry::load_all(&self.sources, &*self.factory, &env)?;

        let listener = rx.map(|rx| {
            let subs = SubscriberSet::new(self.subscribers, bus.clone());
            subscriber_listener(rx, subs)
        });

        tracing::info!(
            loaded = report.loaded.len(),
            disabled = report.disabled.len(),
            failed = report.failures.len(),
            gate = gate.capacity(),
            "plugin manager ready"
        );
        Ok(PluginManager::new_internal(
            self.cfg, gate, bus, registry, report, listener,
        ))
    }
}

/// Forwards bus events to the subscriber set until the bus closes.
fn subscriber_listener(
    mut rx: tokio::sync::broadcast::Receiver<Event>,
    subs: SubscriberSet,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => subs.emit(&ev),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
        subs.shutdown().await;
    })
}
