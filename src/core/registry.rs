//! # Plugin registry: loading and lookup of configured plugins.
//!
//! [`PluginRegistry`] owns every loaded [`Plugin`] keyed by name.
//!
//! ## Loading
//! ```text
//! load_all(sources, factory, env)
//!   ├─► BasePlugin template present?        no → fatal ManagerError::Config
//!   └─► for each (name, options):
//!         ├─ Enabled == false               → PluginSkipped, report.disabled
//!         ├─ resolve(name, options)         → Err → LoadFailure
//!         ├─ factory.build(name, params)    → Err → LoadFailure
//!         ├─ Plugin::new(...)               → Err → LoadFailure
//!         └─ insert                         → PluginLoaded, report.loaded
//!   zero loaded → ManagerError::NoRunningPlugins
//! ```
//!
//! ## Rules
//! - Names are unique; only [`PluginRegistry::register`] replaces an entry.
//! - A failing plugin never aborts the batch.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::{keys, ConfigResolver, ConfigSources, Filter, Params};
use crate::error::{LoadError, ManagerError};
use crate::events::{Bus, Event, EventKind};
use crate::plugins::{Plugin, ProbeFactory};

use super::gate::ConcurrencyGate;

/// Shared runtime pieces handed to every plugin at load time.
#[derive(Clone, Debug)]
pub struct PluginEnv {
    /// Gate all plugins execute under.
    pub gate: ConcurrencyGate,
    /// Event bus.
    pub bus: Bus,
    /// Probe timeout for plugins without their own `Timeout`.
    pub default_timeout: Option<Duration>,
}

/// A configured plugin that could not be loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadFailure {
    /// Plugin name.
    pub plugin: String,
    /// What went wrong.
    pub error: LoadError,
}

/// Outcome of [`PluginRegistry::load_all`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Names of loaded plugins.
    pub loaded: Vec<String>,
    /// Names of plugins skipped because `Enabled` is `false`.
    pub disabled: Vec<String>,
    /// Plugins that failed to load.
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    /// Number of configured entries that were attempted (disabled ones excluded).
    pub fn attempted(&self) -> usize {
        self.loaded.len() + self.failures.len()
    }
}

/// Result of [`PluginRegistry::list`].
#[derive(Clone, Debug)]
pub enum PluginSelection {
    /// No filter was given: every plugin by name.
    All(BTreeMap<String, Arc<Plugin>>),
    /// Plugins matching the filter, in name order.
    Matching(Vec<Arc<Plugin>>),
}

impl PluginSelection {
    /// Number of selected plugins.
    pub fn len(&self) -> usize {
        match self {
            PluginSelection::All(map) => map.len(),
            PluginSelection::Matching(list) => list.len(),
        }
    }

    /// True if nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the selected plugins, in name order.
    pub fn names(&self) -> Vec<String> {
        match self {
            PluginSelection::All(map) => map.keys().cloned().collect(),
            PluginSelection::Matching(list) => list.iter().map(|p| p.name().to_string()).collect(),
        }
    }

    /// Flattens the selection into a list, in name order.
    pub fn into_vec(self) -> Vec<Arc<Plugin>> {
        match self {
            PluginSelection::All(map) => map.into_values().collect(),
            PluginSelection::Matching(list) => list,
        }
    }
}

/// Name-keyed store of loaded plugins.
pub struct PluginRegistry {
    plugins: RwLock<BTreeMap<String, Arc<Plugin>>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(BTreeMap::new()),
        }
    }

    /// Loads every enabled plugin in `sources`.
    ///
    /// Fails only when the `BasePlugin` template is missing or when nothing
    /// could be loaded; every other problem is recorded in the [`LoadReport`].
    pub fn load_all(
        sources: &ConfigSources,
        factory: &dyn ProbeFactory,
        env: &PluginEnv,
    ) -> Result<(Self, LoadReport), ManagerError> {
        let resolver = ConfigResolver::new(sources);
        if let Err(e) = resolver.base() {
            tracing::error!("required BasePlugin template is not configured");
            return Err(e.into());
        }

        let mut plugins = BTreeMap::new();
        let mut report = LoadReport::default();

        for (name, options) in &sources.plugins {
            if options.get(keys::ENABLED) == Some(&Value::Bool(false)) {
                tracing::info!(plugin = %name, "plugin is disabled, skipping");
                env.bus.publish(
                    Event::new(EventKind::PluginSkipped)
                        .with_plugin(name.as_str())
                        .with_reason("disabled"),
                );
                report.disabled.push(name.clone());
                continue;
            }

            match load_one(&resolver, factory, env, name, options) {
                Ok(plugin) => {
                    tracing::info!(plugin = %name, "loaded plugin");
                    env.bus
                        .publish(Event::new(EventKind::PluginLoaded).with_plugin(name.as_str()));
                    plugins.insert(name.clone(), Arc::new(plugin));
                    report.loaded.push(name.clone());
                }
                Err(error) => {
                    tracing::error!(
                        plugin = %name,
                        %error,
                        label = error.as_label(),
                        "plugin not loaded"
                    );
                    env.bus.publish(
                        Event::new(EventKind::PluginSkipped)
                            .with_plugin(name.as_str())
                            .with_reason(error.to_string()),
                    );
                    report.failures.push(LoadFailure {
                        plugin: name.clone(),
                        error,
                    });
                }
            }
        }

        if plugins.is_empty() {
            tracing::error!("no plugins loaded");
            return Err(ManagerError::NoRunningPlugins {
                attempted: report.attempted(),
            });
        }

        Ok((
            Self {
                plugins: RwLock::new(plugins),
            },
            report,
        ))
    }

    /// Returns the plugin called `name`.
    pub async fn get(&self, name: &str) -> Result<Arc<Plugin>, ManagerError> {
        self.plugins
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| ManagerError::NoSuchPlugin {
                name: name.to_string(),
            })
    }

    /// Returns every plugin, or only those matching `filter`.
    pub async fn list(&self, filter: Option<&Filter>) -> PluginSelection {
        let plugins = self.plugins.read().await;
        match filter {
            None => PluginSelection::All(plugins.clone()),
            Some(filter) => PluginSelection::Matching(
                plugins
                    .values()
                    .filter(|p| filter.matches(p.params()))
                    .cloned()
                    .collect(),
            ),
        }
    }

    /// Snapshot of all plugins in name order.
    pub async fn all(&self) -> Vec<Arc<Plugin>> {
        self.plugins.read().await.values().cloned().collect()
    }

    /// Inserts `plugin`, returning the entry it replaced.
    pub async fn register(&self, plugin: Arc<Plugin>) -> Option<Arc<Plugin>> {
        let name = plugin.name().to_string();
        let replaced = self.plugins.write().await.insert(name.clone(), plugin);
        if replaced.is_some() {
            tracing::warn!(plugin = %name, "plugin re-registered");
        }
        replaced
    }

    /// Number of registered plugins.
    pub async fn len(&self) -> usize {
        self.plugins.read().await.len()
    }

    /// True if no plugin is registered.
    pub async fn is_empty(&self) -> bool {
        self.plugins.read().await.is_empty()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves, validates and constructs one plugin.
fn load_one(
    resolver: &ConfigResolver<'_>,
    factory: &dyn ProbeFactory,
    env: &PluginEnv,
    name: &str,
    options: &Params,
) -> Result<Plugin, LoadError> {
    let params = resolver.resolve(name, options)?;
    let probe = factory.build(name, &params)?;
    let plugin = Plugin::new(
        name,
        params,
        probe,
        env.gate.clone(),
        env.bus.clone(),
        env.default_timeout,
    )?;
    Ok(plugin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, PluginError, ProbeError};
    use crate::plugins::{FactoryFn, ProbeFn, ProbeOutput, ProbeRef, ProbeRequest, SharedProbe};
    use serde_json::json;

    fn sources(v: Value) -> ConfigSources {
        serde_json::from_value(v).unwrap()
    }

    fn ok_probe() -> SharedProbe {
        SharedProbe(ProbeFn::arc(|_req: ProbeRequest| async move {
            Ok::<_, ProbeError>(ProbeOutput::ok("ok"))
        }))
    }

    fn env() -> PluginEnv {
        PluginEnv {
            gate: ConcurrencyGate::new(2),
            bus: Bus::new(64),
            default_timeout: None,
        }
    }

    #[test]
    fn missing_base_template_is_fatal() {
        let src = sources(json!({
            "plugins": { "a": {} },
            "templates": { "Other": {} }
        }));
        let err = PluginRegistry::load_all(&src, &ok_probe(), &env()).err().unwrap();
        assert_eq!(err, ManagerError::Config(ConfigError::BasePluginTemplateNotFound));

        let src = sources(json!({ "plugins": { "a": {} } }));
        let err = PluginRegistry::load_all(&src, &ok_probe(), &env()).err().unwrap();
        assert_eq!(err, ManagerError::Config(ConfigError::BasePluginTemplateNotFound));
    }

    #[tokio::test]
    async fn disabled_and_broken_plugins_are_skipped() {
        let src = sources(json!({
            "plugins": {
                "good": { "Interval": 5 },
                "off": { "Enabled": false },
                "orphan": { "Template": "Missing" },
                "bad": { "Interval": -1 }
            },
            "templates": { "BasePlugin": { "Timeout": 3 } }
        }));
        let (registry, report) = PluginRegistry::load_all(&src, &ok_probe(), &env()).unwrap();

        assert_eq!(report.loaded, vec!["good".to_string()]);
        assert_eq!(report.disabled, vec!["off".to_string()]);
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().any(|f| f.plugin == "orphan"
            && f.error
                == LoadError::Config(ConfigError::TemplateNotFound {
                    name: "Missing".into()
                })));
        assert!(report.failures.iter().any(|f| f.plugin == "bad"
            && matches!(f.error, LoadError::Plugin(PluginError::InvalidParam { .. }))));

        assert_eq!(registry.len().await, 1);
        assert!(matches!(
            registry.get("off").await,
            Err(ManagerError::NoSuchPlugin { .. })
        ));
        let good = registry.get("good").await.unwrap();
        assert_eq!(good.timeout(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn nothing_loaded_is_fatal() {
        let src = sources(json!({
            "plugins": { "off": { "Enabled": false }, "broken": { "Action": "nope" } },
            "templates": { "BasePlugin": {} }
        }));
        let err = PluginRegistry::load_all(&src, &ok_probe(), &env()).err().unwrap();
        assert_eq!(err, ManagerError::NoRunningPlugins { attempted: 1 });
    }

    #[test]
    fn factory_errors_skip_the_plugin() {
        let src = sources(json!({
            "plugins": { "a": { "Kind": "good" }, "b": { "Kind": "weird" } },
            "templates": { "BasePlugin": {} }
        }));
        let shared = ok_probe();
        let factory = FactoryFn::new(
            move |_name: &str, params: &Params| -> Result<ProbeRef, PluginError> {
                match params.get("Kind").and_then(Value::as_str) {
                    Some("good") => Ok(shared.0.clone()),
                    _ => Err(PluginError::Build {
                        error: "unsupported kind".into(),
                    }),
                }
            },
        );
        let (_registry, report) = PluginRegistry::load_all(&src, &factory, &env()).unwrap();
        assert_eq!(report.loaded, vec!["a".to_string()]);
        assert_eq!(report.failures[0].error.as_label(), "plugin_build_failed");
    }

    #[tokio::test]
    async fn list_with_and_without_filter() {
        let src = sources(json!({
            "plugins": {
                "a": { "Template": "Web" },
                "b": { "Role": "db" },
                "c": { "Template": "Web" }
            },
            "templates": { "BasePlugin": { "Role": "generic" }, "Web": { "Role": "web" } }
        }));
        let (registry, _) = PluginRegistry::load_all(&src, &ok_probe(), &env()).unwrap();

        let all = registry.list(None).await;
        assert!(matches!(all, PluginSelection::All(_)));
        assert_eq!(all.names(), vec!["a", "b", "c"]);

        let web = registry.list(Some(&Filter::new("Role", "web"))).await;
        assert!(matches!(web, PluginSelection::Matching(_)));
        assert_eq!(web.names(), vec!["a", "c"]);

        let none = registry.list(Some(&Filter::new("Role", "cache"))).await;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn register_replaces_explicitly() {
        let src = sources(json!({
            "plugins": { "a": {} },
            "templates": { "BasePlugin": {} }
        }));
        let env = env();
        let (registry, _) = PluginRegistry::load_all(&src, &ok_probe(), &env).unwrap();
        let old = registry.get("a").await.unwrap();

        let fresh = Arc::new(
            Plugin::new("a", Params::new(), ok_probe().0, env.gate.clone(), env.bus.clone(), None)
                .unwrap(),
        );
        let replaced = registry.register(fresh.clone()).await.unwrap();
        assert!(Arc::ptr_eq(&replaced, &old));
        assert!(Arc::ptr_eq(&registry.get("a").await.unwrap(), &fresh));
    }
}
