//! # Raw configuration input.
//!
//! [`ConfigSources`] holds the three maps an external loader supplies:
//! plugins, templates and actions. `templates`/`actions` are `Option` so that
//! "not configured at all" stays distinguishable from "configured but empty".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::params::Params;

/// The plugins, templates and actions maps.
///
/// ## Example
/// ```
/// use probevisor::ConfigSources;
///
/// let sources = ConfigSources::from_json_str(r#"{
///     "templates": { "BasePlugin": { "Interval": 60 } },
///     "plugins":   { "uptime": { "Command": "uptime" } }
/// }"#).unwrap();
/// assert!(sources.actions.is_none());
/// assert_eq!(sources.plugins.len(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSources {
    /// Plugin name → options.
    #[serde(default)]
    pub plugins: BTreeMap<String, Params>,

    /// Template name → default parameters. Must contain `BasePlugin`.
    #[serde(default)]
    pub templates: Option<BTreeMap<String, Params>>,

    /// Action name → parameters.
    #[serde(default)]
    pub actions: Option<BTreeMap<String, Params>>,
}

impl ConfigSources {
    /// Creates sources with plugins only (no templates, no actions).
    pub fn new(plugins: BTreeMap<String, Params>) -> Self {
        Self {
            plugins,
            templates: None,
            actions: None,
        }
    }

    /// Sets the templates map.
    pub fn with_templates(mut self, templates: BTreeMap<String, Params>) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Sets the actions map.
    pub fn with_actions(mut self, actions: BTreeMap<String, Params>) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Parses sources from a JSON document with `plugins`, `templates` and `actions` keys.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
