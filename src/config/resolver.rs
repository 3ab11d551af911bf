//! # Template and action resolution.
//!
//! [`ConfigResolver`] turns a plugin's raw options into its final [`Params`]:
//! ```text
//! resolve(name, options)
//!   ├─► base     = templates["BasePlugin"]        (missing → fatal)
//!   ├─► custom   = templates[options.Template]    (if any)
//!   ├─► options.Action = actions[options.Action]  (if any, substituted in place)
//!   └─► merge(base, custom, options)
//! ```

use serde_json::Value;

use crate::error::ConfigError;

use super::params::{keys, merge, Params, BASE_TEMPLATE};
use super::sources::ConfigSources;

/// Read-only view over [`ConfigSources`] that resolves plugin parameters.
#[derive(Clone, Copy, Debug)]
pub struct ConfigResolver<'a> {
    sources: &'a ConfigSources,
}

impl<'a> ConfigResolver<'a> {
    /// Creates a resolver over the given sources.
    pub fn new(sources: &'a ConfigSources) -> Self {
        Self { sources }
    }

    /// Returns the parameters of template `name`.
    pub fn get_template(&self, name: &str) -> Result<&'a Params, ConfigError> {
        let templates = self
            .sources
            .templates
            .as_ref()
            .ok_or(ConfigError::NoTemplatesConfigured)?;
        templates
            .get(name)
            .ok_or_else(|| ConfigError::TemplateNotFound {
                name: name.to_string(),
            })
    }

    /// Returns the parameters of action `name`.
    pub fn get_action(&self, name: &str) -> Result<&'a Params, ConfigError> {
        let actions = self
            .sources
            .actions
            .as_ref()
            .ok_or(ConfigError::NoActionsConfigured)?;
        actions.get(name).ok_or_else(|| ConfigError::ActionNotFound {
            name: name.to_string(),
        })
    }

    /// Returns the `BasePlugin` template or the fatal [`ConfigError::BasePluginTemplateNotFound`].
    pub fn base(&self) -> Result<&'a Params, ConfigError> {
        self.get_template(BASE_TEMPLATE)
            .map_err(|_| ConfigError::BasePluginTemplateNotFound)
    }

    /// Resolves the final parameters of `plugin` from its raw `options`.
    pub fn resolve(&self, plugin: &str, options: &Params) -> Result<Params, ConfigError> {
        let base = self.base()?;

        let custom = match options.get(keys::TEMPLATE) {
            Some(value) => Some(self.get_template(reference(keys::TEMPLATE, value)?)?),
            None => None,
        };

        let mut own = options.clone();
        if let Some(value) = options.get(keys::ACTION) {
            let action = self.get_action(reference(keys::ACTION, value)?)?;
            let action = action
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<serde_json::Map<String, Value>>();
            own.insert(keys::ACTION.to_string(), Value::Object(action));
        }

        tracing::debug!(
            plugin,
            template = ?options.get(keys::TEMPLATE),
            "resolved plugin parameters"
        );

        let empty = Params::new();
        Ok(merge([base, custom.unwrap_or(&empty), &own]))
    }
}

/// Extracts a template/action name from an option value.
fn reference<'v>(key: &'static str, value: &'v Value) -> Result<&'v str, ConfigError> {
    value.as_str().ok_or_else(|| ConfigError::InvalidReference {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn params(v: Value) -> Params {
        serde_json::from_value(v).unwrap()
    }

    fn map(v: Value) -> BTreeMap<String, Params> {
        serde_json::from_value(v).unwrap()
    }

    fn sources() -> ConfigSources {
        ConfigSources::default()
            .with_templates(map(json!({
                "BasePlugin": {"a": 1, "b": 2},
                "T": {"b": 3, "c": 4}
            })))
            .with_actions(map(json!({
                "restart": {"Command": "systemctl restart app"}
            })))
    }

    #[test]
    fn merge_precedence_base_template_options() {
        let src = sources();
        let resolver = ConfigResolver::new(&src);
        let resolved = resolver
            .resolve("p", &params(json!({"c": 5, "d": 6, "Template": "T"})))
            .unwrap();

        assert_eq!(
            resolved,
            params(json!({"a": 1, "b": 3, "c": 5, "d": 6, "Template": "T"}))
        );
    }

    #[test]
    fn without_template_only_base_applies() {
        let src = sources();
        let resolved = ConfigResolver::new(&src)
            .resolve("p", &params(json!({"b": 9})))
            .unwrap();
        assert_eq!(resolved, params(json!({"a": 1, "b": 9})));
    }

    #[test]
    fn action_is_substituted_in_place() {
        let src = sources();
        let resolved = ConfigResolver::new(&src)
            .resolve("p", &params(json!({"Action": "restart"})))
            .unwrap();
        assert_eq!(
            resolved["Action"],
            json!({"Command": "systemctl restart app"})
        );
    }

    #[test]
    fn lookup_errors() {
        let src = sources();
        let resolver = ConfigResolver::new(&src);
        assert_eq!(
            resolver.get_template("nope"),
            Err(ConfigError::TemplateNotFound {
                name: "nope".into()
            })
        );
        assert_eq!(
            resolver.get_action("nope"),
            Err(ConfigError::ActionNotFound {
                name: "nope".into()
            })
        );
        assert!(matches!(
            resolver.resolve("p", &params(json!({"Template": 7}))),
            Err(ConfigError::InvalidReference { key: "Template", .. })
        ));

        let bare = ConfigSources::default();
        let resolver = ConfigResolver::new(&bare);
        assert_eq!(
            resolver.get_template("T"),
            Err(ConfigError::NoTemplatesConfigured)
        );
        assert_eq!(
            resolver.get_action("a"),
            Err(ConfigError::NoActionsConfigured)
        );
        assert_eq!(
            resolver.base(),
            Err(ConfigError::BasePluginTemplateNotFound)
        );
    }
}
