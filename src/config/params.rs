//! # Typed parameter maps.
//!
//! [`Params`] is the open key/value map every plugin is configured with.
//! Values are [`serde_json::Value`] so unrecognised keys pass through untouched.
//!
//! [`merge`] applies layers in order; for each key the **last** layer wins:
//! ```text
//! BasePlugin { a:1, b:2 }
//!   < Template { b:3, c:4 }
//!   < options  { c:5, d:6 }
//!   = { a:1, b:3, c:5, d:6 }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PluginError;

/// Parameter map of a plugin, template or action.
pub type Params = BTreeMap<String, Value>;

/// Name of the mandatory root template.
pub const BASE_TEMPLATE: &str = "BasePlugin";

/// Option keys recognised by the manager and the built-in plugin run loop.
pub mod keys {
    /// `false` skips the plugin at load time.
    pub const ENABLED: &str = "Enabled";
    /// Name of the custom template to inherit from.
    pub const TEMPLATE: &str = "Template";
    /// Name of the action to substitute.
    pub const ACTION: &str = "Action";
    /// Seconds between scheduled runs (`0` or absent = forced runs only).
    pub const INTERVAL: &str = "Interval";
    /// Seconds before a probe attempt is abandoned.
    pub const TIMEOUT: &str = "Timeout";
    /// Shell command run by the command probe.
    pub const COMMAND: &str = "Command";
}

/// Merges `layers` in order; later layers override earlier ones per key.
///
/// # Example
/// ```
/// use probevisor::{merge, Params};
/// use serde_json::json;
///
/// let base: Params = [("a".to_string(), json!(1)), ("b".to_string(), json!(2))].into();
/// let over: Params = [("b".to_string(), json!(3))].into();
/// let merged = merge([&base, &over]);
/// assert_eq!(merged["a"], json!(1));
/// assert_eq!(merged["b"], json!(3));
/// ```
pub fn merge<'a, I>(layers: I) -> Params
where
    I: IntoIterator<Item = &'a Params>,
{
    let mut out = Params::new();
    for layer in layers {
        for (key, value) in layer {
            out.insert(key.clone(), value.clone());
        }
    }
    out
}

/// Single key/value equality predicate over resolved plugin parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Parameter key to look up.
    pub key: String,
    /// Value the parameter must equal.
    pub value: Value,
}

impl Filter {
    /// Creates a filter matching `key == value`.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// True if `params` contains exactly this key/value pair.
    pub fn matches(&self, params: &Params) -> bool {
        params.get(&self.key) == Some(&self.value)
    }
}

/// Reads a non-negative number of seconds.
///
/// Absent, `null` and `0` all yield `None`.
pub(crate) fn seconds(params: &Params, key: &str) -> Result<Option<Duration>, PluginError> {
    let value = match params.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };

    let secs = value.as_f64().ok_or_else(|| PluginError::InvalidParam {
        key: key.to_string(),
        reason: format!("expected seconds, got {value}"),
    })?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(PluginError::InvalidParam {
            key: key.to_string(),
            reason: format!("must be a non-negative number, got {secs}"),
        });
    }

    if secs == 0.0 {
        Ok(None)
    } else {
        Ok(Some(Duration::from_secs_f64(secs)))
    }
}
