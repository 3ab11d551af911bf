//! Error types used by the probevisor manager, its plugins and probes.
//!
//! - [`ConfigError`] template/action resolution failures.
//! - [`PluginError`] per-plugin construction and parameter validation failures.
//! - [`LoadError`] why a single configured plugin was skipped.
//! - [`ManagerError`] errors surfaced by [`PluginManager`](crate::PluginManager) operations.
//! - [`ProbeError`] outcome of a single failed probe attempt.
//! - [`RuntimeError`] signal-driven runtime failures.
//!
//! Every enum provides `as_label()` returning a short stable snake_case label
//! for logs and metrics.

use std::time::Duration;
use thiserror::Error;

/// # Configuration resolution errors.
///
/// All variants except [`ConfigError::BasePluginTemplateNotFound`] are
/// recoverable during loading: the affected plugin is skipped.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No templates map was supplied at all.
    #[error("no templates configured")]
    NoTemplatesConfigured,

    /// Templates exist but the requested one does not.
    #[error("can't find configured template {name}")]
    TemplateNotFound {
        /// Requested template name.
        name: String,
    },

    /// No actions map was supplied at all.
    #[error("no actions configured")]
    NoActionsConfigured,

    /// Actions exist but the requested one does not.
    #[error("can't find configured action {name}")]
    ActionNotFound {
        /// Requested action name.
        name: String,
    },

    /// The mandatory `BasePlugin` template is missing. Fatal for the whole manager.
    #[error("required BasePlugin template is not configured")]
    BasePluginTemplateNotFound,

    /// A `Template` or `Action` option is not a name.
    #[error("option {key} must be a name, got {value}")]
    InvalidReference {
        /// Option key (`Template` or `Action`).
        key: &'static str,
        /// Rendered offending value.
        value: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::NoTemplatesConfigured => "config_no_templates",
            ConfigError::TemplateNotFound { .. } => "config_template_not_found",
            ConfigError::NoActionsConfigured => "config_no_actions",
            ConfigError::ActionNotFound { .. } => "config_action_not_found",
            ConfigError::BasePluginTemplateNotFound => "config_base_template_missing",
            ConfigError::InvalidReference { .. } => "config_invalid_reference",
        }
    }

    /// True if this error must abort manager construction.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ConfigError::BasePluginTemplateNotFound)
    }
}

/// # Plugin construction errors.
///
/// Raised while validating resolved parameters or building the probe.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    /// A recognised parameter has an unusable value.
    #[error("invalid parameter {key}: {reason}")]
    InvalidParam {
        /// Parameter key.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A parameter required by the probe is absent.
    #[error("missing parameter {key}")]
    MissingParam {
        /// Parameter key.
        key: String,
    },

    /// The probe factory refused to build a probe.
    #[error("probe construction failed: {error}")]
    Build {
        /// The underlying error message.
        error: String,
    },
}

impl PluginError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PluginError::InvalidParam { .. } => "plugin_invalid_param",
            PluginError::MissingParam { .. } => "plugin_missing_param",
            PluginError::Build { .. } => "plugin_build_failed",
        }
    }
}

/// # Why a configured plugin was not loaded.
///
/// Recorded per plugin in the registry's load report; never aborts loading.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Template or action resolution failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Parameter validation or probe construction failed.
    #[error(transparent)]
    Plugin(#[from] PluginError),
}

impl LoadError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LoadError::Config(e) => e.as_label(),
            LoadError::Plugin(e) => e.as_label(),
        }
    }
}

/// # Errors produced by manager operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManagerError {
    /// Fatal configuration error (missing `BasePlugin` template).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Every configured plugin was attempted and none could be loaded.
    #[error("no running plugins: {attempted} configured, none loaded")]
    NoRunningPlugins {
        /// Number of configured entries that were attempted.
        attempted: usize,
    },

    /// Plugin lookup by name failed.
    #[error("plugin {name} not found")]
    NoSuchPlugin {
        /// Requested plugin name.
        name: String,
    },

    /// A forced run resolved to an empty plugin set.
    #[error("no plugins found")]
    NoPluginsFound,

    /// Process handle is zero or past the end of the ledger.
    #[error("process {handle} not found")]
    ProcessNotFound {
        /// Requested handle.
        handle: usize,
    },
}

impl ManagerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ManagerError::Config(e) => e.as_label(),
            ManagerError::NoRunningPlugins { .. } => "manager_no_running_plugins",
            ManagerError::NoSuchPlugin { .. } => "manager_no_such_plugin",
            ManagerError::NoPluginsFound => "manager_no_plugins_found",
            ManagerError::ProcessNotFound { .. } => "manager_process_not_found",
        }
    }
}

/// # Errors produced by a probe attempt.
///
/// The plugin turns these into a [`RunResult`](crate::RunResult); only
/// [`ProbeError::Fatal`] stops the plugin's run loop.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Probe execution exceeded its timeout duration.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Probe could not produce a result this time.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Probe can never succeed; the plugin stops running it.
    #[error("fatal error (plugin stopped): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Probe was cancelled because the plugin is shutting down.
    #[error("context cancelled")]
    Canceled,
}

impl ProbeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use probevisor::ProbeError;
    /// use std::time::Duration;
    ///
    /// let err = ProbeError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "probe_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProbeError::Timeout { .. } => "probe_timeout",
            ProbeError::Fail { .. } => "probe_failed",
            ProbeError::Fatal { .. } => "probe_fatal",
            ProbeError::Canceled => "probe_canceled",
        }
    }
}

/// # Errors produced by the signal-driven runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some plugins were still running.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of plugins that did not stop in time.
        stuck: Vec<String>,
    },

    /// OS signal handlers could not be installed.
    #[error("signal handler registration failed: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}
