//! # Probe abstraction.
//!
//! A [`Probe`] performs one health check and reports a [`ProbeOutput`].
//! It receives a [`ProbeRequest`] carrying the plugin's resolved parameters
//! and a [`CancellationToken`] that is cancelled on shutdown or timeout.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::Params;
use crate::error::ProbeError;

/// Health status reported by a probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeStatus {
    /// Check passed.
    Ok,
    /// Check passed with a warning.
    Warn,
    /// Check failed.
    Error,
    /// Check could not determine the state.
    Unknown,
}

/// Successful probe output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutput {
    /// Reported status.
    pub status: ProbeStatus,
    /// Free-form message (command output, metric summary, ...).
    pub message: String,
}

impl ProbeOutput {
    /// Creates an output with the given status and message.
    pub fn new(status: ProbeStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Shorthand for an `OK` output.
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(ProbeStatus::Ok, message)
    }
}

/// Input of one probe execution.
#[derive(Clone, Debug)]
pub struct ProbeRequest {
    /// Plugin name.
    pub plugin: Arc<str>,
    /// Resolved plugin parameters.
    pub params: Arc<Params>,
    /// True when this execution was requested through `add_process`.
    pub forced: bool,
    /// Cancelled on plugin shutdown or when the timeout elapses.
    pub ctx: CancellationToken,
}

/// # Asynchronous, cancelable health check.
///
/// Implementors should watch `req.ctx` and return [`ProbeError::Canceled`]
/// promptly once it is cancelled.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    /// Executes the check once.
    async fn run(&self, req: ProbeRequest) -> Result<ProbeOutput, ProbeError>;
}

/// Shared handle to a probe.
pub type ProbeRef = Arc<dyn Probe>;
