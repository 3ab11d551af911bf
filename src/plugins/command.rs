//! # Shell command probe.
//!
//! [`CommandProbe`] runs the plugin's `Command` through `sh -c` and maps the
//! exit code the usual monitoring way:
//!
//! | exit code | status    |
//! |-----------|-----------|
//! | 0         | `OK`      |
//! | 1         | `WARN`    |
//! | 2         | `ERROR`   |
//! | other     | `UNKNOWN` |
//!
//! The command is taken from the `Command` parameter, or from the `Command`
//! of the substituted `Action` when the plugin references one.

use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use crate::config::{keys, Params};
use crate::error::{PluginError, ProbeError};

use super::factory::ProbeFactory;
use super::probe::{Probe, ProbeOutput, ProbeRef, ProbeRequest, ProbeStatus};

/// Probe running a shell command.
#[derive(Clone, Debug)]
pub struct CommandProbe {
    command: String,
}

impl CommandProbe {
    /// Creates a probe for `command`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Extracts the command from resolved parameters.
    pub fn from_params(params: &Params) -> Result<Self, PluginError> {
        let command = match params.get(keys::COMMAND) {
            Some(value) => Some(value),
            None => params
                .get(keys::ACTION)
                .and_then(Value::as_object)
                .and_then(|action| action.get(keys::COMMAND)),
        };

        match command {
            Some(Value::String(cmd)) if !cmd.trim().is_empty() => Ok(Self::new(cmd.clone())),
            Some(other) => Err(PluginError::InvalidParam {
                key: keys::COMMAND.to_string(),
                reason: format!("expected a non-empty string, got {other}"),
            }),
            None => Err(PluginError::MissingParam {
                key: keys::COMMAND.to_string(),
            }),
        }
    }

    /// The shell command line.
    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl Probe for CommandProbe {
    async fn run(&self, req: ProbeRequest) -> Result<ProbeOutput, ProbeError> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProbeError::Fail {
                error: format!("spawn `{}`: {e}", self.command),
            })?;

        let output = tokio::select! {
            out = child.wait_with_output() => out.map_err(|e| ProbeError::Fail {
                error: format!("wait `{}`: {e}", self.command),
            })?,
            _ = req.ctx.cancelled() => return Err(ProbeError::Canceled),
        };

        let text = if output.stdout.is_empty() {
            &output.stderr
        } else {
            &output.stdout
        };
        let message = String::from_utf8_lossy(text).trim().to_string();

        let status = match output.status.code() {
            Some(0) => ProbeStatus::Ok,
            Some(1) => ProbeStatus::Warn,
            Some(2) => ProbeStatus::Error,
            _ => ProbeStatus::Unknown,
        };
        Ok(ProbeOutput { status, message })
    }
}

/// Factory building a [`CommandProbe`] per plugin from its parameters.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommandProbeFactory;

impl ProbeFactory for CommandProbeFactory {
    fn build(&self, _plugin: &str, params: &Params) -> Result<ProbeRef, PluginError> {
        Ok(std::sync::Arc::new(CommandProbe::from_params(params)?))
    }
}
