//! # Recorded outcome of one probe execution.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ProbeError;

use super::probe::{ProbeOutput, ProbeStatus};

/// Result of one execution, as stored in a plugin's `last_result` and
/// `forced_result` slots.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunResult {
    /// Reported or derived status.
    pub status: ProbeStatus,
    /// Probe message, or the error text for failed executions.
    pub message: String,
    /// Error label when the probe returned an error.
    pub error: Option<&'static str>,
    /// True when the execution served a forced run.
    pub forced: bool,
    /// Per-plugin run counter (starting from 1).
    pub run: u64,
    /// Wall-clock start of the execution.
    pub started_at: DateTime<Utc>,
    /// Time spent inside the probe (excluding the wait at the gate).
    pub duration: Duration,
}

impl RunResult {
    /// Builds a result from a probe outcome.
    ///
    /// Errors map to `ERROR`, except timeouts and cancellations which map to `UNKNOWN`.
    pub fn from_outcome(
        outcome: &Result<ProbeOutput, ProbeError>,
        forced: bool,
        run: u64,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        let (status, message, error) = match outcome {
            Ok(out) => (out.status, out.message.clone(), None),
            Err(e @ (ProbeError::Timeout { .. } | ProbeError::Canceled)) => {
                (ProbeStatus::Unknown, e.to_string(), Some(e.as_label()))
            }
            Err(e) => (ProbeStatus::Error, e.to_string(), Some(e.as_label())),
        };
        Self {
            status,
            message,
            error,
            forced,
            run,
            started_at,
            duration,
        }
    }

    /// True if the status is `OK`.
    pub fn is_ok(&self) -> bool {
        self.status == ProbeStatus::Ok
    }
}
