//! # Process ledger: append-only log of forced-run requests.
//!
//! Each [`ProcessRecord`] is the set of plugins one caller asked to run now.
//! Handles are 1-based positions in the ledger and stay valid for the
//! manager's lifetime.
//!
//! ## Rules
//! - Handle `0` is never assigned.
//! - Appending forces every plugin of the record (`force = true`,
//!   `forced_result` cleared, loop woken), even if it was already forced.
//! - A record reads its plugins' *current* `forced_result`: a later request
//!   touching the same plugin supersedes earlier ones.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::ManagerError;
use crate::plugins::{Plugin, RunResult};

/// One forced-run request.
#[derive(Debug)]
pub struct ProcessRecord {
    handle: usize,
    plugins: Vec<Arc<Plugin>>,
    created_at: DateTime<Utc>,
}

impl ProcessRecord {
    /// The 1-based handle of this record.
    pub fn handle(&self) -> usize {
        self.handle
    }

    /// Plugins targeted by this request, in request order.
    pub fn plugins(&self) -> &[Arc<Plugin>] {
        &self.plugins
    }

    /// When the request was made.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current forced results, `None` for plugins still pending.
    pub fn results(&self) -> Vec<(String, Option<RunResult>)> {
        self.plugins
            .iter()
            .map(|p| (p.name().to_string(), p.forced_result()))
            .collect()
    }

    /// True once every targeted plugin has a forced result.
    pub fn is_finished(&self) -> bool {
        self.plugins.iter().all(|p| p.forced_result().is_some())
    }

    /// Waits until every targeted plugin has a forced result or has stopped.
    ///
    /// Stopped plugins report `None`.
    pub async fn wait(&self) -> Vec<(String, Option<RunResult>)> {
        let mut out = Vec::with_capacity(self.plugins.len());
        for plugin in &self.plugins {
            out.push((plugin.name().to_string(), plugin.wait_forced_result().await));
        }
        out
    }
}

/// Append-only store of [`ProcessRecord`]s.
#[derive(Default)]
pub struct ProcessLedger {
    records: RwLock<Vec<Arc<ProcessRecord>>>,
}

impl ProcessLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces each of `plugins`, appends a record for them and returns it.
    ///
    /// The record is published only after every plugin's previous forced
    /// result has been cleared.
    ///
    /// `plugins` must be non-empty; the caller resolves and checks the target set.
    pub async fn append(&self, plugins: Vec<Arc<Plugin>>) -> Arc<ProcessRecord> {
        let mut records = self.records.write().await;
        let record = Arc::new(ProcessRecord {
            handle: records.len() + 1,
            plugins,
            created_at: Utc::now(),
        });
        for plugin in &record.plugins {
            plugin.force_run();
        }
        records.push(Arc::clone(&record));
        record
    }

    /// Returns the record with the given 1-based handle.
    pub async fn get(&self, handle: usize) -> Result<Arc<ProcessRecord>, ManagerError> {
        let records = self.records.read().await;
        handle
            .checked_sub(1)
            .and_then(|idx| records.get(idx))
            .cloned()
            .ok_or(ManagerError::ProcessNotFound { handle })
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// True if no request was ever recorded.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
