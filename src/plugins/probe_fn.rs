//! # Function-backed probe (`ProbeFn`)
//!
//! [`ProbeFn`] wraps a closure `F: Fn(ProbeRequest) -> Fut`, producing a fresh
//! future per execution. Shared state goes into an explicit `Arc<...>` captured
//! by the closure.
//!
//! ## Example
//! ```rust
//! use probevisor::{ProbeError, ProbeFn, ProbeOutput, ProbeRef, ProbeRequest};
//!
//! let p: ProbeRef = ProbeFn::arc(|req: ProbeRequest| async move {
//!     Ok::<_, ProbeError>(ProbeOutput::ok(format!("{} alive", req.plugin)))
//! });
//! # let _ = p;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProbeError;

use super::probe::{Probe, ProbeOutput, ProbeRequest};

/// Function-backed probe implementation.
#[derive(Debug)]
pub struct ProbeFn<F> {
    f: F,
}

impl<F, Fut> ProbeFn<F>
where
    F: Fn(ProbeRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ProbeOutput, ProbeError>> + Send + 'static,
{
    /// Creates a new function-backed probe.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the probe and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Probe for ProbeFn<F>
where
    F: Fn(ProbeRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ProbeOutput, ProbeError>> + Send + 'static,
{
    async fn run(&self, req: ProbeRequest) -> Result<ProbeOutput, ProbeError> {
        (self.f)(req).await
    }
}
