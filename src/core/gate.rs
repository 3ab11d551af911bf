//! # Concurrency gate shared by every plugin.
//!
//! [`ConcurrencyGate`] is a counting semaphore sized once at construction.
//! A plugin acquires one [`GatePermit`] right before running its probe; the
//! permit is released on drop, whatever the probe's outcome.
//!
//! ```text
//! plugin A ──┐                    ┌──► probe A
//! plugin B ──┼──► [gate: N] ──────┼──► probe B
//! plugin C ──┘    (waiters queue) └──► ...  (never more than N)
//! ```

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounded concurrency primitive for probe executions.
///
/// Cheap to clone; all clones share the same permits.
#[derive(Clone, Debug)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// One unit of the gate; released when dropped.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

/// The gate was closed while waiting for a permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("concurrency gate closed")]
pub struct GateClosed;

impl ConcurrencyGate {
    /// Creates a gate with `capacity` permits (clamped to a minimum of 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Creates a gate sized to [`ConcurrencyGate::default_capacity`].
    pub fn with_default_capacity() -> Self {
        Self::new(Self::default_capacity())
    }

    /// Number of online logical processors + 2.
    pub fn default_capacity() -> usize {
        num_cpus::get() + 2
    }

    /// Total number of permits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Permits currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }

    /// Waits for a permit.
    ///
    /// Cancel-safe: dropping the future gives up the place in the queue.
    pub async fn acquire(&self) -> Result<GatePermit, GateClosed> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| GateClosed)?;
        Ok(GatePermit { _permit: permit })
    }

    /// Closes the gate: pending and future `acquire` calls fail with [`GateClosed`].
    pub fn close(&self) {
        self.semaphore.close();
    }
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn capacity_is_clamped_and_default_sized() {
        assert_eq!(ConcurrencyGate::new(0).capacity(), 1);
        assert_eq!(
            ConcurrencyGate::with_default_capacity().capacity(),
            num_cpus::get() + 2
        );
    }

    #[tokio::test]
    async fn permits_are_released_on_drop() {
        let gate = ConcurrencyGate::new(2);
        let a = gate.acquire().await.unwrap();
        let _b = gate.acquire().await.unwrap();
        assert_eq!(gate.in_flight(), 2);

        let blocked = tokio::time::timeout(Duration::from_millis(20), gate.acquire()).await;
        assert!(blocked.is_err());

        drop(a);
        assert_eq!(gate.available(), 1);
        assert!(gate.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn closed_gate_rejects_waiters() {
        let gate = ConcurrencyGate::new(1);
        let _held = gate.acquire().await.unwrap();
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.acquire().await.map(|_| ()) })
        };
        tokio::task::yield_now().await;
        gate.close();
        assert_eq!(waiter.await.unwrap(), Err(GateClosed));
    }
}
