//! Concurrency gate for outbound calls
//!
//! One gate is shared by every operation of a repository, so the capacity
//! bounds the total number of in-flight remote calls, not the calls of a
//! single operation.

use crate::domain::{Result, SyncError};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Counting permit pool
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Held for the duration of one remote call; released on drop
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    /// Creates a gate with `capacity` permits (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Waits for a permit, or fails with [`SyncError::Canceled`] once `cancel` fires.
    ///
    /// A token that is already cancelled fails even if a permit is free.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<GatePermit> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SyncError::Canceled),
            permit = self.semaphore.clone().acquire_owned() => {
                let permit = permit.map_err(|_| SyncError::Canceled)?;
                Ok(GatePermit { _permit: permit })
            }
        }
    }
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new(1)
    }
}
