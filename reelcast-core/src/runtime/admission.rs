use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::runtime::types::PipelineError;

/// RAII guard for one transcode slot; dropping it releases the slot.
///
/// Callers must hold this for the full duration of the ffmpeg composition.
pub struct Permit {
    #[allow(dead_code)]
    permit: OwnedSemaphorePermit,
}

impl std::fmt::Debug for Permit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit").finish()
    }
}

/// Admission control for the composition stage.
///
/// A burst of start requests would otherwise spawn one ffmpeg process per
/// job with no upper bound. Every job must [`acquire`] a permit before its
/// composition runs; excess jobs queue on the semaphore and proceed in
/// arrival order as slots free up.
///
/// [`acquire`]: TranscodePool::acquire
#[derive(Debug, Clone)]
pub struct TranscodePool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl TranscodePool {
    /// Create a pool allowing at most `capacity` concurrent compositions.
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wait for a transcode slot.
    ///
    /// Suspends the calling job until a slot is free. Fails only if the
    /// semaphore has been closed, which does not happen during normal
    /// operation.
    pub async fn acquire(&self) -> Result<Permit, PipelineError> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map(|permit| Permit { permit })
            .map_err(|_| PipelineError::PoolClosed)
    }

    /// Take a slot immediately, or `None` if all slots are held.
    pub fn try_acquire(&self) -> Option<Permit> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .ok()
            .map(|permit| Permit { permit })
    }
}
