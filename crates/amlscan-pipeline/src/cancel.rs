//! Cooperative cancellation and stage timing.
//!
//! A run is cancellable at stage boundaries only; all writes are
//! transactional, so a cancelled run leaves no half-written state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use amlscan_core::{AmlError, AmlResult};

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the run stops at the next stage boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Stage boundary guard: checks cancellation and the stage deadline.
pub struct StageGuard {
    token: CancellationToken,
    started: Instant,
    timeout_ms: Option<u64>,
}

impl StageGuard {
    pub fn new(token: CancellationToken, timeout_ms: Option<u64>) -> Self {
        Self {
            token,
            started: Instant::now(),
            timeout_ms,
        }
    }

    /// Call between stages; errors end the run.
    pub fn checkpoint(&self, next_stage: &str) -> AmlResult<()> {
        if self.token.is_cancelled() {
            return Err(AmlError::Cancelled {
                stage: next_stage.to_string(),
            });
        }
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        if let Some(limit) = self.timeout_ms {
            if elapsed_ms > limit {
                return Err(AmlError::stage_timeout(next_stage, elapsed_ms));
            }
        }
        Ok(())
    }

    /// Seconds since the run started.
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}
