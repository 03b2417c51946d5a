//! Cooperative cancellation token

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared, set-once cancellation signal.
///
/// Setting the token never interrupts in-flight work; pipelines poll it
/// between discrete units (one playlist, one track) and unwind cleanly at
/// the next check. Once set it can never be unset.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
