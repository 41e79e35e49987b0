use crate::error::{NetworkError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag a caller can raise to abort a long analysis.
///
/// Clones share the same flag. Checked between scenarios and between
/// augmenting paths, so a raised token stops work within one path search.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn check(&self, operation: &'static str) -> Result<()> {
        if self.is_cancelled() {
            Err(NetworkError::Cancelled { operation })
        } else {
            Ok(())
        }
    }
}
