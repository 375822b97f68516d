//! Cooperative cancellation shared between the CLI, signal handlers
//! and in-flight lifecycle operations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Clonable one-shot cancellation flag.
///
/// Cancellation is cooperative: holders observe it between steps, an
/// OS request already issued is never rolled back.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
