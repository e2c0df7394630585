//! ReadyBarrier - single-resolve signal shared by one registration batch

use std::sync::Arc;

use tokio::sync::watch;

/// A one-shot "batch finished" signal.
///
/// Cloning shares the signal. Resolving is idempotent: only the first call
/// has an effect, and waiters that arrive after resolution return at once.
#[derive(Debug, Clone)]
pub struct ReadyBarrier {
    tx: Arc<watch::Sender<bool>>,
}

impl ReadyBarrier {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Resolve the barrier. Returns `true` only for the call that resolved it.
    pub fn resolve(&self) -> bool {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    pub fn is_resolved(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the barrier resolves
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

impl Default for ReadyBarrier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_resolves_at_most_once() {
        let barrier = ReadyBarrier::new();
        assert!(!barrier.is_resolved());
        assert!(barrier.resolve());
        assert!(!barrier.resolve());
        assert!(barrier.is_resolved());
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_resolved() {
        let barrier = ReadyBarrier::new();
        barrier.resolve();
        tokio::time::timeout(Duration::from_millis(100), barrier.wait())
            .await
            .expect("resolved barrier should not block");
    }

    #[tokio::test]
    async fn test_waiters_unblock_on_resolve() {
        let barrier = ReadyBarrier::new();
        let waiter = {
            let barrier = barrier.clone();
            tokio::spawn(async move { barrier.wait().await })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        barrier.resolve();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
    }
}
