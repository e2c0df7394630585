//! Disposer - a cleanup action run exactly once when its owner unloads

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::DisposeError;

/// Boxed future returned by a disposer
pub type DisposeFuture = Pin<Box<dyn Future<Output = Result<(), DisposeError>> + Send>>;

/// A labelled, consume-once cleanup action.
///
/// Consuming `self` in [`Disposer::dispose`] is what guarantees a disposer
/// runs at most once.
pub struct Disposer {
    label: String,
    run: Box<dyn FnOnce() -> DisposeFuture + Send>,
}

impl Disposer {
    /// Wrap an async cleanup action
    pub fn new<F, Fut>(label: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), DisposeError>> + Send + 'static,
    {
        Self {
            label: label.into(),
            run: Box::new(move || Box::pin(f())),
        }
    }

    /// Wrap a synchronous cleanup action that cannot fail
    pub fn from_fn<F>(label: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(label, move || {
            f();
            async { Ok(()) }
        })
    }

    /// A disposer with nothing to clean up
    pub fn noop(label: impl Into<String>) -> Self {
        Self::from_fn(label, || {})
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run the cleanup action
    pub async fn dispose(self) -> Result<(), DisposeError> {
        (self.run)().await
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_dispose_runs_action() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let disposer = Disposer::from_fn("count", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(disposer.label(), "count");
        disposer.dispose().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispose_propagates_failure() {
        let disposer = Disposer::new("broken", || async { Err(DisposeError::new("boom")) });
        let err = disposer.dispose().await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_debug_shows_label() {
        let disposer = Disposer::noop("style");
        assert!(format!("{:?}", disposer).contains("style"));
    }
}
