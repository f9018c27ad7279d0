// ── Cooperative cancellation ──
//
// One token per scan. Consumers poll it between discovery steps; it never
// interrupts an in-flight operation on its own.

use tokio_util::sync::CancellationToken;

/// One-way cancellation flag shared between a scan task and its manager.
///
/// Clones observe the same flag. Once [`cancel`](Self::cancel) has been
/// called the token stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: CancellationToken,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn cancellation_requested(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn starts_uncancelled() {
        assert!(!CancelToken::new().cancellation_requested());
    }

    #[test]
    fn cancel_is_idempotent_and_shared_by_clones() {
        let token = CancelToken::new();
        let observer = token.clone();

        token.cancel();
        token.cancel();

        assert!(token.cancellation_requested());
        assert!(observer.cancellation_requested());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cancelled() should resolve")
            .expect("waiter task should not panic");
    }
}
