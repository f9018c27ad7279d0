// ── Completion-order merge ──
//
// Turns a fixed set of pending operations into one stream that yields each
// result as soon as it resolves. Every operation is spawned up front, so a
// slow one never holds back a fast one.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_core::Stream;
use tokio::task::JoinSet;

use crate::error::CoreError;

/// Start every operation in `pending` and return a stream of their results
/// in completion order.
///
/// A failed or panicked operation surfaces as an `Err` at its position in
/// the stream; the remaining operations keep running and are still
/// yielded. Panics are reported as isolated construction errors. The stream
/// ends after exactly one item per operation. Dropping it aborts whatever is
/// still pending.
///
/// Must be called from within a Tokio runtime.
pub fn in_completion_order<I, F, T>(pending: I) -> CompletionOrder<T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, CoreError>> + Send + 'static,
    T: Send + 'static,
{
    let mut tasks = JoinSet::new();
    for operation in pending {
        tasks.spawn(operation);
    }
    CompletionOrder { tasks }
}

/// Stream returned by [`in_completion_order`].
pub struct CompletionOrder<T> {
    tasks: JoinSet<Result<T, CoreError>>,
}

impl<T> CompletionOrder<T> {
    /// Number of operations that have not been yielded yet.
    pub fn remaining(&self) -> usize {
        self.tasks.len()
    }
}

impl<T: 'static> Stream for CompletionOrder<T> {
    type Item = Result<T, CoreError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match ready!(this.tasks.poll_join_next(cx)) {
            None => Poll::Ready(None),
            Some(Ok(result)) => Poll::Ready(Some(result)),
            // A panicked operation only loses its own slot in the sequence.
            Some(Err(join_error)) => Poll::Ready(Some(Err(CoreError::construction(
                "entity",
                format!("pending operation did not finish: {join_error}"),
            )))),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.tasks.len();
        (remaining, Some(remaining))
    }
}

impl<T> std::fmt::Debug for CompletionOrder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionOrder")
            .field("remaining", &self.tasks.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use futures::future::BoxFuture;
    use pretty_assertions::assert_eq;

    use super::*;

    fn after(ms: u64, value: u32) -> BoxFuture<'static, Result<u32, CoreError>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(value)
        })
    }

    fn failing_after(ms: u64) -> BoxFuture<'static, Result<u32, CoreError>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Err(CoreError::construction("test", "bad entry"))
        })
    }

    #[tokio::test(start_paused = true)]
    async fn yields_in_completion_order() {
        let merged = in_completion_order(vec![after(30, 1), after(10, 2), after(20, 3)]);
        let values: Vec<u32> = merged.map(Result::unwrap).collect().await;
        assert_eq!(values, vec![2, 3, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_does_not_abort_siblings() {
        let mut merged =
            in_completion_order(vec![after(30, 1), failing_after(10), after(20, 3)]);

        assert!(merged.next().await.unwrap().is_err());
        assert_eq!(merged.next().await.unwrap().unwrap(), 3);
        assert_eq!(merged.next().await.unwrap().unwrap(), 1);
        assert!(merged.next().await.is_none());
    }

    #[tokio::test]
    async fn empty_input_yields_nothing() {
        let mut merged =
            in_completion_order(Vec::<BoxFuture<'static, Result<u32, CoreError>>>::new());
        assert_eq!(merged.remaining(), 0);
        assert!(merged.next().await.is_none());
    }

    #[tokio::test]
    async fn panicking_operation_surfaces_as_error() {
        let panicking: BoxFuture<'static, Result<u32, CoreError>> =
            Box::pin(async { panic!("constructor exploded") });
        let mut merged = in_completion_order(vec![panicking]);

        let err = merged.next().await.unwrap().unwrap_err();
        assert!(err.is_isolated());
        assert!(err.to_string().contains("constructor exploded"));
        assert!(merged.next().await.is_none());
    }
}
