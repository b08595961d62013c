//! Concurrent fan-out
//!
//! Bulk verbs drain their source, spawn one task per item and reap the tasks in
//! completion order. A failed item is reported at the point it is reaped;
//! siblings keep running unless [`FanOut::cancel_on_failure`] is set. Dropping
//! the result stream detaches the remaining tasks rather than aborting them.

use super::collection::{Collection, ResourceCollection};
use super::Resource;
use crate::error::{Error, Result};
use crate::persist::{Persistence, TableDescriptor};
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Fan-out settings
#[derive(Debug, Clone, Copy, Default)]
pub struct FanOut {
    cancel_on_failure: bool,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort in-flight siblings and end the stream after the first failure
    pub fn cancel_on_failure(mut self, cancel: bool) -> Self {
        self.cancel_on_failure = cancel;
        self
    }

    /// Run `op` over every item of `source` concurrently.
    ///
    /// The source is fully drained before any task starts. A source error is
    /// yielded and ends the stream without starting anything.
    pub fn run<T, U, F, Fut>(self, verb: &'static str, source: Collection<T>, op: F) -> Collection<U>
    where
        T: Send + 'static,
        U: Send + 'static,
        F: Fn(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<U>> + Send + 'static,
    {
        let cancel_on_failure = self.cancel_on_failure;

        Collection::from_try_stream(async_stream::stream! {
            let items = match source.all().await {
                Ok(items) => items,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };

            tracing::info!("Fan-out {}: starting {} calls", verb, items.len());

            let mut pending: FuturesUnordered<JoinHandle<Result<U>>> =
                items.into_iter().map(|item| tokio::spawn(op(item))).collect();

            while let Some(joined) = pending.next().await {
                let result = joined.unwrap_or_else(|e| Err(Error::Task(e.to_string())));

                if let Err(e) = &result {
                    tracing::warn!("Fan-out {}: call failed: {}", verb, e);
                }

                let stop = result.is_err() && cancel_on_failure;
                if stop {
                    tracing::info!("Fan-out {}: aborting {} in-flight calls", verb, pending.len());
                    for handle in pending.iter() {
                        handle.abort();
                    }
                }

                yield result;

                if stop {
                    return;
                }
            }
        })
    }

    pub fn create(self, items: ResourceCollection) -> ResourceCollection {
        self.run("create", items, |mut resource: Resource| async move {
            resource.create().await?;
            Ok(resource)
        })
    }

    pub fn commit(self, items: ResourceCollection) -> ResourceCollection {
        self.run("commit", items, |mut resource: Resource| async move {
            resource.commit().await?;
            Ok(resource)
        })
    }

    pub fn delete(self, items: ResourceCollection) -> ResourceCollection {
        self.run("delete", items, |resource: Resource| async move {
            resource.delete().await?;
            Ok(resource)
        })
    }

    pub fn to_sql(
        self,
        items: ResourceCollection,
        sink: Arc<dyn Persistence>,
        table: Arc<TableDescriptor>,
    ) -> ResourceCollection {
        self.run("to_sql", items, move |resource: Resource| {
            let sink = Arc::clone(&sink);
            let table = Arc::clone(&table);
            async move {
                resource.to_sql(sink.as_ref(), &table).await?;
                Ok(resource)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_arrive_in_completion_order() {
        let source = Collection::from_items(vec![30u64, 10, 20]);
        let out = FanOut::new()
            .run("sleep", source, |ms| async move {
                tokio::time::sleep(Duration::from_millis(ms * 5)).await;
                Ok(ms)
            })
            .all()
            .await
            .unwrap();
        assert_eq!(out, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn test_failure_reported_once_and_siblings_continue() {
        let source = Collection::from_items(vec![1, 2, 3, 4, 5]);
        let results: Vec<_> = FanOut::new()
            .run("check", source, |n| async move {
                tokio::time::sleep(Duration::from_millis(n * 5)).await;
                if n == 3 {
                    Err(Error::MissingId)
                } else {
                    Ok(n)
                }
            })
            .collect()
            .await;

        assert_eq!(results.len(), 5);
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
        let ok: Vec<_> = results.into_iter().filter_map(|r| r.ok()).collect();
        assert_eq!(ok, vec![1, 2, 4, 5]);
    }

    #[tokio::test]
    async fn test_cancel_on_failure_ends_stream() {
        let source = Collection::from_items(vec![1u64, 50, 60]);
        let results: Vec<_> = FanOut::new()
            .cancel_on_failure(true)
            .run("check", source, |n| async move {
                tokio::time::sleep(Duration::from_millis(n * 5)).await;
                if n == 1 {
                    Err(Error::MissingId)
                } else {
                    Ok(n)
                }
            })
            .collect()
            .await;

        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[tokio::test]
    async fn test_source_error_starts_nothing() {
        let source: Collection<u64> =
            Collection::from_try_stream(futures::stream::iter(vec![Ok(1), Err(Error::Unbound)]));
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let results: Vec<_> = FanOut::new()
            .run("count", source, move |n| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                async move { Ok(n) }
            })
            .collect()
            .await;

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(Error::Unbound)));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
