//! Bounded fan-out over independent units of work.
//!
//! Every unit is keyed (for the crawl, by OS type and version) and returns a
//! `Result`. An `Err` is a reported failure: it is logged, recorded in the
//! [`BatchReport`], and the rest of the batch carries on. A unit that panics is
//! an unexpected failure; those are collected and surfaced as one
//! [`BatchError`] only after every unit has finished.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, warn};

type CompletionHook = Arc<dyn Fn(usize) + Send + Sync>;

/// Outcome of a finished batch, in submission order.
#[derive(Debug)]
pub struct BatchReport<K, T, E> {
    pub succeeded: Vec<(K, T)>,
    pub failed:    Vec<(K, E)>,
}

impl<K, T, E> BatchReport<K, T, E> {
    pub fn total(&self) -> usize { self.succeeded.len() + self.failed.len() }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("{failed} of {total} units failed unexpectedly, first: {first}")]
    Unexpected {
        failed: usize,
        total:  usize,
        first:  String,
    },
}

/// Runs units with at most `max_concurrent` in flight.
#[derive(Clone)]
pub struct Batch {
    max_concurrent: usize,
    on_complete:    Option<CompletionHook>,
}

impl std::fmt::Debug for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch")
            .field("max_concurrent", &self.max_concurrent)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

impl Batch {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            on_complete:    None,
        }
    }

    /// Invoked by the coordinating task with the number of finished units
    /// after each completion.
    pub fn on_complete(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    pub fn max_concurrent(&self) -> usize { self.max_concurrent }

    /// Run every unit to completion.
    ///
    /// Units are spawned immediately but only `max_concurrent` hold a permit at
    /// any time. There is no fail-fast: the call returns only once all units
    /// have finished.
    pub async fn run<K, T, E, Fut>(
        &self,
        units: impl IntoIterator<Item = (K, Fut)>,
    ) -> Result<BatchReport<K, T, E>, BatchError>
    where
        K: Display + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut set = JoinSet::new();
        let mut keys = HashMap::new();

        for (index, (key, unit)) in units.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let handle = set.spawn(async move {
                // The semaphore is never closed, so a permit always arrives.
                let _permit = semaphore.acquire_owned().await.ok();
                (index, unit.await)
            });
            keys.insert(handle.id(), (index, key));
        }

        let total = keys.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut unexpected = Vec::new();
        let mut finished = 0;

        while let Some(joined) = set.join_next_with_id().await {
            finished += 1;
            match joined {
                Ok((id, (index, result))) => {
                    if let Some((_, key)) = keys.remove(&id) {
                        if let Err(e) = &result {
                            warn!(unit = %key, error = %e, "unit failed, dropping it");
                        }
                        outcomes.push((index, key, result));
                    }
                }
                Err(join_error) => {
                    let label = keys
                        .remove(&join_error.id())
                        .map(|(_, key)| key.to_string())
                        .unwrap_or_else(|| "<unknown>".to_string());
                    error!(unit = %label, error = %join_error, "unit aborted");
                    unexpected.push(format!("{label}: {join_error}"));
                }
            }

            if let Some(hook) = &self.on_complete {
                hook(finished);
            }
        }

        if let Some(first) = unexpected.first() {
            return Err(BatchError::Unexpected {
                failed: unexpected.len(),
                total,
                first: first.clone(),
            });
        }

        outcomes.sort_by_key(|(index, _, _)| *index);

        let mut report = BatchReport {
            succeeded: Vec::new(),
            failed:    Vec::new(),
        };
        for (_, key, result) in outcomes {
            match result {
                Ok(value) => report.succeeded.push((key, value)),
                Err(e) => report.failed.push((key, e)),
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_zero_concurrency_is_clamped() {
        assert_eq!(Batch::new(0).max_concurrent(), 1);
        assert_eq!(Batch::new(100).max_concurrent(), 100);
    }

    #[tokio::test]
    async fn test_reported_failures_do_not_abort() {
        let units = (0..5).map(|i| {
            (i, async move {
                if i % 2 == 0 {
                    Ok(i * 10)
                } else {
                    Err(format!("odd {i}"))
                }
            })
        });

        let report = Batch::new(2).run(units).await.unwrap();

        assert_eq!(report.total(), 5);
        assert_eq!(report.succeeded, vec![(0, 0), (2, 20), (4, 40)]);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].1, "odd 1");
    }

    #[tokio::test]
    async fn test_results_keep_submission_order() {
        let units = (0..4u64).map(|i| {
            (i, async move {
                tokio::time::sleep(Duration::from_millis(40 - i * 10)).await;
                Ok::<_, String>(i)
            })
        });

        let report = Batch::new(4).run(units).await.unwrap();
        let keys: Vec<_> = report.succeeded.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_concurrency_bound_is_respected() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let units = (0..12).map(|i| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            (i, async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(())
            })
        });

        Batch::new(3).run(units).await.unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_panics_surface_after_all_units_finish() {
        let ran = Arc::new(AtomicUsize::new(0));

        let units = (0..6).map(|i| {
            let ran = Arc::clone(&ran);
            (i, async move {
                if i == 1 {
                    panic!("boom");
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
                ran.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(())
            })
        });

        let err = Batch::new(2).run(units).await.unwrap_err();

        assert_eq!(ran.load(Ordering::SeqCst), 5);
        match err {
            BatchError::Unexpected { failed, total, first } => {
                assert_eq!(failed, 1);
                assert_eq!(total, 6);
                assert!(first.starts_with("1:"));
            }
        }
    }

    #[tokio::test]
    async fn test_completion_hook_counts_every_unit() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_ = Arc::clone(&seen);

        let units = (0..7).map(|i| (i, async move { Ok::<_, String>(i) }));
        Batch::new(3)
            .on_complete(move |n| {
                seen_.store(n, Ordering::SeqCst);
            })
            .run(units)
            .await
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let units: Vec<(u32, std::future::Ready<Result<(), String>>)> = Vec::new();
        let report = Batch::new(3).run(units).await.unwrap();
        assert_eq!(report.total(), 0);
    }
}
