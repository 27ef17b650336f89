//! Per-key de-duplication of in-flight attempts
//!
//! The first caller for a key spawns the attempt; later callers for the
//! same key await the same shared result. The attempt runs on its own task,
//! so it completes and its side effects land even if every caller goes away.

use crate::error::ContentError;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::debug;

type SharedAttempt<V> = Shared<BoxFuture<'static, Result<V, ContentError>>>;

struct Pending<V: Clone> {
    ticket: u64,
    attempt: SharedAttempt<V>,
    task: AbortHandle,
}

impl<V: Clone> Pending<V> {
    /// The attempt task has ended, whether or not anyone saw the result
    fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

pub struct InFlight<K, V: Clone> {
    pending: Mutex<HashMap<K, Pending<V>>>,
    next_ticket: AtomicU64,
}

impl<K, V> Default for InFlight<K, V>
where
    V: Clone,
{
    fn default() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(0),
        }
    }
}

impl<K, V> InFlight<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the running attempt for `key`, or start one with `start`
    pub async fn run<F, Fut>(&self, key: K, start: F) -> Result<V, ContentError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ContentError>> + Send + 'static,
    {
        let (ticket, attempt) = {
            let mut pending = self.pending.lock().await;
            match pending.get(&key) {
                Some(entry) if !entry.is_finished() => {
                    debug!(key = ?key, "Joining in-flight attempt");
                    (None, entry.attempt.clone())
                }
                _ => {
                    // Leaders dropped before cleaning up leave finished entries
                    Self::sweep(&mut pending);
                    let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
                    let handle = tokio::spawn(start());
                    let task = handle.abort_handle();
                    let attempt = async move {
                        handle.await.unwrap_or_else(|e| {
                            Err(ContentError::Internal(format!("attempt task failed: {}", e)))
                        })
                    }
                    .boxed()
                    .shared();
                    pending.insert(
                        key.clone(),
                        Pending {
                            ticket,
                            attempt: attempt.clone(),
                            task,
                        },
                    );
                    (Some(ticket), attempt)
                }
            }
        };

        let result = attempt.await;

        if let Some(ticket) = ticket {
            let mut pending = self.pending.lock().await;
            if pending.get(&key).is_some_and(|entry| entry.ticket == ticket) {
                pending.remove(&key);
            }
        }
        result
    }

    fn sweep(pending: &mut HashMap<K, Pending<V>>) -> usize {
        let before = pending.len();
        pending.retain(|_, entry| !entry.is_finished());
        before - pending.len()
    }

    /// Drop entries whose attempt ended without a caller cleaning up
    pub async fn sweep_finished(&self) -> usize {
        Self::sweep(&mut *self.pending.lock().await)
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_attempt() {
        let inflight: Arc<InFlight<&'static str, u32>> = Arc::new(InFlight::new());
        let starts = Arc::new(AtomicUsize::new(0));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let inflight = inflight.clone();
            let starts = starts.clone();
            tasks.spawn(async move {
                inflight
                    .run("leo", || {
                        starts.fetch_add(1, Ordering::SeqCst);
                        async {
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok::<_, ContentError>(42)
                        }
                    })
                    .await
            });
        }

        while let Some(result) = tasks.join_next().await {
            assert_eq!(result.unwrap().unwrap(), 42);
        }
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(inflight.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_errors_are_shared_and_not_retained() {
        let inflight: InFlight<&'static str, u32> = InFlight::new();
        let result = inflight
            .run("k", || async { Err(ContentError::RemoteUnavailable("down".into())) })
            .await;
        assert_eq!(result, Err(ContentError::RemoteUnavailable("down".into())));

        let result = inflight.run("k", || async { Ok::<_, ContentError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_attempt_completes_after_caller_abandons() {
        let inflight: Arc<InFlight<&'static str, u32>> = Arc::new(InFlight::new());
        let finished = Arc::new(AtomicUsize::new(0));

        let flag = finished.clone();
        let caller = {
            let inflight = inflight.clone();
            tokio::spawn(async move {
                inflight
                    .run("k", move || async move {
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        flag.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, ContentError>(1)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        caller.abort();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    async fn abandoned_attempt(inflight: &Arc<InFlight<&'static str, u32>>, key: &'static str) {
        let caller = {
            let inflight = inflight.clone();
            tokio::spawn(async move {
                inflight
                    .run(key, || async {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, ContentError>(1)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        caller.abort();
        tokio::time::sleep(Duration::from_millis(60)).await;
    }

    #[tokio::test]
    async fn test_abandoned_entries_are_swept_on_next_insert() {
        let inflight: Arc<InFlight<&'static str, u32>> = Arc::new(InFlight::new());
        abandoned_attempt(&inflight, "last-week").await;
        assert_eq!(inflight.pending_count().await, 1);

        let result = inflight.run("this-week", || async { Ok::<_, ContentError>(2) }).await;
        assert_eq!(result, Ok(2));
        assert_eq!(inflight.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_finished_reclaims_abandoned_entries() {
        let inflight: Arc<InFlight<&'static str, u32>> = Arc::new(InFlight::new());
        abandoned_attempt(&inflight, "last-week").await;

        assert_eq!(inflight.sweep_finished().await, 1);
        assert_eq!(inflight.pending_count().await, 0);
    }
}
