//! Per-run single-flight memoization.
//!
//! A [`Memo`] is created by whoever owns the run and shared through `Arc`;
//! there is no process-wide cache. The cell for a key is inserted before its
//! fetch starts, so concurrent callers for the same key wait on one fetch.
//! The stored value is the whole `Result`: failures are memoized as well and
//! never retried within a run.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use wikimirror_shared::Result;

/// Append-only map from key to the memoized result of fetching it.
pub struct Memo<K, V> {
    name: &'static str,
    cells: Mutex<HashMap<K, Arc<OnceCell<Result<V>>>>>,
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// `name` only labels log lines.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// The memoized result for `key`, running `fetch` only if no caller has
    /// started it yet.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let cell = {
            let mut cells = self.cells.lock().await;
            Arc::clone(cells.entry(key).or_default())
        };

        if cell.initialized() {
            debug!(cache = self.name, "cache hit");
        } else {
            debug!(cache = self.name, "cache miss");
        }

        cell.get_or_init(fetch).await.clone()
    }

    /// Number of keys seen so far, including ones still being fetched.
    pub async fn len(&self) -> usize {
        self.cells.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<K, V> std::fmt::Debug for Memo<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo").field("name", &self.name).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wikimirror_shared::WikiMirrorError;

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let memo: Arc<Memo<&str, usize>> = Arc::new(Memo::new("test"));
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let memo = Arc::clone(&memo);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    memo.get_or_fetch("k", || async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
                    })
                    .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memo.len().await, 1);
    }

    #[tokio::test]
    async fn failures_are_memoized() {
        let memo: Memo<u32, String> = Memo::new("test");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let err = memo
                .get_or_fetch(1, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(WikiMirrorError::Network("boom".into()))
                })
                .await
                .unwrap_err();
            assert!(matches!(err, WikiMirrorError::Network(_)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_fetch_separately() {
        let memo: Memo<u32, u32> = Memo::new("test");
        assert!(memo.is_empty().await);
        assert_eq!(memo.get_or_fetch(1, || async { Ok(10) }).await.unwrap(), 10);
        assert_eq!(memo.get_or_fetch(2, || async { Ok(20) }).await.unwrap(), 20);
        assert_eq!(memo.get_or_fetch(1, || async { Ok(99) }).await.unwrap(), 10);
        assert_eq!(memo.len().await, 2);
    }
}
