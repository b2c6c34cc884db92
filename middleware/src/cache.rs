use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Memoized jail storage roots, one slot per jail.
///
/// Concurrent lookups for the same jail wait on a single in-flight lookup.
/// A successful lookup is kept for the lifetime of the cache; a failed one
/// leaves the slot empty so the next access retries.
#[derive(Clone, Default)]
pub struct RootCache {
    slots: Arc<Mutex<HashMap<String, Arc<OnceCell<String>>>>>,
}

impl RootCache {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, jail: &str) -> Arc<OnceCell<String>> {
        let mut slots = self.slots.lock().await;
        slots
            .entry(jail.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    pub async fn get_or_try_init<F, Fut, E>(&self, jail: &str, lookup: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let slot = self.slot(jail).await;
        let root = slot.get_or_try_init(lookup).await?;
        Ok(root.clone())
    }

    pub async fn get(&self, jail: &str) -> Option<String> {
        let slots = self.slots.lock().await;
        slots.get(jail).and_then(|slot| slot.get().cloned())
    }

    pub async fn invalidate(&self, jail: &str) {
        self.slots.lock().await.remove(jail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_success_is_reused() {
        let cache = RootCache::new();
        let lookups = AtomicUsize::new(0);

        for _ in 0..3 {
            let root: Result<String, String> = cache
                .get_or_try_init("j1", || async {
                    lookups.fetch_add(1, Ordering::SeqCst);
                    Ok("/mnt/pool/iocage".to_string())
                })
                .await;
            assert_eq!(root.unwrap(), "/mnt/pool/iocage");
        }

        assert_eq!(lookups.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("j1").await.as_deref(), Some("/mnt/pool/iocage"));
    }

    #[tokio::test]
    async fn test_failure_is_retried() {
        let cache = RootCache::new();

        let first: Result<String, String> = cache
            .get_or_try_init("j1", || async { Err("middleware down".to_string()) })
            .await;
        assert_eq!(first.unwrap_err(), "middleware down");
        assert_eq!(cache.get("j1").await, None);

        let second: Result<String, String> = cache
            .get_or_try_init("j1", || async { Ok("/mnt/pool/iocage".to_string()) })
            .await;
        assert_eq!(second.unwrap(), "/mnt/pool/iocage");
    }

    #[tokio::test]
    async fn test_jails_do_not_mix() {
        let cache = RootCache::new();

        let a: Result<String, String> = cache
            .get_or_try_init("a", || async { Ok("/mnt/one/iocage".to_string()) })
            .await;
        let b: Result<String, String> = cache
            .get_or_try_init("b", || async { Ok("/mnt/two/iocage".to_string()) })
            .await;

        assert_eq!(a.unwrap(), "/mnt/one/iocage");
        assert_eq!(b.unwrap(), "/mnt/two/iocage");

        cache.invalidate("a").await;
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await.as_deref(), Some("/mnt/two/iocage"));
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_call() {
        let cache = RootCache::new();
        let lookups = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let lookups = lookups.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_try_init("j1", || async move {
                        lookups.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        Ok::<_, String>("/mnt/pool/iocage".to_string())
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "/mnt/pool/iocage");
        }
        assert_eq!(lookups.load(Ordering::SeqCst), 1);
    }
}
