//! Per-provider memoization with a freshness window derived from the
//! provider's polling interval.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::warn;
use tokio::sync::RwLock;

use crate::Fix;
use crate::provider::{Provider, ProviderError};

/// Extra grace period during which a cached fix may be re-served if a live
/// fetch fails ("stale on error"), per spec.
const STALE_ON_ERROR_WINDOW: Duration = Duration::from_secs(30);

#[derive(Clone)]
struct CacheEntry {
    fix: Fix,
    fetched_at: Instant,
    /// Whether this entry was last (re-)served because a live fetch failed,
    /// rather than because it was genuinely fresh. Not surfaced to clients;
    /// exists so the cache's own tests can assert on the stale-on-error path.
    served_stale: bool,
}

/// Wraps one [`Provider`], memoizing its last-good fix.
///
/// Readers observe a consistent snapshot; fetches take an exclusive write
/// lease for the duration of the backend call, matching a reader-preferring
/// exclusion discipline (any number of fresh reads proceed concurrently).
pub struct ProviderCache {
    inner: Arc<dyn Provider>,
    entry: RwLock<Option<CacheEntry>>,
}

impl std::fmt::Debug for ProviderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCache")
            .field("provider", &self.inner.id())
            .finish()
    }
}

impl ProviderCache {
    /// Wrap `provider` in a cache.
    #[must_use]
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            inner: provider,
            entry: RwLock::new(None),
        }
    }

    /// The wrapped provider.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.inner
    }

    /// Request a location, serving a fresh cached fix if one exists,
    /// otherwise calling the backend. On backend failure, a cached fix less
    /// than 30 seconds old is served instead of propagating the error.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`ProviderError`] if the backend call fails and
    /// no fix recent enough to serve stale is cached.
    pub async fn request_location(&self) -> Result<Fix, ProviderError> {
        let polling_interval = self.inner.polling_interval();

        if let Some(fix) = self.fresh_read(polling_interval).await {
            return Ok(fix);
        }

        let call = self.inner.request_location();
        let outcome = match tokio::time::timeout(self.inner.timeout(), call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Timeout(format!(
                "{} did not answer within {:?}",
                self.inner.id(),
                self.inner.timeout()
            ))),
        };

        match outcome {
            Ok(fix) => {
                let mut guard = self.entry.write().await;
                *guard = Some(CacheEntry {
                    fix: fix.clone(),
                    fetched_at: Instant::now(),
                    served_stale: false,
                });
                Ok(fix)
            }
            Err(err) => {
                let mut guard = self.entry.write().await;
                if let Some(entry) = guard.as_mut() {
                    if entry.fetched_at.elapsed() < STALE_ON_ERROR_WINDOW {
                        warn!(
                            "provider {} failed ({err}), serving stale fix",
                            self.inner.id()
                        );
                        entry.served_stale = true;
                        return Ok(entry.fix.clone());
                    }
                }
                Err(err)
            }
        }
    }

    async fn fresh_read(&self, polling_interval: Duration) -> Option<Fix> {
        let guard = self.entry.read().await;
        let entry = guard.as_ref()?;
        if entry.fetched_at.elapsed() < polling_interval {
            Some(entry.fix.clone())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{CountingProvider, FailingProvider, HangingProvider, ScriptedProvider};

    #[tokio::test]
    async fn fresh_read_avoids_a_second_backend_call() {
        let provider = Arc::new(CountingProvider::new("p", Duration::from_secs(60)));
        let cache = ProviderCache::new(provider.clone());

        cache.request_location().await.unwrap();
        cache.request_location().await.unwrap();

        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn expired_entry_triggers_a_refetch() {
        let provider = Arc::new(CountingProvider::new("p", Duration::from_millis(1)));
        let cache = ProviderCache::new(provider.clone());

        cache.request_location().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.request_location().await.unwrap();

        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn failure_within_grace_window_serves_stale_fix() {
        let provider = Arc::new(ScriptedProvider::new(
            "p",
            Duration::from_millis(1),
            vec![Ok(()), Err(())],
        ));
        let cache = ProviderCache::new(provider);

        let first = cache.request_location().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = cache.request_location().await.unwrap();

        assert_eq!(first.source, second.source);
    }

    #[tokio::test]
    async fn failure_propagates_once_the_cache_is_empty() {
        let provider = Arc::new(FailingProvider::new("p", Duration::from_millis(1)));
        let cache = ProviderCache::new(provider);

        let err = cache.request_location().await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn backend_call_exceeding_its_timeout_reports_provider_timeout() {
        let provider = Arc::new(HangingProvider::new(
            "p",
            Duration::from_secs(60),
            Duration::from_millis(50),
        ));
        let cache = ProviderCache::new(provider);

        let err = cache.request_location().await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }
}
