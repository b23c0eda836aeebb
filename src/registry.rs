//! Accuracy-tier provider registry and fallback ladder traversal.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use log::warn;

use crate::cache::ProviderCache;
use crate::error::EngineError;
use crate::provider::Provider;
use crate::{AccuracyTier, Fix};

/// Maps accuracy tiers to providers (each wrapped in its own freshness
/// cache) and walks the fallback ladder for a requested tier.
pub struct ProviderRegistry {
    providers: BTreeMap<AccuracyTier, Arc<ProviderCache>>,
    current: Mutex<Option<Arc<dyn Provider>>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field(
                "providers",
                &self
                    .providers
                    .iter()
                    .map(|(tier, p)| (*tier, p.provider().id().to_owned()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ProviderRegistry {
    /// Build a registry from an ordered list of `(tier, provider)` pairs.
    /// A provider may be registered at more than one tier.
    #[must_use]
    pub fn new(entries: Vec<(AccuracyTier, Arc<dyn Provider>)>) -> Self {
        let providers = entries
            .into_iter()
            .map(|(tier, provider)| (tier, Arc::new(ProviderCache::new(provider))))
            .collect();
        Self {
            providers,
            current: Mutex::new(None),
        }
    }

    /// Build the ordered candidate list for `tier`: the tier itself, then
    /// strictly coarser tiers ascending, then strictly finer tiers
    /// descending toward most-accurate, deduped by provider identity.
    #[must_use]
    pub fn ladder_for(&self, tier: AccuracyTier) -> Vec<Arc<ProviderCache>> {
        let idx = AccuracyTier::ALL
            .iter()
            .position(|t| *t == tier)
            .expect("AccuracyTier::ALL is exhaustive");

        let order = std::iter::once(idx)
            .chain(idx + 1..AccuracyTier::ALL.len())
            .chain((0..idx).rev());

        let mut ladder: Vec<Arc<ProviderCache>> = Vec::new();
        for i in order {
            let Some(cache) = self.providers.get(&AccuracyTier::ALL[i]) else {
                continue;
            };
            if ladder
                .iter()
                .any(|c| Arc::ptr_eq(c.provider(), cache.provider()))
            {
                continue;
            }
            ladder.push(cache.clone());
        }
        ladder
    }

    /// Run the fallback ladder for `tier`, returning the first successful
    /// fix or the terminal error once the ladder is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoProviderForAccuracy`] if no provider is
    /// registered anywhere on the ladder, or
    /// [`EngineError::FailedAllProviders`] if every candidate failed.
    pub async fn request_with_fallback(&self, tier: AccuracyTier) -> Result<Fix, EngineError> {
        let ladder = self.ladder_for(tier);
        if ladder.is_empty() {
            return Err(EngineError::NoProviderForAccuracy);
        }

        let mut last_err = None;
        for cache in ladder {
            self.switch_to(cache.provider()).await;
            match cache.request_location().await {
                Ok(fix) => return Ok(fix),
                Err(err) => {
                    warn!(
                        "provider {} failed during fallback: {err}",
                        cache.provider().id()
                    );
                    last_err = Some(err);
                }
            }
        }

        Err(EngineError::FailedAllProviders {
            source: last_err.expect("ladder is non-empty"),
        })
    }

    async fn switch_to(&self, provider: &Arc<dyn Provider>) {
        let previous = {
            let mut guard = self.current.lock().expect("poisoned");
            let previous = guard.clone();
            *guard = Some(provider.clone());
            previous
        };

        if let Some(previous) = previous {
            if !Arc::ptr_eq(&previous, provider) {
                previous.stop().await;
                provider.start().await;
            }
        } else {
            provider.start().await;
        }
    }
}
