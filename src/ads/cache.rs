//! Time-bounded cache of preloaded ads, keyed by slot.

use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::{AdCacheConfig, AdHandle, AdProvider};
use crate::sync::SingleFlight;

/// Cache entry for an ad
struct CachedAd<A> {
    ad: Arc<A>,
    loaded_at: Instant,
    // Tie-breaker for entries loaded within the same clock tick.
    seq: u64,
}

/// Preloaded ads shared by every list screen
///
/// Load failures are logged and absorbed: a slot without an ad is simply
/// rendered without one. Call [`clear_cache`](Self::clear_cache) when the
/// screens using it go away.
pub struct AdPreloadCache<P: AdProvider> {
    provider: P,
    config: AdCacheConfig,
    ads: Mutex<HashMap<String, CachedAd<P::Ad>>>,
    loads: SingleFlight<String, Option<Arc<P::Ad>>>,
    generation: AtomicU64,
    next_seq: AtomicU64,
}

impl<P: AdProvider> AdPreloadCache<P> {
    /// Create a cache with the default bounds.
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, AdCacheConfig::default())
    }

    /// Create a cache with explicit bounds.
    pub fn with_config(provider: P, config: AdCacheConfig) -> Self {
        Self {
            provider,
            config,
            ads: Mutex::new(HashMap::new()),
            loads: SingleFlight::new(),
            generation: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
        }
    }

    /// The ad factory
    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedAd<P::Ad>>> {
        self.ads.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load an ad for `slot_id` ahead of time.
    ///
    /// Does nothing if the slot is cached, and joins the running load if one
    /// is in flight.
    pub async fn preload_ad(&self, slot_id: &str) {
        if self.contains(slot_id) {
            return;
        }
        self.load(slot_id).await;
    }

    /// Preload several slots, all at once or one after another.
    pub async fn preload_multiple_ads<S: AsRef<str>>(&self, slot_ids: &[S], sequential: bool) {
        if sequential {
            for slot_id in slot_ids {
                self.preload_ad(slot_id.as_ref()).await;
            }
        } else {
            join_all(slot_ids.iter().map(|slot_id| self.preload_ad(slot_id.as_ref()))).await;
        }
    }

    /// Ad for `slot_id`, preloaded if possible, loaded now otherwise.
    ///
    /// A fresh cached ad stays cached so it can be shown again when the user
    /// scrolls back. Returns `None` if the ad could not be loaded.
    pub async fn get_ad(&self, slot_id: &str) -> Option<Arc<P::Ad>> {
        if let Some(pending) = self.loads.join(&slot_id.to_string()) {
            pending.wait().await;
        }

        let stale = {
            let mut ads = self.lock();
            match ads.get(slot_id) {
                Some(entry) if entry.loaded_at.elapsed() < self.config.max_age => {
                    return Some(Arc::clone(&entry.ad));
                }
                Some(_) => ads.remove(slot_id),
                None => None,
            }
        };
        if let Some(entry) = stale {
            tracing::debug!("Ad for slot {slot_id} expired, reloading");
            entry.ad.destroy();
        }

        self.load(slot_id).await
    }

    async fn load(&self, slot_id: &str) -> Option<Arc<P::Ad>> {
        let generation = self.generation.load(Ordering::SeqCst);
        self.loads
            .run(slot_id.to_string(), || async {
                match self.provider.create_ad(slot_id).await {
                    Ok(ad) => {
                        let ad = Arc::new(ad);
                        if self.insert(slot_id, Arc::clone(&ad), generation) {
                            Some(ad)
                        } else {
                            tracing::debug!("Ad cache cleared while loading slot {slot_id}");
                            ad.destroy();
                            None
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load ad for slot {slot_id}: {e:#}");
                        None
                    }
                }
            })
            .await
            .flatten()
    }

    /// Store an ad, evicting the oldest entry when full. Refuses ads whose
    /// load started before the last [`clear_cache`](Self::clear_cache).
    fn insert(&self, slot_id: &str, ad: Arc<P::Ad>, generation: u64) -> bool {
        let evicted = {
            let mut ads = self.lock();
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }

            let evicted = match ads.remove(slot_id) {
                Some(previous) => Some(previous),
                None if ads.len() >= self.config.max_entries.max(1) => {
                    Self::evict_oldest(&mut ads)
                }
                None => None,
            };

            ads.insert(
                slot_id.to_string(),
                CachedAd {
                    ad,
                    loaded_at: Instant::now(),
                    seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                },
            );
            evicted
        };

        if let Some(entry) = evicted {
            entry.ad.destroy();
        }
        true
    }

    /// Remove the oldest entry from the cache.
    fn evict_oldest(ads: &mut HashMap<String, CachedAd<P::Ad>>) -> Option<CachedAd<P::Ad>> {
        let oldest_key = ads
            .iter()
            .min_by_key(|(_, entry)| (entry.loaded_at, entry.seq))
            .map(|(key, _)| key.clone())?;
        tracing::debug!("Ad cache full, evicting slot {oldest_key}");
        ads.remove(&oldest_key)
    }

    /// Release every cached ad and forget loads in flight.
    pub fn clear_cache(&self) {
        let drained: Vec<CachedAd<P::Ad>> = {
            let mut ads = self.lock();
            self.generation.fetch_add(1, Ordering::SeqCst);
            ads.drain().map(|(_, entry)| entry).collect()
        };
        self.loads.forget_all();

        tracing::debug!("Cleared ad cache, releasing {} ads", drained.len());
        for entry in drained {
            entry.ad.destroy();
        }
    }

    /// Check if an ad is cached for the slot.
    pub fn contains(&self, slot_id: &str) -> bool {
        self.lock().contains_key(slot_id)
    }

    /// Check if an ad for the slot is being loaded.
    pub fn is_loading(&self, slot_id: &str) -> bool {
        self.loads.is_in_flight(&slot_id.to_string())
    }

    /// Get the number of cached ads.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
