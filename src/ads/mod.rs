//! Ad preloading for injected list slots.
//!
//! Ads are requested ahead of render so they are ready when their slot
//! scrolls into view. The ad network itself sits behind [`AdProvider`]; this
//! module only decides when to load, what to keep and when to release.

mod cache;

pub use cache::AdPreloadCache;

use anyhow::Result;
use std::time::Duration;

/// Maximum number of ads kept at once
pub const MAX_CACHE_SIZE: usize = 15;

/// Age after which a preloaded ad is no longer shown
pub const MAX_AD_AGE: Duration = Duration::from_secs(60 * 60);

/// A loaded ad holding native resources
pub trait AdHandle {
    /// Release the ad's resources. The handle must not be shown afterwards.
    fn destroy(&self);
}

/// Factory for ads, normally backed by the ad network SDK
#[allow(async_fn_in_trait)]
pub trait AdProvider {
    /// Ad type produced
    type Ad: AdHandle;

    /// Request a new ad for the given slot
    async fn create_ad(&self, slot_id: &str) -> Result<Self::Ad>;
}

/// Bounds of an [`AdPreloadCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdCacheConfig {
    /// Entries kept before the oldest is evicted
    pub max_entries: usize,
    /// Age after which an entry is stale
    pub max_age: Duration,
}

impl Default for AdCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: MAX_CACHE_SIZE,
            max_age: MAX_AD_AGE,
        }
    }
}
