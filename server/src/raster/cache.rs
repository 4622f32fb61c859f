//! Raster metadata cache
//!
//! Opening a GeoTIFF (especially a remote one) costs at least one ranged
//! fetch, so the parsed [`RasterInfo`] is kept per source path. Entries
//! expire after a TTL since remote objects may change.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, gauge};
use moka::future::Cache;

use super::types::RasterInfo;

#[derive(Debug, Clone)]
pub struct RasterCacheConfig {
    /// Maximum number of cached sources (default: 512)
    pub max_entries: u64,
    /// Time-to-live for cache entries (default: 5 minutes)
    pub ttl: Duration,
}

impl Default for RasterCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 512,
            ttl: Duration::from_secs(300),
        }
    }
}

/// Concurrent cache of raster metadata keyed by source path
pub struct RasterInfoCache {
    cache: Cache<String, Arc<RasterInfo>>,
}

impl RasterInfoCache {
    pub fn new(config: RasterCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();

        Self { cache }
    }

    /// Get cached metadata or run `init` to load it.
    ///
    /// Concurrent callers missing on the same source share one load. Load
    /// errors are returned to every waiter and never cached.
    pub async fn get_or_try_insert_with<Fut, E>(
        &self,
        src_path: &str,
        init: Fut,
    ) -> Result<Arc<RasterInfo>, Arc<E>>
    where
        Fut: Future<Output = Result<RasterInfo, E>>,
        E: Send + Sync + 'static,
    {
        let loaded = AtomicBool::new(false);

        let result = self
            .cache
            .try_get_with(src_path.to_string(), async {
                loaded.store(true, Ordering::Relaxed);
                init.await.map(Arc::new)
            })
            .await;

        if loaded.load(Ordering::Relaxed) {
            counter!("tilecast_raster_cache_misses_total").increment(1);
            gauge!("tilecast_raster_cache_entries").set(self.cache.entry_count() as f64);
        } else {
            counter!("tilecast_raster_cache_hits_total").increment(1);
        }

        result
    }
}
