use std::sync::Arc;
use std::time::Duration;

use landcover_tile_utils::TileCoord;
use moka::future::Cache;
use tracing::{info, trace};

use crate::raster::OutputRaster;

/// Cache of finished composites, keyed by tile coordinate.
///
/// Entries are weighed by the size of their texel buffer. A layer only ever composites
/// against one profile, so the coordinate alone identifies a tile.
#[derive(Clone, Debug)]
pub struct CompositeCache(Cache<TileCoord, Arc<OutputRaster>>);

impl CompositeCache {
    /// Creates a cache holding at most `max_size_bytes` of texel data.
    ///
    /// `expiry` bounds how long an entry lives after it was composited.
    #[must_use]
    pub fn new(max_size_bytes: u64, expiry: Option<Duration>) -> Self {
        let mut builder = Cache::builder()
            .name("composite_cache")
            .weigher(|_key: &TileCoord, value: &Arc<OutputRaster>| -> u32 {
                value.byte_size().try_into().unwrap_or(u32::MAX)
            })
            .max_capacity(max_size_bytes);

        if let Some(ttl) = expiry {
            builder = builder.time_to_live(ttl);
            trace!("Composite cache configured with TTL of {ttl:?}");
        }

        Self(builder.build())
    }

    async fn get(&self, key: &TileCoord) -> Option<Arc<OutputRaster>> {
        let result = self.0.get(key).await;
        if result.is_some() {
            trace!(
                "Composite cache HIT for {key} (entries={entries}, size={size}B)",
                entries = self.0.entry_count(),
                size = self.0.weighted_size()
            );
        } else {
            trace!("Composite cache MISS for {key}");
        }
        result
    }

    /// Returns the cached composite for `key`, or computes and stores it.
    ///
    /// Errors from `compute` are passed through and nothing is stored.
    pub async fn get_or_insert<F, Fut, E>(
        &self,
        key: TileCoord,
        compute: F,
    ) -> Result<Arc<OutputRaster>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<OutputRaster, E>>,
    {
        if let Some(raster) = self.get(&key).await {
            return Ok(raster);
        }
        let raster = Arc::new(compute().await?);
        self.0.insert(key, Arc::clone(&raster)).await;
        Ok(raster)
    }

    /// Drops every cached composite.
    pub fn invalidate_all(&self) {
        self.0.invalidate_all();
        info!("Invalidated all composite cache entries");
    }

    /// Applies pending evictions and invalidations so that counts are exact.
    pub async fn sync(&self) {
        self.0.run_pending_tasks().await;
    }

    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.0.entry_count()
    }

    /// Total size of cached texel data in bytes.
    #[must_use]
    pub fn weighted_size(&self) -> u64 {
        self.0.weighted_size()
    }

    #[must_use]
    pub fn max_size_bytes(&self) -> Option<u64> {
        self.0.policy().max_capacity()
    }
}
