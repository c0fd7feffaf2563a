use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use landcover_tile_utils::{TileCoord, TileKey};
use tokio_util::sync::CancellationToken;

use crate::provider::{ProviderResult, RasterProvider};
use crate::raster::SourceRaster;

/// Serves rasters held in memory, keyed by tile coordinate.
///
/// Keeps a count of every `fetch` call, which makes it convenient for checking how
/// often a coverage is consulted.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    id: String,
    tiles: HashMap<TileCoord, SourceRaster>,
    fetches: AtomicUsize,
}

impl MemoryProvider {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Adds or replaces the raster served for `coord`.
    #[must_use]
    pub fn with_tile(mut self, coord: TileCoord, raster: SourceRaster) -> Self {
        self.insert(coord, raster);
        self
    }

    pub fn insert(&mut self, coord: TileCoord, raster: SourceRaster) {
        self.tiles.insert(coord, raster);
    }

    /// Number of `fetch` calls so far, including those that returned nothing.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RasterProvider for MemoryProvider {
    fn get_id(&self) -> &str {
        &self.id
    }

    async fn fetch(
        &self,
        key: &TileKey,
        cancel: &CancellationToken,
    ) -> ProviderResult<Option<SourceRaster>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if cancel.is_cancelled() {
            return Ok(None);
        }
        Ok(self.tiles.get(&key.coord()).cloned())
    }
}
