//! The land-cover layer: owns the coverage stack and produces composited tiles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use landcover_tile_utils::{Profile, TileCoord, TileKey, TileKeyError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Cancelled;
use crate::cache::CompositeCache;
use crate::composite::composite;
use crate::coverage::Coverage;
use crate::dictionary::Dictionary;
use crate::raster::{OutputConfig, OutputRaster};
use crate::stack::CoverageStack;

/// Short description of one opened coverage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverageSummary {
    pub id: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Length of the translation table, one more than the highest mapped raw value
    pub table_len: usize,
    /// Number of raw values that resolve to a dictionary code
    pub mapped: usize,
}

/// Composites land-cover tiles from an ordered list of coverages.
///
/// Coverages are opened once. The dictionary is attached afterwards with
/// [`LandCoverLayer::attach_dictionary`], which swaps in a new [`CoverageStack`].
/// Every call to [`LandCoverLayer::create_image`] works on the stack that was current when
/// it started, so concurrent composites never observe a half-attached dictionary.
#[derive(Debug)]
pub struct LandCoverLayer {
    profile: Profile,
    output: OutputConfig,
    stack: Arc<CoverageStack>,
    dictionary: Option<Arc<dyn Dictionary>>,
    cache: Option<CompositeCache>,
    warned_unattached: AtomicBool,
}

impl LandCoverLayer {
    /// Opens `coverages` in order, skipping the disabled ones.
    ///
    /// Later coverages have higher priority. All translation tables start out empty.
    #[must_use]
    pub fn open(profile: Profile, output: OutputConfig, coverages: Vec<Coverage>) -> Self {
        let mut opened = Vec::with_capacity(coverages.len());
        for coverage in coverages {
            if coverage.is_enabled() {
                info!(
                    "Opened land cover coverage {} with {} mappings",
                    coverage.id(),
                    coverage.mappings().len()
                );
                opened.push(coverage);
            } else {
                info!("Skipping disabled land cover coverage {}", coverage.id());
            }
        }
        if opened.is_empty() {
            warn!("Land cover layer has no enabled coverages, every tile will be empty");
        }

        Self {
            profile,
            output,
            stack: Arc::new(CoverageStack::new(opened)),
            dictionary: None,
            cache: None,
            warned_unattached: AtomicBool::new(false),
        }
    }

    /// Keeps finished composites in `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: CompositeCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Rebuilds every coverage's translation table against `dictionary`.
    ///
    /// Meant to be called once after all coverages are open. Calling it again replaces the
    /// dictionary and drops all cached composites.
    pub fn attach_dictionary(&mut self, dictionary: Arc<dyn Dictionary>) {
        if self.dictionary.is_some() {
            warn!("Replacing the land cover dictionary of an already bound layer");
        }
        let stack = self.stack.with_dictionary(dictionary.as_ref());
        self.warn_inexact_codes(&stack);
        self.stack = Arc::new(stack);
        self.dictionary = Some(dictionary);
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
        debug!(
            "Attached land cover dictionary to {} coverages",
            self.stack.len()
        );
    }

    fn warn_inexact_codes(&self, stack: &CoverageStack) {
        let precision = self.output.precision;
        for entry in stack.entries() {
            if let Some(code) = entry.table().mapped_codes().find(|&c| !precision.is_exact(c)) {
                warn!(
                    "Coverage {}: code {code} cannot be stored exactly in {}-bit output",
                    entry.coverage().id(),
                    precision.bits()
                );
            }
        }
    }

    #[must_use]
    pub fn is_dictionary_attached(&self) -> bool {
        self.stack.is_dictionary_attached()
    }

    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    #[must_use]
    pub fn output_config(&self) -> &OutputConfig {
        &self.output
    }

    #[must_use]
    pub fn cache(&self) -> Option<&CompositeCache> {
        self.cache.as_ref()
    }

    /// The coverage stack composites started now would use.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CoverageStack> {
        Arc::clone(&self.stack)
    }

    /// Addresses `coord` in this layer's profile.
    pub fn tile_key(&self, coord: TileCoord) -> Result<TileKey, TileKeyError> {
        TileKey::new(self.profile, coord)
    }

    /// Produces the composited land-cover image for `key`.
    ///
    /// Before a dictionary is attached the image is entirely no-data.
    pub async fn create_image(
        &self,
        key: &TileKey,
        cancel: &CancellationToken,
    ) -> Result<Arc<OutputRaster>, Cancelled> {
        let stack = self.snapshot();
        if !stack.is_dictionary_attached() && !self.warned_unattached.swap(true, Ordering::Relaxed)
        {
            warn!("Land cover tiles requested before a dictionary was attached, output will be empty");
        }

        match &self.cache {
            Some(cache) if key.profile() == &self.profile => {
                cache
                    .get_or_insert(key.coord(), || {
                        composite(key, &stack, &self.output, cancel)
                    })
                    .await
            }
            _ => composite(key, &stack, &self.output, cancel)
                .await
                .map(Arc::new),
        }
    }

    /// One summary per opened coverage, lowest priority first.
    #[must_use]
    pub fn coverage_summaries(&self) -> Vec<CoverageSummary> {
        self.stack
            .entries()
            .iter()
            .map(|entry| {
                let (min_zoom, max_zoom) = entry.coverage().zoom_range();
                CoverageSummary {
                    id: entry.coverage().id().to_string(),
                    min_zoom,
                    max_zoom,
                    table_len: entry.table().len(),
                    mapped: entry.table().mapped_codes().count(),
                }
            })
            .collect()
    }
}
