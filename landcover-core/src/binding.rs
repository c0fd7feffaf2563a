//! Binding of one coverage to one requested tile.
//!
//! A coverage may not have data at the requested level. Resolution then climbs the tile
//! pyramid until some ancestor yields a raster, and the binding records the affine map
//! from the requested tile's unit square into that raster's unit square.

use landcover_tile_utils::TileKey;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::Cancelled;
use crate::coverage::Coverage;
use crate::raster::SourceRaster;

/// Upper bound on the number of ancestors visited while looking for a raster.
pub const MAX_ANCESTOR_LEVELS: u8 = 32;

/// Slack allowed on mapped coordinates before they count as outside the raster.
const EDGE_EPSILON: f64 = 1e-9;

/// A coverage raster positioned relative to a requested tile.
#[derive(Clone, Debug, PartialEq)]
pub struct CoverageBinding {
    resolved: TileKey,
    raster: SourceRaster,
    scale: (f64, f64),
    bias: (f64, f64),
}

impl CoverageBinding {
    /// Places `raster`, fetched for `resolved`, under the `requested` tile.
    #[must_use]
    pub fn new(requested: &TileKey, resolved: TileKey, raster: SourceRaster) -> Self {
        let tile = requested.extent();
        let image = raster.extent();
        Self {
            resolved,
            scale: (tile.width / image.width, tile.height / image.height),
            bias: (
                (tile.x_min - image.x_min) / image.width,
                (tile.y_min - image.y_min) / image.height,
            ),
            raster,
        }
    }

    /// Address the raster was actually fetched for, the requested tile or an ancestor.
    #[must_use]
    pub fn resolved(&self) -> &TileKey {
        &self.resolved
    }

    #[must_use]
    pub fn raster(&self) -> &SourceRaster {
        &self.raster
    }

    #[must_use]
    pub fn scale(&self) -> (f64, f64) {
        self.scale
    }

    #[must_use]
    pub fn bias(&self) -> (f64, f64) {
        self.bias
    }

    /// Maps a unit coordinate of the requested tile into the raster's unit square.
    ///
    /// Returns `None` when the point falls outside the raster on either axis.
    #[must_use]
    pub fn map(&self, u: f64, v: f64) -> Option<(f64, f64)> {
        let s = self.scale.0.mul_add(u, self.bias.0);
        let t = self.scale.1.mul_add(v, self.bias.1);
        let inside = |c: f64| (-EDGE_EPSILON..=1.0 + EDGE_EPSILON).contains(&c);
        (inside(s) && inside(t)).then(|| (s.clamp(0.0, 1.0), t.clamp(0.0, 1.0)))
    }

    /// Nearest-neighbor raw value at unit coordinate `(u, v)` of the requested tile.
    #[must_use]
    pub fn sample(&self, u: f64, v: f64) -> Option<f32> {
        self.map(u, v)
            .map(|(s, t)| self.raster.sample_nearest(s, t))
    }
}

/// Finds the raster that `coverage` can contribute to `key`.
///
/// Returns `Ok(None)` when the coverage is disabled, `key` is outside its legal range,
/// or neither the tile nor any of its ancestors has data. Provider failures are logged
/// and treated as missing data at that level.
pub async fn resolve(
    key: &TileKey,
    coverage: &Coverage,
    cancel: &CancellationToken,
) -> Result<Option<CoverageBinding>, Cancelled> {
    if !coverage.is_enabled() || !coverage.is_key_in_legal_range(key) {
        trace!("Coverage {} does not cover tile {key}", coverage.id());
        return Ok(None);
    }

    let mut candidate = Some(*key);
    let mut climbed = 0;
    while let Some(current) = candidate {
        if climbed > MAX_ANCESTOR_LEVELS {
            warn!(
                "Coverage {}: gave up looking for data above tile {key} after {MAX_ANCESTOR_LEVELS} levels",
                coverage.id()
            );
            break;
        }
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }

        match coverage.provider().fetch(&current, cancel).await {
            Ok(Some(raster)) => {
                if cancel.is_cancelled() {
                    return Err(Cancelled);
                }
                if climbed > 0 {
                    debug!(
                        "Coverage {}: tile {key} is magnified from ancestor {current}",
                        coverage.id()
                    );
                }
                return Ok(Some(CoverageBinding::new(key, current, raster)));
            }
            Ok(None) => {}
            Err(e) => warn!(
                "Coverage {}: provider {} is unable to read tile {current}, trying its parent: {e}",
                coverage.id(),
                coverage.provider().get_id()
            ),
        }

        if cancel.is_cancelled() {
            return Err(Cancelled);
        }
        candidate = current.parent();
        climbed += 1;
    }

    trace!("Coverage {} has no data for tile {key}", coverage.id());
    Ok(None)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use landcover_tile_utils::{GeoExtent, Profile, TileCoord};
    use rstest::rstest;

    use async_trait::async_trait;
    use tracing_test::traced_test;

    use super::*;
    use crate::provider::{MemoryProvider, ProviderError, ProviderResult, RasterProvider};

    fn key(z: u8, x: u32, y: u32) -> TileKey {
        TileKey::new(Profile::GLOBAL_GEODETIC, TileCoord::new(z, x, y)).unwrap()
    }

    fn raster_for(key: &TileKey, value: f32) -> SourceRaster {
        SourceRaster::filled(4, 4, value, key.extent()).unwrap()
    }

    #[test]
    fn test_same_level_is_identity() {
        let k = key(2, 3, 1);
        let binding = CoverageBinding::new(&k, k, raster_for(&k, 1.0));
        assert_relative_eq!(binding.scale().0, 1.0);
        assert_relative_eq!(binding.scale().1, 1.0);
        assert_relative_eq!(binding.bias().0, 0.0);
        assert_relative_eq!(binding.bias().1, 0.0);
        assert_eq!(binding.map(0.25, 0.75), Some((0.25, 0.75)));
    }

    #[rstest]
    #[case(key(3, 0, 0))]
    #[case(key(3, 3, 3))]
    #[case(key(5, 13, 2))]
    #[case(key(7, 63, 31))]
    fn test_magnified_square_stays_inside(#[case] requested: TileKey) {
        let mut ancestor = requested;
        while ancestor.level() > 1 {
            ancestor = ancestor.parent().unwrap();
        }
        let binding = CoverageBinding::new(&requested, ancestor, raster_for(&ancestor, 1.0));
        let scale = 1.0 / f64::from(1_u32 << (requested.level() - 1));
        assert_relative_eq!(binding.scale().0, scale);
        assert_relative_eq!(binding.scale().1, scale);
        for (u, v) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0), (0.5, 0.5)] {
            let (s, t) = binding.map(u, v).unwrap();
            assert!((0.0..=1.0).contains(&s));
            assert!((0.0..=1.0).contains(&t));
        }
    }

    #[test]
    fn test_child_bias() {
        // level 1 tile (1,0) spans lon -90..0, lat 0..90; its north-east child is (2,3,0)
        let parent = key(1, 1, 0);
        let child = key(2, 3, 0);
        let binding = CoverageBinding::new(&child, parent, raster_for(&parent, 1.0));
        assert_relative_eq!(binding.scale().0, 0.5);
        assert_relative_eq!(binding.bias().0, 0.5);
        assert_relative_eq!(binding.bias().1, 0.5);
    }

    #[test]
    fn test_partial_raster_leaves_gaps() {
        // raster covers only the western half of the tile
        let k = key(0, 0, 0);
        let west = GeoExtent::new(-180.0, -90.0, 90.0, 180.0);
        let raster = SourceRaster::filled(2, 2, 4.0, west).unwrap();
        let binding = CoverageBinding::new(&k, k, raster);
        assert_eq!(binding.sample(0.25, 0.5), Some(4.0));
        assert_eq!(binding.sample(0.75, 0.5), None);
    }

    #[tokio::test]
    async fn test_resolve_climbs_to_ancestor() {
        let root = key(1, 0, 0);
        let provider = MemoryProvider::new("p").with_tile(root.coord(), raster_for(&root, 9.0));
        let coverage = Coverage::new("c", Box::new(provider));

        let requested = key(4, 2, 3);
        let binding = resolve(&requested, &coverage, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(binding.resolved(), &root);
        assert_eq!(binding.sample(0.5, 0.5), Some(9.0));
    }

    #[tokio::test]
    async fn test_resolve_absent() {
        let coverage = Coverage::new("c", Box::new(MemoryProvider::new("p")));
        let res = resolve(&key(3, 1, 1), &coverage, &CancellationToken::new()).await;
        assert_eq!(res, Ok(None));
    }

    #[tokio::test]
    async fn test_resolve_skips_disabled_and_out_of_range() {
        let k = key(2, 0, 0);
        let provider = MemoryProvider::new("p").with_tile(k.coord(), raster_for(&k, 1.0));
        let disabled = Coverage::new("c", Box::new(provider)).with_enabled(false);
        let cancel = CancellationToken::new();
        assert_eq!(resolve(&k, &disabled, &cancel).await, Ok(None));

        let provider = MemoryProvider::new("p").with_tile(k.coord(), raster_for(&k, 1.0));
        let shallow = Coverage::new("c", Box::new(provider)).with_zoom_range(0, 1);
        assert_eq!(resolve(&k, &shallow, &cancel).await, Ok(None));
    }

    /// Fails for every tile except the root.
    #[derive(Debug)]
    struct BrokenBelowRoot(MemoryProvider);

    #[async_trait]
    impl RasterProvider for BrokenBelowRoot {
        fn get_id(&self) -> &str {
            "broken-store"
        }

        async fn fetch(
            &self,
            key: &TileKey,
            cancel: &CancellationToken,
        ) -> ProviderResult<Option<SourceRaster>> {
            if key.level() > 0 {
                return Err(ProviderError::OtherError("disk on fire".into()));
            }
            self.0.fetch(key, cancel).await
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_resolve_logs_provider_failures() {
        let root = TileKey::new(Profile::GLOBAL_GEODETIC, TileCoord::new(0, 0, 0)).unwrap();
        let provider =
            BrokenBelowRoot(MemoryProvider::new("p").with_tile(root.coord(), raster_for(&root, 4.0)));
        let coverage = Coverage::new("c", Box::new(provider));

        let binding = resolve(&key(2, 1, 1), &coverage, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(binding.resolved(), &root);
        assert!(logs_contain("provider broken-store is unable to read tile 2,1,1"));
        assert!(logs_contain("disk on fire"));
    }

    #[tokio::test]
    async fn test_resolve_cancelled() {
        let k = key(5, 0, 0);
        let coverage = Coverage::new("c", Box::new(MemoryProvider::new("p")));
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(resolve(&k, &coverage, &cancel).await, Err(Cancelled));
    }
}
