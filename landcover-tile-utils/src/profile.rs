//! Quad-subdivided tiling profiles.

use serde::{Deserialize, Serialize};

use crate::{GeoExtent, MAX_ZOOM, TileKeyError};

/// Length of the equator in the spherical mercator projection, in metres.
pub const EARTH_CIRCUMFERENCE: f64 = 40_075_016.685_578_5;

/// Defines the extent of the whole grid and how many tiles cover it at level 0.
///
/// Every level doubles the tile count along both axes, so a child extent is always
/// nested inside its parent extent. Rows are counted from the northern edge, the same
/// way XYZ tile servers count them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Extent of the entire grid
    pub extent: GeoExtent,
    /// Number of tile columns at level 0
    pub tiles_wide: u32,
    /// Number of tile rows at level 0
    pub tiles_high: u32,
}

impl Profile {
    /// WGS84 longitude/latitude, two tiles at level 0.
    pub const GLOBAL_GEODETIC: Self = Self {
        extent: GeoExtent::new(-180.0, -90.0, 360.0, 180.0),
        tiles_wide: 2,
        tiles_high: 1,
    };

    /// Web mercator metres, a single tile at level 0.
    pub const SPHERICAL_MERCATOR: Self = Self {
        extent: GeoExtent::new(
            -EARTH_CIRCUMFERENCE / 2.0,
            -EARTH_CIRCUMFERENCE / 2.0,
            EARTH_CIRCUMFERENCE,
            EARTH_CIRCUMFERENCE,
        ),
        tiles_wide: 1,
        tiles_high: 1,
    };

    /// Creates a custom profile, validating that the extent is non-empty and the
    /// level-0 grid has at least one tile.
    pub fn new(extent: GeoExtent, tiles_wide: u32, tiles_high: u32) -> Result<Self, TileKeyError> {
        if !extent.is_valid() {
            return Err(TileKeyError::InvalidProfile(format!(
                "extent {:?} must be finite and have a positive size",
                extent.to_bounds()
            )));
        }
        if tiles_wide == 0 || tiles_high == 0 {
            return Err(TileKeyError::InvalidProfile(format!(
                "level 0 must have at least one tile, got {tiles_wide}x{tiles_high}"
            )));
        }
        if tiles_wide.max(tiles_high) > 1 << 8 {
            return Err(TileKeyError::InvalidProfile(format!(
                "level 0 grid {tiles_wide}x{tiles_high} is too large"
            )));
        }
        Ok(Self {
            extent,
            tiles_wide,
            tiles_high,
        })
    }

    /// Number of tiles `(wide, high)` at the given level.
    ///
    /// Levels above [`MAX_ZOOM`] are clamped.
    #[must_use]
    pub fn tile_count(&self, level: u8) -> (u32, u32) {
        let factor = 1_u64 << level.min(MAX_ZOOM);
        let wide = u64::from(self.tiles_wide) * factor;
        let high = u64::from(self.tiles_high) * factor;
        (
            u32::try_from(wide).unwrap_or(u32::MAX),
            u32::try_from(high).unwrap_or(u32::MAX),
        )
    }

    /// Size `(width, height)` of one tile at the given level.
    #[must_use]
    pub fn tile_size(&self, level: u8) -> (f64, f64) {
        let (wide, high) = self.tile_count(level);
        (
            self.extent.width / f64::from(wide),
            self.extent.height / f64::from(high),
        )
    }

    /// Extent of the tile at `(level, x, y)`. Row 0 touches the northern edge.
    ///
    /// Edges are computed as fractions of the whole grid, so a parent and its children
    /// share bit-identical edges at every level.
    #[must_use]
    pub fn tile_extent(&self, level: u8, x: u32, y: u32) -> GeoExtent {
        let (wide, high) = self.tile_count(level);
        let (wide, high) = (f64::from(wide), f64::from(high));
        let column_edge = |i: u32| self.extent.x_min + self.extent.width * f64::from(i) / wide;
        let north = self.extent.y_max();
        let row_edge = |j: u32| north - self.extent.height * f64::from(j) / high;
        let west = column_edge(x);
        let south = row_edge(y.saturating_add(1));
        GeoExtent::new(
            west,
            south,
            column_edge(x.saturating_add(1)) - west,
            row_edge(y) - south,
        )
    }
}
