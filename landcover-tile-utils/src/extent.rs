//! Axis-aligned geospatial extents.

use serde::{Deserialize, Serialize};

/// Relative slack allowed by [`GeoExtent::contains`].
const CONTAINS_TOLERANCE: f64 = 1e-9;

/// An axis-aligned rectangle in the coordinate space of a [`Profile`](crate::Profile).
///
/// The rectangle is stored as its south-west corner plus a size, which is the form
/// the compositing math needs: `bias = (x_min(tile) - x_min(image)) / width(image)`.
///
/// ```
/// # use landcover_tile_utils::GeoExtent;
/// let world = GeoExtent::from_bounds(-180.0, -90.0, 180.0, 90.0);
/// assert_eq!(world.width, 360.0);
/// assert!(world.contains(&GeoExtent::from_bounds(0.0, 0.0, 90.0, 45.0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoExtent {
    /// Western edge
    pub x_min: f64,
    /// Southern edge
    pub y_min: f64,
    /// East-west size, always positive
    pub width: f64,
    /// North-south size, always positive
    pub height: f64,
}

impl GeoExtent {
    #[must_use]
    pub const fn new(x_min: f64, y_min: f64, width: f64, height: f64) -> Self {
        Self {
            x_min,
            y_min,
            width,
            height,
        }
    }

    /// Creates an extent from `[west, south, east, north]` bounds, normalizing swapped edges.
    #[must_use]
    pub fn from_bounds(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            x_min: west.min(east),
            y_min: south.min(north),
            width: (east - west).abs(),
            height: (north - south).abs(),
        }
    }

    #[must_use]
    pub fn x_max(&self) -> f64 {
        self.x_min + self.width
    }

    #[must_use]
    pub fn y_max(&self) -> f64 {
        self.y_min + self.height
    }

    /// Returns `[west, south, east, north]`.
    #[must_use]
    pub fn to_bounds(&self) -> [f64; 4] {
        [self.x_min, self.y_min, self.x_max(), self.y_max()]
    }

    /// True when `other` lies fully inside this extent (edges inclusive).
    ///
    /// Edges may overshoot by a billionth of this extent's size, which absorbs the rounding
    /// of `x_min + width` on large coordinates.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        let tolerance = CONTAINS_TOLERANCE * self.width.max(self.height);
        other.x_min >= self.x_min - tolerance
            && other.y_min >= self.y_min - tolerance
            && other.x_max() <= self.x_max() + tolerance
            && other.y_max() <= self.y_max() + tolerance
    }

    /// True when the two extents share some area. Touching edges do not count.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x_min < other.x_max()
            && other.x_min < self.x_max()
            && self.y_min < other.y_max()
            && other.y_min < self.y_max()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite()
            && self.height.is_finite()
            && self.x_min.is_finite()
            && self.y_min.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_from_bounds_normalizes() {
        let e = GeoExtent::from_bounds(10.0, 20.0, -10.0, -20.0);
        assert_eq!(e, GeoExtent::new(-10.0, -20.0, 20.0, 40.0));
        assert_eq!(e.to_bounds(), [-10.0, -20.0, 10.0, 20.0]);
    }

    #[rstest]
    #[case([0.0, 0.0, 10.0, 10.0], true)]
    #[case([-180.0, -90.0, 180.0, 90.0], true)]
    #[case([-181.0, 0.0, 0.0, 10.0], false)]
    #[case([170.0, 80.0, 180.0, 90.5], false)]
    fn test_contains(#[case] b: [f64; 4], #[case] expected: bool) {
        let world = GeoExtent::from_bounds(-180.0, -90.0, 180.0, 90.0);
        let inner = GeoExtent::from_bounds(b[0], b[1], b[2], b[3]);
        assert_eq!(world.contains(&inner), expected);
    }

    #[test]
    fn test_contains_absorbs_rounding_on_large_coordinates() {
        let outer = GeoExtent::new(-1e7, 0.0, 1e4, 1.0);
        let inner = GeoExtent::new(-1e7 - 1e-6, 0.0, 5e3, 1.0);
        assert!(outer.contains(&inner));
        assert!(!outer.contains(&GeoExtent::new(-1e7 - 1.0, 0.0, 5e3, 1.0)));
    }

    #[rstest]
    #[case([5.0, 5.0, 15.0, 15.0], true)]
    #[case([10.0, 0.0, 20.0, 10.0], false)]
    #[case([-5.0, -5.0, 0.5, 0.5], true)]
    #[case([20.0, 20.0, 30.0, 30.0], false)]
    fn test_intersects(#[case] b: [f64; 4], #[case] expected: bool) {
        let a = GeoExtent::from_bounds(0.0, 0.0, 10.0, 10.0);
        let other = GeoExtent::from_bounds(b[0], b[1], b[2], b[3]);
        assert_eq!(a.intersects(&other), expected);
        assert_eq!(other.intersects(&a), expected);
    }

    #[test]
    fn test_is_valid() {
        assert!(GeoExtent::new(0.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!GeoExtent::new(0.0, 0.0, 0.0, 1.0).is_valid());
        assert!(!GeoExtent::new(f64::NAN, 0.0, 1.0, 1.0).is_valid());
    }
}
