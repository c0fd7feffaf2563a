use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::{GeoExtent, MAX_ZOOM, Profile, TileKeyError};

/// Level, column and row of a tile, without the profile it belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    #[must_use]
    pub const fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

impl Display for TileCoord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "{}/{}/{}", self.z, self.x, self.y)
        } else {
            write!(f, "{},{},{}", self.z, self.x, self.y)
        }
    }
}

/// Parses `z/x/y` or `z,x,y`.
impl FromStr for TileCoord {
    type Err = TileKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TileKeyError::InvalidCoord(s.to_string());
        let mut parts = s.trim().split(['/', ',']);
        let z = parts.next().ok_or_else(invalid)?;
        let x = parts.next().ok_or_else(invalid)?;
        let y = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self {
            z: z.trim().parse().map_err(|_| invalid())?,
            x: x.trim().parse().map_err(|_| invalid())?,
            y: y.trim().parse().map_err(|_| invalid())?,
        })
    }
}

/// A tile address: a [`TileCoord`] that has been validated against a [`Profile`].
///
/// Keys are immutable. Two keys are equal only if they share the same profile.
///
/// ```
/// # use landcover_tile_utils::{Profile, TileCoord, TileKey};
/// let key = TileKey::new(Profile::GLOBAL_GEODETIC, TileCoord::new(2, 5, 1)).unwrap();
/// let parent = key.parent().unwrap();
/// assert_eq!(parent.coord(), TileCoord::new(1, 2, 0));
/// assert!(parent.extent().contains(&key.extent()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileKey {
    coord: TileCoord,
    profile: Profile,
}

impl TileKey {
    /// Validates `coord` against the tile grid of `profile`.
    pub fn new(profile: Profile, coord: TileCoord) -> Result<Self, TileKeyError> {
        if coord.z > MAX_ZOOM {
            return Err(TileKeyError::ZoomOutOfRange(coord.z));
        }
        let (wide, high) = profile.tile_count(coord.z);
        if coord.x >= wide || coord.y >= high {
            return Err(TileKeyError::OutOfBounds(coord, wide, high));
        }
        Ok(Self { coord, profile })
    }

    #[must_use]
    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    #[must_use]
    pub fn level(&self) -> u8 {
        self.coord.z
    }

    #[must_use]
    pub fn column(&self) -> u32 {
        self.coord.x
    }

    #[must_use]
    pub fn row(&self) -> u32 {
        self.coord.y
    }

    #[must_use]
    pub fn extent(&self) -> GeoExtent {
        self.profile
            .tile_extent(self.coord.z, self.coord.x, self.coord.y)
    }

    /// The key one level up whose extent contains this one, or `None` at level 0.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let z = self.coord.z.checked_sub(1)?;
        Some(Self {
            coord: TileCoord::new(z, self.coord.x / 2, self.coord.y / 2),
            profile: self.profile,
        })
    }

    /// Tile count `(wide, high)` at this key's level.
    #[must_use]
    pub fn tile_count(&self) -> (u32, u32) {
        self.profile.tile_count(self.coord.z)
    }
}

impl Display for TileKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.coord, f)
    }
}
