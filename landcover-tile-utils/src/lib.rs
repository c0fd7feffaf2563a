#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod extent;
pub use extent::GeoExtent;

mod key;
pub use key::{TileCoord, TileKey};

mod profile;
pub use profile::{EARTH_CIRCUMFERENCE, Profile};

/// Highest supported tile level.
pub const MAX_ZOOM: u8 = 30;

/// Errors raised while building tile addresses and profiles.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TileKeyError {
    #[error("Zoom level {0} is greater than the maximum supported zoom {MAX_ZOOM}")]
    ZoomOutOfRange(u8),

    #[error("Tile {0:#} is outside of the {1}x{2} tile grid of its level")]
    OutOfBounds(TileCoord, u32, u32),

    #[error("Unable to parse '{0}' as a tile coordinate. Expected z/x/y")]
    InvalidCoord(String),

    #[error("Invalid tiling profile: {0}")]
    InvalidProfile(String),
}
