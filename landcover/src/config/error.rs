use std::io;
use std::path::PathBuf;

pub type ConfigFileResult<T> = Result<T, ConfigFileError>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigFileError {
    #[error("Unable to load config file {1}: {0}")]
    ConfigLoadError(#[source] io::Error, PathBuf),

    #[error("Unable to parse config file {1}: {0}")]
    ConfigParseError(#[source] subst::yaml::Error, PathBuf),

    #[error("Unable to write config file {1}: {0}")]
    ConfigWriteError(#[source] io::Error, PathBuf),

    #[error("Unable to serialize config: {0}")]
    ConfigSerializeError(#[from] serde_yaml::Error),

    #[error("{0}")]
    InvalidBits(String),

    #[error("tile_size must be at least 1 pixel, got {0}")]
    InvalidTileSize(u32),

    #[error("Coverage {0} has min_zoom {1} greater than max_zoom {2}")]
    InvalidZoomRange(String, u8, u8),

    #[error("Coverage {0} has invalid bounds {1:?}. Expected [west, south, east, north]")]
    InvalidBounds(String, [f64; 4]),

    #[error("Coverage id must not be empty")]
    EmptyCoverageId,

    #[error("Invalid profile: {0}")]
    InvalidProfile(#[source] landcover_tile_utils::TileKeyError),
}
