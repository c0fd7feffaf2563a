use std::io;
use std::path::PathBuf;

use landcover_core::Cancelled;
use landcover_tile_utils::TileKeyError;

use crate::config::ConfigFileError;

/// A convenience [`Result`] for the `landcover` crate.
pub type LandCoverAppResult<T> = Result<T, LandCoverAppError>;

#[derive(thiserror::Error, Debug)]
pub enum LandCoverAppError {
    #[error(transparent)]
    ConfigFileError(#[from] ConfigFileError),

    #[error(transparent)]
    TileKeyError(#[from] TileKeyError),

    #[error("Unable to write tile {1}: {0}")]
    TiffWriteError(#[source] tiff::TiffError, PathBuf),

    #[error("Unable to create {1}: {0}")]
    IoError(#[source] io::Error, PathBuf),

    #[error("Rendering was interrupted")]
    Cancelled(#[from] Cancelled),
}
