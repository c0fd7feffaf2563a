//! Sources of coverage rasters.
//!
//! The compositor only needs one thing from a coverage: the raster of a given tile,
//! if the coverage has one. Two implementations ship with the crate:
//! - [`MemoryProvider`] keeps rasters in memory
//! - [`TiffProvider`] reads single-band `GeoTIFF` tiles from a `{z}/{x}/{y}.tif` directory tree

use std::fmt::Debug;
use std::path::PathBuf;

use async_trait::async_trait;
use landcover_tile_utils::TileKey;
use tokio_util::sync::CancellationToken;

use crate::raster::SourceRaster;

mod memory;
pub use memory::MemoryProvider;

#[cfg(feature = "tiff")]
mod geotiff;
#[cfg(feature = "tiff")]
pub use geotiff::TiffProvider;

/// Produces the raster of a coverage for a tile address.
///
/// Implementations must tolerate being called repeatedly for the same key and should
/// return early when `cancel` fires. Timeouts are the provider's own business.
#[async_trait]
pub trait RasterProvider: Send + Sync + Debug {
    /// Identifier used in logs.
    fn get_id(&self) -> &str;

    /// Returns the raster for `key`, or `None` when the provider has no data for it.
    ///
    /// The returned raster's extent is used to place it relative to the requested tile.
    async fn fetch(
        &self,
        key: &TileKey,
        cancel: &CancellationToken,
    ) -> ProviderResult<Option<SourceRaster>>;
}

/// Boxed provider trait object, owned by a [`Coverage`](crate::coverage::Coverage).
pub type BoxedProvider = Box<dyn RasterProvider>;

/// Errors raised while producing a coverage raster.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("IO error {0}: {1}")]
    IoError(#[source] std::io::Error, PathBuf),

    #[error("Coverage directory {0} does not exist or is not a directory")]
    NotADirectory(PathBuf),

    #[cfg(feature = "tiff")]
    #[error("Couldn't decode {1} as tiff file: {0}")]
    InvalidTiffFile(#[source] tiff::TiffError, PathBuf),

    #[error("Unsupported image layout in {1}: {0}. Only single-band images are supported")]
    UnsupportedLayout(String, PathBuf),

    #[error("Raster {1} could not be built: {0}")]
    InvalidRaster(#[source] Box<crate::LandCoverError>, PathBuf),

    /// Errors from providers implemented outside of `landcover-core`.
    #[error(transparent)]
    OtherError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// A convenience [`Result`] for raster providers.
pub type ProviderResult<T> = Result<T, ProviderError>;
