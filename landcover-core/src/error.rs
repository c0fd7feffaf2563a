/// Errors that can occur while assembling coverages and rasters.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum LandCoverError {
    /// Raster dimensions do not match the number of texels supplied.
    #[error("Raster of {0}x{1} texels cannot be built from {2} values")]
    RasterSizeMismatch(u32, u32, usize),

    /// Raster has no texels or a degenerate extent.
    #[error("Raster must have a non-empty size and extent, got {0}x{1}")]
    EmptyRaster(u32, u32),
}

/// A convenience [`Result`] for `landcover-core`.
pub type LandCoverResult<T> = Result<T, LandCoverError>;

/// Returned when a composite or coverage resolution observed its cancellation token.
///
/// Cancellation is an abort requested by the caller, so it carries no partial output.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Tile composite was cancelled")]
pub struct Cancelled;
