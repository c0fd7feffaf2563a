//! Writes composited tiles as single-band float GeoTIFFs.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use landcover_core::raster::OutputRaster;
use landcover_tile_utils::TileCoord;
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;

use crate::{LandCoverAppError, LandCoverAppResult};

/// Location of a tile below `dir`, laid out as `{z}/{x}/{y}.tif`.
#[must_use]
pub fn tile_path(dir: &Path, coord: TileCoord) -> PathBuf {
    dir.join(coord.z.to_string())
        .join(coord.x.to_string())
        .join(format!("{}.tif", coord.y))
}

/// Writes `raster` north-up as 32-bit float samples, recording the no-data value in the
/// GDAL no-data tag. Half precision tiles hold values a 16-bit float represents,
/// so they are stored widened.
pub fn write_tiff(path: &Path, raster: &OutputRaster) -> LandCoverAppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| LandCoverAppError::IoError(e, parent.to_path_buf()))?;
    }
    let file = File::create(path).map_err(|e| LandCoverAppError::IoError(e, path.to_path_buf()))?;
    let tiff_err = |e: tiff::TiffError| LandCoverAppError::TiffWriteError(e, path.to_path_buf());

    let mut encoder = TiffEncoder::new(BufWriter::new(file)).map_err(tiff_err)?;
    let mut image = encoder
        .new_image::<colortype::Gray32Float>(raster.size(), raster.size())
        .map_err(tiff_err)?;
    let nodata = raster.no_data().to_string();
    image
        .encoder()
        .write_tag(Tag::GdalNodata, nodata.as_str())
        .map_err(tiff_err)?;

    let data: Vec<f32> = raster.rows_north_up().flatten().copied().collect();
    image.write_data(&data).map_err(tiff_err)
}
