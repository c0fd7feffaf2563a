use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use landcover_tile_utils::TileKey;
use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::provider::{ProviderError, ProviderResult, RasterProvider};
use crate::raster::SourceRaster;

/// Reads single-band TIFF tiles laid out as `{root}/{z}/{x}/{y}.tif`.
///
/// Each file covers exactly the extent of its tile key. Integer and float samples are
/// accepted; a `GDAL_NODATA` tag, when present, marks that value as no-data.
/// A missing file means "no data for this tile" rather than an error.
#[derive(Clone, Debug)]
pub struct TiffProvider {
    id: String,
    root: PathBuf,
}

impl TiffProvider {
    pub fn new(id: impl Into<String>, root: PathBuf) -> ProviderResult<Self> {
        if !root.is_dir() {
            return Err(ProviderError::NotADirectory(root));
        }
        Ok(Self {
            id: id.into(),
            root,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn tile_path(&self, key: &TileKey) -> PathBuf {
        self.root
            .join(key.level().to_string())
            .join(key.column().to_string())
            .join(format!("{}.tif", key.row()))
    }
}

#[async_trait]
impl RasterProvider for TiffProvider {
    fn get_id(&self) -> &str {
        &self.id
    }

    async fn fetch(
        &self,
        key: &TileKey,
        cancel: &CancellationToken,
    ) -> ProviderResult<Option<SourceRaster>> {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let path = self.tile_path(key);
        if !path.is_file() {
            trace!("Coverage {} has no tile file {}", self.id, path.display());
            return Ok(None);
        }
        read_tile(&path, key).map(Some)
    }
}

fn read_tile(path: &Path, key: &TileKey) -> ProviderResult<SourceRaster> {
    let file = File::open(path).map_err(|e| ProviderError::IoError(e, path.to_path_buf()))?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(|e| ProviderError::InvalidTiffFile(e, path.to_path_buf()))?;

    let color_type = decoder
        .colortype()
        .map_err(|e| ProviderError::InvalidTiffFile(e, path.to_path_buf()))?;
    if !matches!(color_type, ColorType::Gray(_)) {
        return Err(ProviderError::UnsupportedLayout(
            format!("{color_type:?}"),
            path.to_path_buf(),
        ));
    }

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| ProviderError::InvalidTiffFile(e, path.to_path_buf()))?;

    let nodata = decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|v| v.trim_matches(char::from(0)).trim().parse::<f32>().ok());

    let image = decoder
        .read_image()
        .map_err(|e| ProviderError::InvalidTiffFile(e, path.to_path_buf()))?;
    let data = samples_to_f32(image).ok_or_else(|| {
        ProviderError::UnsupportedLayout("sample format".to_string(), path.to_path_buf())
    })?;

    SourceRaster::from_north_up(width, height, data, key.extent())
        .map(|raster| raster.with_nodata(nodata))
        .map_err(|e| ProviderError::InvalidRaster(Box::new(e), path.to_path_buf()))
}

fn samples_to_f32(image: DecodingResult) -> Option<Vec<f32>> {
    Some(match image {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|s| s as f32).collect(),
        _ => None?,
    })
}
