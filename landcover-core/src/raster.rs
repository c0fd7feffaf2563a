//! Source rasters read from coverages and the composited output raster.

use landcover_tile_utils::GeoExtent;
use serde::{Deserialize, Serialize};

use crate::{LandCoverError, LandCoverResult};

/// Reserved "no classification" value used by coverages and by 32-bit output.
pub const NO_DATA_VALUE: f32 = -f32::MAX;

/// No-data value of 16-bit output, the lowest value a half float stores exactly.
pub const NO_DATA_VALUE_16: f32 = -32768.0;

/// Default edge length of a composited tile, in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// A single-band grid of texels covering a geospatial extent.
///
/// Row 0 is the southern edge, so unit coordinate `t = 0` samples row 0 and
/// `t = 1` samples the last row. Use [`SourceRaster::from_north_up`] for
/// image data that starts at the northern edge.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceRaster {
    width: u32,
    height: u32,
    data: Vec<f32>,
    extent: GeoExtent,
    nodata: Option<f32>,
}

impl SourceRaster {
    /// Creates a raster from south-up rows of texels.
    pub fn new(width: u32, height: u32, data: Vec<f32>, extent: GeoExtent) -> LandCoverResult<Self> {
        if width == 0 || height == 0 || !extent.is_valid() {
            return Err(LandCoverError::EmptyRaster(width, height));
        }
        if data.len() as u64 != u64::from(width) * u64::from(height) {
            return Err(LandCoverError::RasterSizeMismatch(width, height, data.len()));
        }
        Ok(Self {
            width,
            height,
            data,
            extent,
            nodata: None,
        })
    }

    /// Creates a raster from north-up rows, as stored by most image formats.
    pub fn from_north_up(
        width: u32,
        height: u32,
        data: Vec<f32>,
        extent: GeoExtent,
    ) -> LandCoverResult<Self> {
        let mut raster = Self::new(width, height, data, extent)?;
        let row_len = width as usize;
        let flipped = raster
            .data
            .chunks_exact(row_len)
            .rev()
            .flatten()
            .copied()
            .collect();
        raster.data = flipped;
        Ok(raster)
    }

    /// Creates a raster where every texel holds `value`.
    pub fn filled(width: u32, height: u32, value: f32, extent: GeoExtent) -> LandCoverResult<Self> {
        let len = width as usize * height as usize;
        Self::new(width, height, vec![value; len], extent)
    }

    /// Declares an extra raw value that this particular raster uses for "no data",
    /// e.g. one read from the image's own metadata.
    #[must_use]
    pub fn with_nodata(mut self, nodata: Option<f32>) -> Self {
        self.nodata = nodata;
        self
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn extent(&self) -> &GeoExtent {
        &self.extent
    }

    #[must_use]
    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[must_use]
    pub fn get(&self, col: u32, row: u32) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data
            .get(row as usize * self.width as usize + col as usize)
            .copied()
    }

    /// Nearest-neighbor sample at unit coordinate `(s, t)`, clamped into the raster.
    ///
    /// Class codes are categorical, so no interpolation is ever applied.
    #[must_use]
    pub fn sample_nearest(&self, s: f64, t: f64) -> f32 {
        let col = nearest_index(s, self.width);
        let row = nearest_index(t, self.height);
        self.data[row * self.width as usize + col]
    }
}

fn nearest_index(unit: f64, len: u32) -> usize {
    let last = f64::from(len - 1);
    let idx = (unit.clamp(0.0, 1.0) * last).round();
    // `idx` is within [0, last] so the cast cannot truncate.
    (idx as usize).min(len as usize - 1)
}

/// Numeric precision of the composited output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Precision {
    /// 16-bit float texture, codes must stay within the exactly representable range
    Half,
    /// 32-bit float texture
    #[default]
    Single,
}

impl Precision {
    /// Largest integer a 16-bit float holds exactly.
    pub const HALF_EXACT_LIMIT: u32 = 2048;

    #[must_use]
    pub fn bits(self) -> u8 {
        match self {
            Self::Half => 16,
            Self::Single => 32,
        }
    }

    /// The value written to pixels no coverage could classify.
    #[must_use]
    pub fn no_data(self) -> f32 {
        match self {
            Self::Half => NO_DATA_VALUE_16,
            Self::Single => NO_DATA_VALUE,
        }
    }

    /// Whether a dictionary code survives storage at this precision unchanged.
    #[must_use]
    pub fn is_exact(self, code: i32) -> bool {
        match self {
            Self::Half => code.unsigned_abs() <= Self::HALF_EXACT_LIMIT,
            Self::Single => code.unsigned_abs() <= 1 << f32::MANTISSA_DIGITS,
        }
    }
}

impl TryFrom<u8> for Precision {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            16 => Ok(Self::Half),
            32 => Ok(Self::Single),
            v => Err(format!("Unsupported output precision of {v} bits, use 16 or 32")),
        }
    }
}

impl From<Precision> for u8 {
    fn from(value: Precision) -> Self {
        value.bits()
    }
}

/// Shape of the composited tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputConfig {
    /// Numeric precision, which also selects the no-data value
    pub precision: Precision,
    /// Edge length of the square output raster in pixels, at least 1
    pub tile_size: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            precision: Precision::default(),
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

/// Composited, single-channel tile image.
///
/// Texels hold literal dictionary codes or [`Precision::no_data`]; they are never
/// normalized. Row 0 is the southern edge of the tile.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputRaster {
    size: u32,
    precision: Precision,
    data: Vec<f32>,
}

impl OutputRaster {
    /// Allocates a raster where every texel holds the no-data value.
    #[must_use]
    pub fn new(config: &OutputConfig) -> Self {
        let size = config.tile_size.max(1);
        let len = size as usize * size as usize;
        Self {
            size,
            precision: config.precision,
            data: vec![config.precision.no_data(); len],
        }
    }

    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    #[must_use]
    pub fn no_data(&self) -> f32 {
        self.precision.no_data()
    }

    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[must_use]
    pub fn get(&self, col: u32, row: u32) -> Option<f32> {
        if col >= self.size || row >= self.size {
            return None;
        }
        self.data
            .get(row as usize * self.size as usize + col as usize)
            .copied()
    }

    pub(crate) fn set(&mut self, col: u32, row: u32, value: f32) {
        let idx = row as usize * self.size as usize + col as usize;
        self.data[idx] = value;
    }

    /// True when no texel was classified.
    #[must_use]
    pub fn is_all_no_data(&self) -> bool {
        let no_data = self.no_data();
        self.data.iter().all(|&v| v == no_data)
    }

    /// Rows ordered from the northern edge, ready for image encoders.
    pub fn rows_north_up(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.size as usize).rev()
    }

    /// Size in bytes of the texel buffer.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.data.len() * size_of::<f32>()
    }
}
