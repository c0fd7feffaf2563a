//! A single land-cover data source and the range of tiles it may answer.

use landcover_tile_utils::{GeoExtent, MAX_ZOOM, TileKey};

use crate::codes::ValueMapping;
use crate::provider::BoxedProvider;
use crate::raster::NO_DATA_VALUE;

/// One named source of classified land-cover rasters with its own code space.
///
/// A coverage only answers tiles within its zoom range whose extent intersects its bounds.
/// Raw texels equal to [`Coverage::nodata`] never contribute to a composite.
#[derive(Debug)]
pub struct Coverage {
    id: String,
    enabled: bool,
    min_zoom: u8,
    max_zoom: u8,
    bounds: Option<GeoExtent>,
    nodata: f32,
    mappings: Vec<ValueMapping>,
    provider: BoxedProvider,
}

impl Coverage {
    #[must_use]
    pub fn new(id: impl Into<String>, provider: BoxedProvider) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            min_zoom: 0,
            max_zoom: MAX_ZOOM,
            bounds: None,
            nodata: NO_DATA_VALUE,
            mappings: Vec::new(),
            provider,
        }
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    /// Limits the coverage to tiles intersecting `bounds`, in profile units.
    #[must_use]
    pub fn with_bounds(mut self, bounds: GeoExtent) -> Self {
        self.bounds = Some(bounds);
        self
    }

    #[must_use]
    pub fn with_nodata(mut self, nodata: f32) -> Self {
        self.nodata = nodata;
        self
    }

    #[must_use]
    pub fn with_mappings(mut self, mappings: Vec<ValueMapping>) -> Self {
        self.mappings = mappings;
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn zoom_range(&self) -> (u8, u8) {
        (self.min_zoom, self.max_zoom)
    }

    #[must_use]
    pub fn bounds(&self) -> Option<&GeoExtent> {
        self.bounds.as_ref()
    }

    #[must_use]
    pub fn nodata(&self) -> f32 {
        self.nodata
    }

    #[must_use]
    pub fn mappings(&self) -> &[ValueMapping] {
        &self.mappings
    }

    #[must_use]
    pub fn provider(&self) -> &BoxedProvider {
        &self.provider
    }

    /// Whether `key` is within this coverage's zoom range and bounds.
    #[must_use]
    pub fn is_key_in_legal_range(&self, key: &TileKey) -> bool {
        let level = key.level();
        if level < self.min_zoom || level > self.max_zoom {
            return false;
        }
        self.bounds
            .is_none_or(|bounds| bounds.intersects(&key.extent()))
    }

    /// Whether a raw texel is this coverage's "no data" marker.
    #[must_use]
    pub fn is_no_data(&self, raw: f32) -> bool {
        raw == self.nodata
    }
}
