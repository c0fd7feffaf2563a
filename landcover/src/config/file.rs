use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::fs::File;
use std::io::{Read as _, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use landcover_core::cache::CompositeCache;
use landcover_core::codes::ValueMapping;
use landcover_core::coverage::Coverage;
use landcover_core::dictionary::{LandCoverClass, LandCoverDictionary};
use landcover_core::layer::LandCoverLayer;
use landcover_core::provider::{ProviderResult, TiffProvider};
use landcover_core::raster::{DEFAULT_TILE_SIZE, OutputConfig, Precision};
use landcover_tile_utils::{GeoExtent, MAX_ZOOM, Profile};
use serde::{Deserialize, Serialize};
use subst::VariableMap;
use tracing::{error, info, warn};

use crate::config::{ConfigFileError, ConfigFileResult};

pub type UnrecognizedValues = HashMap<String, serde_yaml::Value>;
pub type UnrecognizedKeys = HashSet<String>;

/// Composite cache size used when `cache_size_mb` is not set.
pub const DEFAULT_CACHE_SIZE_MB: u64 = 64;

#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Tiling scheme shared by requested tiles and coverage directories
    pub profile: Option<ProfileConfig>,

    /// Output precision in bits, 16 or 32. Selects the no-data value.
    pub bits: Option<u8>,

    /// Edge length of composited tiles in pixels
    pub tile_size: Option<u32>,

    /// Maximum size of the composite cache in megabytes (0 to disable)
    pub cache_size_mb: Option<u64>,

    /// Maximum lifetime of cached composites, e.g. "10m" or "1h"
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde"
    )]
    pub cache_expiry: Option<Duration>,

    /// Land-cover classes shared by all coverages. Without it every tile is empty.
    pub dictionary: Option<Vec<LandCoverClass>>,

    /// Coverages from lowest to highest priority
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coverages: Vec<CoverageConfig>,

    #[serde(flatten, skip_serializing)]
    pub unrecognized: UnrecognizedValues,
}

/// Either a named stock profile or a custom grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileConfig {
    Named(NamedProfile),
    Custom {
        /// `[west, south, east, north]` of the whole grid
        bounds: [f64; 4],
        tiles_wide: u32,
        tiles_high: u32,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamedProfile {
    #[default]
    GlobalGeodetic,
    SphericalMercator,
}

impl ProfileConfig {
    pub fn to_profile(&self) -> ConfigFileResult<Profile> {
        match *self {
            Self::Named(NamedProfile::GlobalGeodetic) => Ok(Profile::GLOBAL_GEODETIC),
            Self::Named(NamedProfile::SphericalMercator) => Ok(Profile::SPHERICAL_MERCATOR),
            Self::Custom {
                bounds: [west, south, east, north],
                tiles_wide,
                tiles_high,
            } => Profile::new(
                GeoExtent::from_bounds(west, south, east, north),
                tiles_wide,
                tiles_high,
            )
            .map_err(ConfigFileError::InvalidProfile),
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageConfig {
    pub id: String,

    /// Disabled coverages are not opened. Defaults to true.
    pub enabled: Option<bool>,

    pub source: SourceConfig,

    /// Raw value meaning "no data". Defaults to the lowest finite `f32`.
    pub nodata: Option<f32>,

    pub min_zoom: Option<u8>,
    pub max_zoom: Option<u8>,

    /// `[west, south, east, north]` in profile units
    pub bounds: Option<[f64; 4]>,

    /// Raw value to class name pairs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mappings: Vec<ValueMapping>,

    #[serde(flatten, skip_serializing)]
    pub unrecognized: UnrecognizedValues,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory of single-band `{z}/{x}/{y}.tif` tiles
    pub tiff: PathBuf,

    #[serde(flatten, skip_serializing)]
    pub unrecognized: UnrecognizedValues,
}

impl CoverageConfig {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    fn validate(&self) -> ConfigFileResult<()> {
        if self.id.trim().is_empty() {
            return Err(ConfigFileError::EmptyCoverageId);
        }
        let min_zoom = self.min_zoom.unwrap_or(0);
        let max_zoom = self.max_zoom.unwrap_or(MAX_ZOOM);
        if min_zoom > max_zoom {
            return Err(ConfigFileError::InvalidZoomRange(
                self.id.clone(),
                min_zoom,
                max_zoom,
            ));
        }
        if let Some(bounds @ [west, south, east, north]) = self.bounds
            && !(west < east && south < north && bounds.iter().all(|v| v.is_finite()))
        {
            return Err(ConfigFileError::InvalidBounds(self.id.clone(), bounds));
        }
        Ok(())
    }

    /// Opens the coverage's tile directory.
    pub fn open(&self) -> ProviderResult<Coverage> {
        let provider = TiffProvider::new(self.id.clone(), self.source.tiff.clone())?;
        let mut coverage = Coverage::new(self.id.clone(), Box::new(provider))
            .with_enabled(self.is_enabled())
            .with_zoom_range(
                self.min_zoom.unwrap_or(0),
                self.max_zoom.unwrap_or(MAX_ZOOM),
            )
            .with_mappings(self.mappings.clone());
        if let Some(nodata) = self.nodata {
            coverage = coverage.with_nodata(nodata);
        }
        if let Some([west, south, east, north]) = self.bounds {
            coverage = coverage.with_bounds(GeoExtent::from_bounds(west, south, east, north));
        }
        Ok(coverage)
    }
}

impl Config {
    /// Validates the configuration and warns about keys that were not recognized.
    pub fn finalize(&mut self) -> ConfigFileResult<UnrecognizedKeys> {
        let mut res = UnrecognizedKeys::new();
        copy_unrecognized_keys_from_config(&mut res, "", &self.unrecognized);

        self.output_config()?;
        self.profile()?;

        let mut ids = HashSet::new();
        for (idx, coverage) in self.coverages.iter().enumerate() {
            coverage.validate()?;
            if !ids.insert(coverage.id.as_str()) {
                warn!(
                    "Coverage id {} is used more than once, log messages may be ambiguous",
                    coverage.id
                );
            }
            let prefix = format!("coverages[{idx}].");
            copy_unrecognized_keys_from_config(&mut res, &prefix, &coverage.unrecognized);
            copy_unrecognized_keys_from_config(
                &mut res,
                &format!("{prefix}source."),
                &coverage.source.unrecognized,
            );
        }

        for key in &res {
            warn!(
                "Ignoring unrecognized configuration key '{key}'. Please check your configuration file for typos."
            );
        }
        if self.coverages.is_empty() {
            warn!("No coverages are configured, every tile will be empty");
        }
        Ok(res)
    }

    pub fn profile(&self) -> ConfigFileResult<Profile> {
        self.profile
            .unwrap_or(ProfileConfig::Named(NamedProfile::default()))
            .to_profile()
    }

    pub fn output_config(&self) -> ConfigFileResult<OutputConfig> {
        let precision = match self.bits {
            Some(bits) => Precision::try_from(bits).map_err(ConfigFileError::InvalidBits)?,
            None => Precision::default(),
        };
        let tile_size = self.tile_size.unwrap_or(DEFAULT_TILE_SIZE);
        if tile_size == 0 {
            return Err(ConfigFileError::InvalidTileSize(tile_size));
        }
        Ok(OutputConfig {
            precision,
            tile_size,
        })
    }

    /// Opens the enabled coverages and binds them to the dictionary.
    ///
    /// Coverages whose tile directory cannot be opened are logged and left out,
    /// so one broken coverage does not take the whole layer down.
    pub fn resolve(&self) -> ConfigFileResult<LandCoverLayer> {
        let profile = self.profile()?;
        let output = self.output_config()?;

        let mut coverages = Vec::with_capacity(self.coverages.len());
        for cfg in &self.coverages {
            if !cfg.is_enabled() {
                info!("Skipping disabled land cover coverage {}", cfg.id);
                continue;
            }
            match cfg.open() {
                Ok(coverage) => coverages.push(coverage),
                Err(e) => error!("Unable to open coverage {}, skipping it: {e}", cfg.id),
            }
        }

        let mut layer = LandCoverLayer::open(profile, output, coverages);

        let cache_size_mb = self.cache_size_mb.unwrap_or(DEFAULT_CACHE_SIZE_MB);
        if cache_size_mb > 0 {
            layer = layer.with_cache(CompositeCache::new(
                cache_size_mb.saturating_mul(1024 * 1024),
                self.cache_expiry,
            ));
        } else if self.cache_expiry.is_some() {
            warn!("Composite cache is not enabled, ignoring cache_expiry");
        }

        match &self.dictionary {
            Some(classes) => {
                info!("Using a land cover dictionary of {} classes", classes.len());
                layer.attach_dictionary(Arc::new(LandCoverDictionary::new(classes.clone())));
            }
            None => warn!("No land cover dictionary is configured, every tile will be empty"),
        }
        Ok(layer)
    }

    /// Writes the effective configuration as YAML, or prints it when `file_name` is `-`.
    pub fn save_to_file(&self, file_name: &Path) -> ConfigFileResult<()> {
        let yaml = serde_yaml::to_string(&self)?;
        if file_name.as_os_str() == OsStr::new("-") {
            info!("Current land cover configuration:");
            println!("\n\n{yaml}\n");
            Ok(())
        } else {
            info!(
                "Saving config to {}, use --config to load it",
                file_name.display()
            );
            File::create(file_name)
                .map_err(|e| ConfigFileError::ConfigWriteError(e, file_name.to_path_buf()))?
                .write_all(yaml.as_bytes())
                .map_err(|e| ConfigFileError::ConfigWriteError(e, file_name.to_path_buf()))
        }
    }
}

pub fn copy_unrecognized_keys_from_config(
    result: &mut UnrecognizedKeys,
    prefix: &str,
    unrecognized: &UnrecognizedValues,
) {
    result.extend(unrecognized.keys().map(|k| format!("{prefix}{k}")));
}

pub fn read_config<'a, M>(file_name: &Path, env: &'a M) -> ConfigFileResult<Config>
where
    M: VariableMap<'a>,
    M::Value: AsRef<str>,
{
    let mut file =
        File::open(file_name).map_err(|e| ConfigFileError::ConfigLoadError(e, file_name.into()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| ConfigFileError::ConfigLoadError(e, file_name.into()))?;
    parse_config(&contents, env, file_name)
}

pub fn parse_config<'a, M>(contents: &str, env: &'a M, file_name: &Path) -> ConfigFileResult<Config>
where
    M: VariableMap<'a>,
    M::Value: AsRef<str>,
{
    subst::yaml::from_str(contents, env)
        .map_err(|e| ConfigFileError::ConfigParseError(e, file_name.into()))
}
