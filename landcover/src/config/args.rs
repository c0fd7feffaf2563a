use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Parser, Subcommand};
use landcover_tile_utils::TileCoord;

use crate::config::Config;

/// Defines the styles used for the CLI help output.
const HELP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Blue.on_default().bold())
    .usage(AnsiColor::Blue.on_default().bold())
    .literal(AnsiColor::White.on_default())
    .placeholder(AnsiColor::Green.on_default());

/// Parse a human-readable duration string (e.g., "1h", "30m", "1d")
fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}

#[derive(Parser, Debug, PartialEq)]
#[command(
    about,
    version,
    after_help = "Use RUST_LOG environment variable to control logging level, e.g. RUST_LOG=debug or RUST_LOG=landcover=debug.\nUse LANDCOVER_FORMAT environment variable to control output format: compact, full, pretty, or json.",
    styles = HELP_STYLES
)]
pub struct Args {
    #[command(flatten)]
    pub meta: MetaArgs,
    #[command(flatten)]
    pub output: OutputArgs,
    #[command(subcommand)]
    pub command: Command,
}

// None of these params will be transferred to the config
#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct MetaArgs {
    /// Path to the YAML config file describing the dictionary and coverages.
    #[arg(short, long, global = true, default_value = "landcover.yaml")]
    pub config: PathBuf,
    /// Save resulting config to a file or use "-" to print to stdout.
    #[arg(long, global = true)]
    pub save_config: Option<PathBuf>,
}

/// Overrides for values of the config file.
#[derive(clap::Args, Debug, Clone, Default, PartialEq)]
pub struct OutputArgs {
    /// Output precision in bits, 16 or 32. [DEFAULT: 32]
    #[arg(long, global = true)]
    pub bits: Option<u8>,
    /// Composite cache size (in MB), 0 disables the cache.
    #[arg(short = 'C', long, global = true)]
    pub cache_size: Option<u64>,
    /// Maximum lifetime of cached composites.
    ///
    /// Supports human-readable formats like "1h", "30m", "1d", or "3600s".
    #[arg(long, global = true, value_parser = parse_duration)]
    pub cache_expiry: Option<Duration>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Composite tiles and write them as single-band float GeoTIFFs.
    Render(RenderArgs),
    /// List the configured coverages and how many of their codes map to dictionary classes.
    Coverages,
}

#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct RenderArgs {
    /// Tiles to render as `z/x/y`. Can be specified multiple times.
    #[arg(required = true, value_name = "Z/X/Y")]
    pub tiles: Vec<TileCoord>,
    /// Directory receiving `{z}/{x}/{y}.tif` files.
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,
    /// Number of tiles composited at the same time.
    #[arg(long, default_value = "4")]
    pub concurrency: NonZeroUsize,
    /// Also write tiles where no coverage classified a single pixel.
    #[arg(long)]
    pub keep_empty: bool,
}

impl Args {
    /// Overrides config values with the ones from the command line.
    pub fn merge_into_config(&self, config: &mut Config) {
        if self.output.bits.is_some() {
            config.bits = self.output.bits;
        }
        if self.output.cache_size.is_some() {
            config.cache_size_mb = self.output.cache_size;
        }
        if self.output.cache_expiry.is_some() {
            config.cache_expiry = self.output.cache_expiry;
        }
    }
}
