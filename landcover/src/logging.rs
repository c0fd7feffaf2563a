//! Logging setup for the `landcover` binary using `tracing` and `tracing-subscriber`.
//!
//! Two environment variables control the output:
//! - `RUST_LOG` filters events, e.g. `RUST_LOG=landcover=debug`
//! - `LANDCOVER_FORMAT` selects the format (compact, full, pretty, json)

use std::str::FromStr;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, Layer as _, Registry};

/// Log output format, read from `LANDCOVER_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line logs
    Full,
    /// Full format with shorter lines (default in release builds)
    Compact,
    /// Multi-line logs for local debugging (default in debug builds)
    Pretty,
    /// Newline-delimited JSON
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Compact
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "compact" => Ok(Self::Compact),
            "pretty" | "verbose" => Ok(Self::Pretty),
            "json" | "jsonl" => Ok(Self::Json),
            _ => Err(format!(
                "Invalid log format '{s}'. Valid options: full, compact, pretty, json"
            )),
        }
    }
}

/// Installs the global subscriber with the given filter directives and format name.
///
/// Records emitted through the `log` crate are forwarded to `tracing`.
/// Invalid filters fall back to `debug`, invalid formats to [`LogFormat::default`].
pub fn init_tracing(filter: &str, format: Option<String>) {
    if let Err(e) = tracing_log::LogTracer::builder()
        .with_interest_cache(tracing_log::InterestCacheConfig::default())
        .init()
    {
        eprintln!("Warning: unable to forward log records to tracing: {e}");
    }

    let env_filter = EnvFilter::from_str(filter).unwrap_or_else(|_| {
        eprintln!("Warning: invalid log filter '{filter}', logging everything at debug level");
        EnvFilter::new("debug")
    });

    let format = format
        .and_then(|s| {
            s.parse::<LogFormat>()
                .map_err(|e| eprintln!("Warning: {e}. Falling back to the default format"))
                .ok()
        })
        .unwrap_or_default();

    let fmt_layer = tracing_subscriber::fmt::layer().with_span_events(FmtSpan::NONE);
    let result = match format {
        LogFormat::Full => Registry::default()
            .with(fmt_layer.with_filter(env_filter))
            .try_init(),
        LogFormat::Compact => Registry::default()
            .with(fmt_layer.compact().with_filter(env_filter))
            .try_init(),
        LogFormat::Pretty => Registry::default()
            .with(fmt_layer.pretty().with_filter(env_filter))
            .try_init(),
        LogFormat::Json => Registry::default()
            .with(fmt_layer.json().with_filter(env_filter))
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("Warning: logging was already initialized: {e}");
    }
}

/// Builds the filter directives, mirroring the `landcover=` level onto the engine crate.
///
/// `RUST_LOG=landcover=debug` alone would hide the engine's own events, which are logged
/// under `landcover_core`. Without `RUST_LOG` both default to `info`.
#[must_use]
pub fn core_log_filter(rust_log: Option<String>) -> String {
    const APP: &str = "landcover=";
    const CORE: &str = "landcover_core=";

    let Some(rust_log) = rust_log else {
        return format!("{APP}info,{CORE}info");
    };
    if rust_log.contains(CORE) {
        return rust_log;
    }
    match rust_log.split(',').find_map(|s| s.strip_prefix(APP)) {
        Some(level) => format!("{rust_log},{CORE}{level}"),
        None => rust_log,
    }
}
