#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

/// Composite caching
pub mod cache;

/// Coverage binding and ancestor resolution
pub mod binding;

pub mod codes;
pub mod composite;

/// Land-cover data sources
pub mod coverage;

pub mod dictionary;
pub mod layer;
pub mod provider;
pub mod raster;
pub mod stack;

mod error;
pub use error::{Cancelled, LandCoverError, LandCoverResult};
