#![cfg_attr(doc, doc = include_str!("../README.md"))]
#![forbid(unsafe_code)]

pub mod config;
pub mod env;
pub mod logging;
pub mod output;
pub mod render;

mod error;
pub use error::{LandCoverAppError, LandCoverAppResult};
