//! Raster collaborator
//!
//! This module provides:
//! - `RasterReader` trait for abstracting raster metadata and data access
//! - `LocalRasterReader` for GeoTIFFs on disk or behind HTTP(S) URLs
//! - GeoTIFF header parsing and bounds reprojection to WGS84
//! - `RasterInfoCache` for caching parsed metadata per source

mod cache;
mod geotiff;
mod local;
pub mod projection;
mod service;
mod types;

pub use cache::{RasterCacheConfig, RasterInfoCache};
pub use geotiff::parse_geotiff;
pub use local::LocalRasterReader;
pub use service::RasterReader;
pub use types::{BandInfo, Bounds, NOT_FOUND_SIGNATURE, RasterError, RasterInfo};
