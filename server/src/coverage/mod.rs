//! OGC Coverage API extension
//!
//! Coverage listing, per-dataset metadata and GeoTIFF data access over a
//! `RasterReader`.

pub mod routes;
mod types;

pub use routes::{CoverageAppState, coverage_routes};
pub use types::{
    CoverageList, CoverageMetadata, DEFAULT_COVERAGE_ID, GEOTIFF_CONTENT_TYPE, Link,
};
