//! Tilecast Server Library
//!
//! OGC Coverage, STAC and render-parameter extensions for a raster tile
//! service. This module exports the components for use in integration
//! tests and external tooling.

pub mod config;
pub mod coverage;
pub mod query;
pub mod raster;
pub mod render;
pub mod server;
pub mod stac;
pub mod tilejson;

// Re-export commonly used types
pub use raster::{LocalRasterReader, RasterReader};
pub use render::{RenderParameterResolver, ResolvedRender};
pub use server::{ApiErrorResponse, build_router};
pub use stac::{RasterStacProvider, StacItemProvider};
pub use tilejson::TileJson;
