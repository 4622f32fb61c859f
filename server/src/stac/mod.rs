//! STAC extension
//!
//! This module provides:
//! - `StacItemProvider` trait for abstracting STAC item generation
//! - `RasterStacProvider`, which builds items from raster metadata
//! - `GET /stac` (item generation) and `GET /renders` (STAC-driven TileJSON)

mod builder;
pub mod routes;
mod service;
mod types;

pub use builder::{RasterStacProvider, build_item, default_item_id};
pub use routes::{StacAppState, stac_routes};
pub use service::StacItemProvider;
pub use types::{
    EO_EXTENSION, ItemOptions, MEDIA_TYPES, PROJECTION_EXTENSION, RASTER_EXTENSION, StacError,
    StacItem, StacItemQuery, StacLink, parse_datetime,
};
