//! Render parameter resolution
//!
//! This module provides:
//! - `RenderParameterSet` and `RenderKey` for the six render parameters
//! - the asset / STAC metadata / user query layers
//! - `RenderParameterResolver`, which merges the layers and serializes the
//!   result into a tile URL query string
//! - the `/renders/custom` route building a TileJSON from query parameters

mod encode;
mod params;
mod resolver;
pub mod routes;
mod sources;
mod types;

pub use encode::{QUERY, QUERY_KEEP_PERCENT, quote_plus, urlencode};
pub use params::{ColorMap, ParameterSource, RenderKey, RenderParameterSet};
pub use resolver::{RenderParameterResolver, ResolvedRender};
pub use routes::{RenderAppState, render_routes};
pub use sources::{
    DEFAULT_BANDS, DEFAULT_RESCALE, UserRenderQuery, asset_defaults, param_string,
    stac_render_layer,
};
pub use types::RenderError;
