//! HTTP application assembly
//!
//! Each extension owns a router with its own state; `build_router` merges
//! them and adds the tracing and CORS layers.

mod error;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::coverage::{CoverageAppState, coverage_routes};
use crate::raster::RasterReader;
use crate::render::{RenderAppState, render_routes};
use crate::stac::{StacAppState, StacItemProvider, stac_routes};

pub use error::ApiErrorResponse;

/// Build the extension routes around the given collaborators
pub fn build_router(
    config: &Config,
    raster_reader: Arc<dyn RasterReader>,
    stac_provider: Arc<dyn StacItemProvider>,
) -> Router {
    let tile_prefix = config.tile_prefix();

    let stac_state = StacAppState::new(stac_provider, tile_prefix.clone())
        .with_default_zoom(config.tiles.default_minzoom, config.tiles.default_maxzoom);
    let render_state = RenderAppState { tile_prefix };
    let coverage_state = CoverageAppState {
        raster_reader,
        public_base_url: config.public_base_url.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(coverage_routes(coverage_state))
        .merge(stac_routes(stac_state))
        .merge(render_routes(render_state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
