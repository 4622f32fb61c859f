//! HTTP route handlers for STAC item generation and STAC-driven TileJSON

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use metrics::counter;

use crate::query::QueryPairs;
use crate::render::{RenderError, RenderParameterResolver, UserRenderQuery};
use crate::server::ApiErrorResponse;
use crate::tilejson::{ImageType, RenderParams, TileJson, TilePath};

use super::service::StacItemProvider;
use super::types::{ItemOptions, StacItem, StacItemQuery};

/// Application state for the STAC routes
#[derive(Clone)]
pub struct StacAppState {
    pub stac_provider: Arc<dyn StacItemProvider>,
    pub resolver: RenderParameterResolver,
    /// Tile endpoint prefix (`/tiles` or `{public_base_url}/tiles`)
    pub tile_prefix: String,
    pub default_minzoom: u8,
    pub default_maxzoom: u8,
}

impl StacAppState {
    pub fn new(stac_provider: Arc<dyn StacItemProvider>, tile_prefix: impl Into<String>) -> Self {
        Self {
            stac_provider,
            resolver: RenderParameterResolver::new(),
            tile_prefix: tile_prefix.into(),
            default_minzoom: 0,
            default_maxzoom: 24,
        }
    }

    pub fn with_default_zoom(mut self, minzoom: u8, maxzoom: u8) -> Self {
        self.default_minzoom = minzoom;
        self.default_maxzoom = maxzoom;
        self
    }
}

/// GET /stac - Create a STAC item for a raster source
pub async fn create_stac_item(
    State(state): State<StacAppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<StacItem>, ApiErrorResponse> {
    let query = StacItemQuery::from_pairs(&QueryPairs::new(pairs))?;

    let item = state
        .stac_provider
        .create_item(&query.src_path, &query.options)
        .await
        .map_err(|e| {
            tracing::warn!("Failed to create STAC item for {}: {}", query.src_path, e);
            ApiErrorResponse::from(e)
        })?;

    Ok(Json(item))
}

/// GET /renders - TileJSON whose tile URL carries render parameters merged
/// from asset defaults, the asset's STAC `render` block and the query
pub async fn create_rendered_tilejson(
    State(state): State<StacAppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<TileJson>, ApiErrorResponse> {
    counter!("tilecast_renders_requests_total", "endpoint" => "stac").increment(1);
    let query = QueryPairs::new(pairs);

    let src_path = query.required("url")?;
    let asset_name = query.last("asset_name").unwrap_or("data");

    let tile_format = match query.last("tile_format") {
        None => None,
        Some(value) => Some(ImageType::parse(value).ok_or_else(|| {
            RenderError::invalid("tile_format", format!("'{}' is not a supported image type", value))
        })?),
    };
    let tile_scale = query.parse::<i64>("tile_scale")?.unwrap_or(1);
    if !(1..=3).contains(&tile_scale) {
        return Err(RenderError::invalid("tile_scale", "must be between 1 and 3").into());
    }
    let minzoom = query.parse::<i64>("minzoom")?;
    let maxzoom = query.parse::<i64>("maxzoom")?;

    let options = ItemOptions::default().with_asset_name(asset_name);
    let item = state
        .stac_provider
        .create_item(src_path, &options)
        .await
        .map_err(|e| {
            counter!("tilecast_upstream_errors_total").increment(1);
            if e.is_upstream_not_found() {
                tracing::debug!("STAC item source not found: {}", e);
                ApiErrorResponse::from(RenderError::UpstreamNotFound(e.to_string()))
            } else {
                tracing::error!("Failed to create STAC item for {}: {}", src_path, e);
                ApiErrorResponse::from(e)
            }
        })?;

    let user = UserRenderQuery::from_pairs(query.as_slice());
    let resolved = state.resolver.resolve_asset(&item.assets, asset_name, &user)?;

    let tile_path = TilePath::new(&state.tile_prefix)
        .with_format(tile_format)
        .with_scale(tile_scale as u8)
        .build();
    let tile_url = resolved.tile_url_with(&tile_path, &[("url", src_path)]);

    let tilejson = TileJson::new(tile_url)
        .with_zoom(
            minzoom.unwrap_or(state.default_minzoom as i64),
            maxzoom.unwrap_or(state.default_maxzoom as i64),
        )?
        .with_bbox(&item.bbox)?
        .with_render(RenderParams::from_set(&resolved.params))
        .finish();

    tracing::debug!(
        "Rendered TileJSON for {} ({}), parameter sources: {:?}",
        src_path,
        asset_name,
        resolved.sources
    );
    Ok(Json(tilejson))
}

/// Build STAC routes
pub fn stac_routes(state: StacAppState) -> Router {
    Router::new()
        .route("/stac", get(create_stac_item))
        .route("/renders", get(create_rendered_tilejson))
        .with_state(state)
}
