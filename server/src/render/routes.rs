//! HTTP route handler for query-only render TileJSON

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use metrics::counter;

use crate::query::QueryPairs;
use crate::server::ApiErrorResponse;
use crate::tilejson::{RenderParams, TileJson, TilePath};

use super::encode::{QUERY, urlencode};
use super::params::{ColorMap, RenderKey, RenderParameterSet};
use super::types::RenderError;

/// Bounds of the WebMercatorQuad tile matrix set
pub const WEB_MERCATOR_BOUNDS: [f64; 4] = [-180.0, -85.051129, 180.0, 85.051129];

const CUSTOM_RENDERS_NAME: &str = "Custom Renders TileJSON";
const CUSTOM_CENTER_ZOOM: u8 = 12;

/// Application state for the render routes
#[derive(Clone)]
pub struct RenderAppState {
    /// Tile endpoint prefix (`/tiles` or `{public_base_url}/tiles`)
    pub tile_prefix: String,
}

/// GET /renders/custom - TileJSON built only from the render parameters in the query
pub async fn custom_renders(
    State(state): State<RenderAppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<TileJson>, ApiErrorResponse> {
    counter!("tilecast_renders_requests_total", "endpoint" => "custom").increment(1);
    let query = QueryPairs::new(pairs);

    let src_path = query.required("url")?;
    let params = custom_parameters(&query)?;

    let mut pairs: Vec<(&str, &str)> = vec![("url", src_path)];
    // Keys travel in the order the tiler's own endpoints document them
    for key in [
        RenderKey::Bands,
        RenderKey::Range,
        RenderKey::Nodata,
        RenderKey::Rescale,
        RenderKey::ColorFormula,
        RenderKey::ColormapName,
    ] {
        if let Some(value) = params.get(key) {
            pairs.push((key.as_str(), value));
        }
    }

    let tile_path = TilePath::new(format!(
        "{}/WebMercatorQuad",
        state.tile_prefix.trim_end_matches('/')
    ))
    .build();
    let tile_url = format!("{}?{}", tile_path, urlencode(pairs, QUERY));

    let tilejson = TileJson::new(tile_url)
        .with_name(CUSTOM_RENDERS_NAME)
        .with_zoom(0, 24)?
        .with_bbox(&WEB_MERCATOR_BOUNDS)?
        .with_center((
            (WEB_MERCATOR_BOUNDS[0] + WEB_MERCATOR_BOUNDS[2]) / 2.0,
            (WEB_MERCATOR_BOUNDS[1] + WEB_MERCATOR_BOUNDS[3]) / 2.0,
            CUSTOM_CENTER_ZOOM,
        ))
        .with_render(RenderParams::from_set(&params));

    Ok(Json(tilejson))
}

/// Validate the user's render parameters into a set
fn custom_parameters(query: &QueryPairs) -> Result<RenderParameterSet, RenderError> {
    let mut params = RenderParameterSet::new();

    if let Some(bands) = query.last("bands").filter(|v| !v.is_empty()) {
        let valid = bands.split(',').all(|b| b.trim().parse::<u32>().is_ok());
        if !valid {
            return Err(RenderError::invalid(
                "bands",
                format!("'{}' is not a comma-separated list of band indexes", bands),
            ));
        }
        params.set(RenderKey::Bands, bands);
    }

    if let Some(range) = query.last("range").filter(|v| !v.is_empty()) {
        min_max("range", range)?;
        params.set(RenderKey::Range, range);
    }

    if let Some(nodata) = query.last("nodata") {
        params.set(RenderKey::Nodata, nodata);
    }

    let rescale = query.all("rescale");
    if !rescale.is_empty() {
        let ranges = rescale
            .iter()
            .map(|value| min_max("rescale", value).map(|(min, max)| format!("{},{}", min, max)))
            .collect::<Result<Vec<_>, _>>()?;
        params.set(RenderKey::Rescale, ranges.join(","));
    }

    if let Some(formula) = query.last("color_formula").filter(|v| !v.is_empty()) {
        params.set(RenderKey::ColorFormula, formula);
    }

    let colormap = ColorMap::from_query(query.last("colormap_name"), query.last("colormap"))?;
    if let Some(name) = colormap.and_then(|c| c.name) {
        params.set(RenderKey::ColormapName, name);
    }

    Ok(params)
}

fn min_max(name: &str, value: &str) -> Result<(f64, f64), RenderError> {
    let numbers = value
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| RenderError::invalid(name, format!("'{}' is not a list of numbers", value)))?;

    match numbers.as_slice() {
        &[min, max] => Ok((min, max)),
        _ => Err(RenderError::invalid(
            name,
            format!("expected 'min,max', got {} values", numbers.len()),
        )),
    }
}

/// Build render routes
pub fn render_routes(state: RenderAppState) -> Router {
    Router::new()
        .route("/renders/custom", get(custom_renders))
        .with_state(state)
}
