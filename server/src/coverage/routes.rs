//! HTTP route handlers for the OGC Coverage API

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::query::QueryPairs;
use crate::raster::{Bounds, RasterError, RasterReader};
use crate::server::ApiErrorResponse;

use super::types::{
    CoverageList, CoverageMetadata, DEFAULT_COVERAGE_ID, GEOTIFF_CONTENT_TYPE, Link,
};

/// Application state for the coverage routes
#[derive(Clone)]
pub struct CoverageAppState {
    pub raster_reader: Arc<dyn RasterReader>,
    /// Public base URL for links; the request's Host header is used when unset
    pub public_base_url: Option<String>,
}

impl CoverageAppState {
    /// Base URL for links, always ending with `/`
    fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(base) = &self.public_base_url {
            return format!("{}/", base.trim_end_matches('/'));
        }
        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("localhost");
        format!("http://{}/", host)
    }
}

/// GET /collections - List available coverages
pub async fn list_coverages(
    State(state): State<CoverageAppState>,
    headers: HeaderMap,
) -> Json<CoverageList> {
    let base_url = state.base_url(&headers);

    Json(CoverageList {
        coverages: vec![CoverageMetadata::summary(
            DEFAULT_COVERAGE_ID,
            "Default Coverage",
            &base_url,
        )],
        links: vec![Link::new(
            format!("{}collections", base_url),
            "self",
            "application/json",
        )],
    })
}

/// GET /collections/:coverage_id - Get coverage metadata
pub async fn get_coverage(
    State(state): State<CoverageAppState>,
    Path(coverage_id): Path<String>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<CoverageMetadata>, ApiErrorResponse> {
    let query = QueryPairs::new(pairs);
    let src_path = query.required("url")?;

    let info = state.raster_reader.info(src_path).await.map_err(|e| {
        tracing::warn!("Failed to read coverage {} ({}): {}", coverage_id, src_path, e);
        ApiErrorResponse::from(e)
    })?;

    Ok(Json(CoverageMetadata::from_raster(
        &coverage_id,
        &info,
        &state.base_url(&headers),
    )))
}

/// GET /collections/:coverage_id/coverage - Get coverage data as GeoTIFF
pub async fn get_coverage_data(
    State(state): State<CoverageAppState>,
    Path(coverage_id): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiErrorResponse> {
    let query = QueryPairs::new(pairs);
    let src_path = query.required("url")?;

    let bbox = query
        .last("bbox")
        .filter(|v| !v.is_empty())
        .map(Bounds::parse)
        .transpose()?;

    // Filters the collaborator cannot apply yet are accepted and ignored
    for name in ["datetime", "properties"] {
        if let Some(value) = query.last(name) {
            tracing::debug!("Ignoring coverage filter {}={}", name, value);
        }
    }

    let data = state
        .raster_reader
        .read(src_path, bbox)
        .await
        .map_err(|e| {
            match &e {
                RasterError::NotFound(_) | RasterError::InvalidBbox(_) => {
                    tracing::debug!("Coverage {} not served: {}", coverage_id, e);
                }
                _ => tracing::error!("Failed to read coverage {}: {}", coverage_id, e),
            }
            ApiErrorResponse::from(e)
        })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, GEOTIFF_CONTENT_TYPE)],
        data,
    )
        .into_response())
}

/// Build coverage routes
pub fn coverage_routes(state: CoverageAppState) -> Router {
    Router::new()
        .route("/collections", get(list_coverages))
        .route("/collections/:coverage_id", get(get_coverage))
        .route("/collections/:coverage_id/coverage", get(get_coverage_data))
        .with_state(state)
}
