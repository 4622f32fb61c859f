//! JSON error responses shared by all routes

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::query::QueryError;
use crate::raster::RasterError;
use crate::render::RenderError;
use crate::stac::StacError;
use crate::tilejson::TileJsonError;

/// Error response body: a human readable message plus a machine readable code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiErrorResponse {
    pub fn new(code: &str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "validation_error" | "upstream_not_found" => StatusCode::BAD_REQUEST,
            "not_found" => StatusCode::NOT_FOUND,
            "remote_disabled" => StatusCode::FORBIDDEN,
            "payload_too_large" => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RenderError> for ApiErrorResponse {
    fn from(e: RenderError) -> Self {
        let code = match &e {
            RenderError::MissingParameter(_) | RenderError::InvalidParameter { .. } => {
                "validation_error"
            }
            RenderError::AssetNotFound(_) => "not_found",
            RenderError::UpstreamNotFound(_) => "upstream_not_found",
        };
        Self::new(code, e.to_string())
    }
}

impl From<RasterError> for ApiErrorResponse {
    fn from(e: RasterError) -> Self {
        let code = match &e {
            RasterError::NotFound(_) => "not_found",
            RasterError::InvalidPath(_) | RasterError::InvalidBbox(_) => "validation_error",
            RasterError::RemoteDisabled(_) => "remote_disabled",
            RasterError::Fetch { .. } | RasterError::Request { .. } => "upstream_error",
            RasterError::TooLarge { .. } => "payload_too_large",
            RasterError::Decode(_) => "decode_error",
            RasterError::UnsupportedCrs(_) => "unsupported_crs",
            RasterError::IoError(_) => "io_error",
        };
        Self::new(code, e.to_string())
    }
}

impl From<StacError> for ApiErrorResponse {
    fn from(e: StacError) -> Self {
        match e {
            StacError::Raster(inner) => Self::from(inner),
            StacError::Query(inner) => Self::from(inner),
            StacError::InvalidParameter { .. } => Self::new("validation_error", e.to_string()),
            StacError::InvalidItem(_) => Self::new("invalid_item", e.to_string()),
        }
    }
}

impl From<QueryError> for ApiErrorResponse {
    fn from(e: QueryError) -> Self {
        Self::new("validation_error", e.to_string())
    }
}

impl From<TileJsonError> for ApiErrorResponse {
    fn from(e: TileJsonError) -> Self {
        Self::new("validation_error", e.to_string())
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}
