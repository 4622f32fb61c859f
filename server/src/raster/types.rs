//! Raster metadata types and error definitions

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Text that upstream fetch errors carry when the source does not exist
pub const NOT_FOUND_SIGNATURE: &str = "HTTP response code: 404";

/// Errors that can occur when reading raster sources
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Source not found: {0}")]
    NotFound(String),

    #[error("Invalid source path: {0}")]
    InvalidPath(String),

    #[error("Remote sources are disabled: {0}")]
    RemoteDisabled(String),

    #[error("Failed to fetch {url}: HTTP response code: {status}")]
    Fetch { url: String, status: u16 },

    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("{path} is larger than {limit} bytes")]
    TooLarge { path: String, limit: usize },

    #[error("Failed to decode raster {0}")]
    Decode(String),

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Invalid bbox: {0}")]
    InvalidBbox(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors from a metadata load shared between concurrent cache waiters
impl From<Arc<RasterError>> for RasterError {
    fn from(shared: Arc<RasterError>) -> Self {
        let shared = match Arc::try_unwrap(shared) {
            Ok(err) => return err,
            Err(shared) => shared,
        };
        match shared.as_ref() {
            RasterError::NotFound(p) => RasterError::NotFound(p.clone()),
            RasterError::InvalidPath(p) => RasterError::InvalidPath(p.clone()),
            RasterError::RemoteDisabled(p) => RasterError::RemoteDisabled(p.clone()),
            RasterError::Fetch { url, status } => RasterError::Fetch {
                url: url.clone(),
                status: *status,
            },
            RasterError::Request { url, reason } => RasterError::Request {
                url: url.clone(),
                reason: reason.clone(),
            },
            RasterError::TooLarge { path, limit } => RasterError::TooLarge {
                path: path.clone(),
                limit: *limit,
            },
            RasterError::Decode(msg) => RasterError::Decode(msg.clone()),
            RasterError::UnsupportedCrs(msg) => RasterError::UnsupportedCrs(msg.clone()),
            RasterError::InvalidBbox(msg) => RasterError::InvalidBbox(msg.clone()),
            RasterError::IoError(e) => {
                RasterError::IoError(std::io::Error::new(e.kind(), e.to_string()))
            }
        }
    }
}

/// Axis-aligned bounding box in the raster's own CRS
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl Bounds {
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        Self {
            minx,
            miny,
            maxx,
            maxy,
        }
    }

    /// Parse `minx,miny,maxx,maxy`
    pub fn parse(value: &str) -> Result<Self, RasterError> {
        let coords = value
            .split(',')
            .map(|c| c.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| RasterError::InvalidBbox(format!("'{}' is not a list of numbers", value)))?;

        let &[minx, miny, maxx, maxy] = coords.as_slice() else {
            return Err(RasterError::InvalidBbox(format!(
                "expected 4 values (minx,miny,maxx,maxy), got {}",
                coords.len()
            )));
        };

        if minx >= maxx || miny >= maxy {
            return Err(RasterError::InvalidBbox(format!(
                "minimum must be lower than maximum in '{}'",
                value
            )));
        }

        Ok(Self::new(minx, miny, maxx, maxy))
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.minx < other.maxx
            && other.minx < self.maxx
            && self.miny < other.maxy
            && other.miny < self.maxy
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.minx, self.miny, self.maxx, self.maxy]
    }
}

/// Per-band description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandInfo {
    /// Band name (`b1`, `b2`, ...)
    pub name: String,
    /// Sample data type (`uint8`, `int16`, `float32`, ...)
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodata: Option<f64>,
}

/// Georeferenced raster metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterInfo {
    /// Dataset name (file name of the source)
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Bounds in the native CRS
    pub bounds: Bounds,
    /// EPSG code of the native CRS, if declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epsg: Option<u16>,
    /// Affine transform `[a, b, c, d, e, f]` mapping pixel to CRS coordinates
    pub transform: [f64; 6],
    pub bands: Vec<BandInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodata: Option<f64>,
}

impl RasterInfo {
    /// CRS as `EPSG:<code>`, falling back to WGS84 when undeclared
    pub fn crs_string(&self) -> String {
        format!("EPSG:{}", self.epsg.unwrap_or(4326))
    }

    pub fn band_names(&self) -> Vec<String> {
        self.bands.iter().map(|b| b.name.clone()).collect()
    }

    /// Pixel size along x in CRS units
    pub fn resolution(&self) -> f64 {
        self.transform[0].abs()
    }
}
