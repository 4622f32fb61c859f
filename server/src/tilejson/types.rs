//! TileJSON 2.2.0 document model
//!
//! See <https://github.com/mapbox/tilejson-spec/tree/master/2.2.0>

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::{RenderKey, RenderParameterSet};

/// Highest zoom level a TileJSON document may declare
pub const MAX_ZOOM_LIMIT: u8 = 30;

/// Bounds used when the source has none of its own
pub const WORLD_BOUNDS: [f64; 4] = [-180.0, -90.0, 180.0, 90.0];

#[derive(Debug, Error, PartialEq)]
pub enum TileJsonError {
    #[error("Invalid {name}: {value} (must be between 0 and 30)")]
    ZoomOutOfRange { name: &'static str, value: i64 },

    #[error("Invalid zoom range: minzoom {minzoom} is greater than maxzoom {maxzoom}")]
    InvertedZoomRange { minzoom: u8, maxzoom: u8 },

    #[error("Invalid bounds: expected 4 or 6 values, got {0}")]
    InvalidBounds(usize),
}

/// Tile addressing scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileScheme {
    #[default]
    Xyz,
    Tms,
}

/// Render parameters embedded in a TileJSON document for client introspection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bands: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_formula: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rescale: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodata: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colormap_name: Option<String>,
}

impl RenderParams {
    /// Typed view of a merged parameter set.
    ///
    /// Values that do not parse into their typed form are left out; returns
    /// `None` when nothing remains.
    pub fn from_set(set: &RenderParameterSet) -> Option<Self> {
        let params = Self {
            bands: set.get(RenderKey::Bands).and_then(parse_list::<u32>),
            color_formula: set.get(RenderKey::ColorFormula).map(str::to_string),
            range: set.get(RenderKey::Range).and_then(parse_list::<f64>),
            rescale: set.get(RenderKey::Rescale).and_then(parse_list::<f64>),
            nodata: set
                .get(RenderKey::Nodata)
                .and_then(|v| v.trim().parse::<f64>().ok()),
            colormap_name: set.get(RenderKey::ColormapName).map(str::to_string),
        };

        if params == Self::default() {
            None
        } else {
            Some(params)
        }
    }
}

fn parse_list<T: std::str::FromStr>(value: &str) -> Option<Vec<T>> {
    value
        .split(',')
        .map(|item| item.trim().parse::<T>().ok())
        .collect()
}

/// TileJSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileJson {
    pub tilejson: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<String>,
    pub scheme: TileScheme,
    pub tiles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<String>>,
    pub minzoom: u8,
    pub maxzoom: u8,
    pub bounds: [f64; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<(f64, f64, u8)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderParams>,
}

impl TileJson {
    /// A document for a single tile URL template with default metadata
    pub fn new(tile_url: impl Into<String>) -> Self {
        Self {
            tilejson: "2.2.0".to_string(),
            name: None,
            description: None,
            version: "1.0.0".to_string(),
            attribution: None,
            template: None,
            legend: None,
            scheme: TileScheme::Xyz,
            tiles: vec![tile_url.into()],
            grids: None,
            data: None,
            minzoom: 0,
            maxzoom: MAX_ZOOM_LIMIT,
            bounds: WORLD_BOUNDS,
            center: None,
            render: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_zoom(mut self, minzoom: i64, maxzoom: i64) -> Result<Self, TileJsonError> {
        let minzoom = check_zoom("minzoom", minzoom)?;
        let maxzoom = check_zoom("maxzoom", maxzoom)?;
        if minzoom > maxzoom {
            return Err(TileJsonError::InvertedZoomRange { minzoom, maxzoom });
        }
        self.minzoom = minzoom;
        self.maxzoom = maxzoom;
        Ok(self)
    }

    /// Set bounds from a 2D (`[minx, miny, maxx, maxy]`) or 3D
    /// (`[minx, miny, minz, maxx, maxy, maxz]`) bounding box
    pub fn with_bbox(mut self, bbox: &[f64]) -> Result<Self, TileJsonError> {
        self.bounds = match *bbox {
            [minx, miny, maxx, maxy] => [minx, miny, maxx, maxy],
            [minx, miny, _, maxx, maxy, _] => [minx, miny, maxx, maxy],
            _ => return Err(TileJsonError::InvalidBounds(bbox.len())),
        };
        Ok(self)
    }

    pub fn with_center(mut self, center: (f64, f64, u8)) -> Self {
        self.center = Some(center);
        self
    }

    pub fn with_render(mut self, render: Option<RenderParams>) -> Self {
        self.render = render;
        self
    }

    /// Fill in the center from bounds and minzoom if it was not set
    pub fn finish(mut self) -> Self {
        if self.center.is_none() {
            let b = self.bounds;
            self.center = Some(((b[0] + b[2]) / 2.0, (b[1] + b[3]) / 2.0, self.minzoom));
        }
        self
    }
}

fn check_zoom(name: &'static str, value: i64) -> Result<u8, TileJsonError> {
    if (0..=MAX_ZOOM_LIMIT as i64).contains(&value) {
        Ok(value as u8)
    } else {
        Err(TileJsonError::ZoomOutOfRange { name, value })
    }
}

/// Output image type of the tile endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Png,
    Npy,
    Tif,
    Jpeg,
    Jpg,
    Jp2,
    Webp,
    Pngraw,
}

impl ImageType {
    pub fn parse(value: &str) -> Option<Self> {
        let kind = match value {
            "png" => ImageType::Png,
            "npy" => ImageType::Npy,
            "tif" => ImageType::Tif,
            "jpeg" => ImageType::Jpeg,
            "jpg" => ImageType::Jpg,
            "jp2" => ImageType::Jp2,
            "webp" => ImageType::Webp,
            "pngraw" => ImageType::Pngraw,
            _ => return None,
        };
        Some(kind)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageType::Png => "png",
            ImageType::Npy => "npy",
            ImageType::Tif => "tif",
            ImageType::Jpeg => "jpeg",
            ImageType::Jpg => "jpg",
            ImageType::Jp2 => "jp2",
            ImageType::Webp => "webp",
            ImageType::Pngraw => "pngraw",
        }
    }
}

/// Builds the path part of an XYZ tile URL template
#[derive(Debug, Clone)]
pub struct TilePath {
    prefix: String,
    format: Option<ImageType>,
    scale: u8,
}

impl TilePath {
    /// `prefix` is everything before `/{z}/{x}/{y}`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            format: None,
            scale: 1,
        }
    }

    pub fn with_format(mut self, format: Option<ImageType>) -> Self {
        self.format = format;
        self
    }

    pub fn with_scale(mut self, scale: u8) -> Self {
        self.scale = scale;
        self
    }

    pub fn build(&self) -> String {
        let mut path = format!("{}/{{z}}/{{x}}/{{y}}", self.prefix.trim_end_matches('/'));
        if let Some(format) = self.format {
            path.push('.');
            path.push_str(format.extension());
        }
        if self.scale > 1 {
            path.push_str(&format!("@{}x", self.scale));
        }
        path
    }
}
