//! OGC Coverage response models

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::raster::RasterInfo;

/// Identifier of the single coverage advertised by the listing
pub const DEFAULT_COVERAGE_ID: &str = "default";

/// Media type of coverage data responses
pub const GEOTIFF_CONTENT_TYPE: &str = "image/tiff; application=geotiff";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

impl Link {
    pub fn new(href: impl Into<String>, rel: &str, media_type: &str) -> Self {
        Self {
            href: href.into(),
            rel: rel.to_string(),
            media_type: media_type.to_string(),
        }
    }
}

/// Metadata of one coverage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetadata {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bands: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spatial_resolution: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal_resolution: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl CoverageMetadata {
    /// Listing entry with only an id, a title and links
    pub fn summary(id: &str, title: &str, base_url: &str) -> Self {
        Self {
            id: id.to_string(),
            title: Some(title.to_string()),
            description: None,
            extent: None,
            crs: None,
            bands: None,
            spatial_resolution: None,
            temporal_resolution: None,
            links: coverage_links(base_url, id),
        }
    }

    /// Full metadata of a dataset
    pub fn from_raster(id: &str, info: &RasterInfo, base_url: &str) -> Self {
        let crs = info.crs_string();
        Self {
            id: id.to_string(),
            title: Some(info.name.clone()),
            description: None,
            extent: Some(json!({
                "spatial": {
                    "bbox": [info.bounds.to_array()],
                    "crs": crs,
                }
            })),
            crs: Some(crs),
            bands: Some(info.band_names()),
            spatial_resolution: Some(info.resolution()),
            temporal_resolution: None,
            links: coverage_links(base_url, id),
        }
    }
}

/// Response of the coverage listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageList {
    #[serde(default)]
    pub coverages: Vec<CoverageMetadata>,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// `self` and `coverage` links of a coverage; `base_url` ends with `/`
fn coverage_links(base_url: &str, id: &str) -> Vec<Link> {
    vec![
        Link::new(
            format!("{}collections/{}", base_url, id),
            "self",
            "application/json",
        ),
        Link::new(
            format!("{}collections/{}/coverage", base_url, id),
            "coverage",
            "image/tiff",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{BandInfo, Bounds};

    #[test]
    fn test_summary_omits_unknown_fields() {
        let meta = CoverageMetadata::summary("default", "Default Coverage", "http://localhost/");
        let value = serde_json::to_value(&meta).unwrap();

        assert!(value.get("extent").is_none());
        assert!(value.get("crs").is_none());
        assert_eq!(value["links"][0]["href"], "http://localhost/collections/default");
        assert_eq!(value["links"][1]["rel"], "coverage");
        assert_eq!(value["links"][1]["type"], "image/tiff");
    }

    #[test]
    fn test_from_raster() {
        let info = RasterInfo {
            name: "dem.tif".to_string(),
            width: 100,
            height: 100,
            bounds: Bounds::new(500000.0, 4000000.0, 510000.0, 4010000.0),
            epsg: Some(32633),
            transform: [100.0, 0.0, 500000.0, 0.0, -100.0, 4010000.0],
            bands: vec![BandInfo {
                name: "b1".to_string(),
                data_type: "float32".to_string(),
                nodata: None,
            }],
            nodata: None,
        };

        let meta = CoverageMetadata::from_raster("dem", &info, "https://api.example.com/");
        assert_eq!(meta.title.as_deref(), Some("dem.tif"));
        assert_eq!(meta.crs.as_deref(), Some("EPSG:32633"));
        assert_eq!(meta.bands, Some(vec!["b1".to_string()]));
        assert_eq!(meta.spatial_resolution, Some(100.0));

        let extent = meta.extent.unwrap();
        assert_eq!(extent["spatial"]["crs"], "EPSG:32633");
        assert_eq!(
            extent["spatial"]["bbox"][0],
            json!([500000.0, 4000000.0, 510000.0, 4010000.0])
        );
    }
}
