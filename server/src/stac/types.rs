//! STAC item model, item-generation options and error definitions

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::query::{QueryError, QueryPairs};
use crate::raster::projection::MAX_DENSIFY_PTS;
use crate::raster::{NOT_FOUND_SIGNATURE, RasterError};

pub const STAC_VERSION: &str = "1.0.0";

pub const PROJECTION_EXTENSION: &str =
    "https://stac-extensions.github.io/projection/v1.1.0/schema.json";
pub const RASTER_EXTENSION: &str = "https://stac-extensions.github.io/raster/v1.1.0/schema.json";
pub const EO_EXTENSION: &str = "https://stac-extensions.github.io/eo/v1.1.0/schema.json";

/// Media types accepted for `asset_media_type` (`auto` is accepted as well)
pub const MEDIA_TYPES: &[&str] = &[
    "image/tiff; application=geotiff; profile=cloud-optimized",
    "application/vnd+zarr",
    "application/vnd.flatgeobuf",
    "application/geo+json",
    "application/geopackage+sqlite3",
    "image/tiff; application=geotiff",
    "application/x-hdf",
    "application/x-hdf5",
    "text/html",
    "image/jpeg",
    "image/jp2",
    "application/json",
    "application/vnd.google-earth.kml+xml",
    "application/netcdf",
    "application/x-parquet",
    "application/pdf",
    "image/png",
    "text/plain",
    "image/tiff",
    "application/xml",
];

/// Media type used for GeoTIFF sources when `auto` is requested
pub const GEOTIFF_MEDIA_TYPE: &str = "image/tiff; application=geotiff";

/// Errors that can occur while creating STAC items
#[derive(Debug, Error)]
pub enum StacError {
    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Invalid {name} parameter: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Invalid STAC item: {0}")]
    InvalidItem(String),
}

impl StacError {
    /// Whether the failure came from an upstream source answering 404
    pub fn is_upstream_not_found(&self) -> bool {
        self.to_string().contains(NOT_FOUND_SIGNATURE)
    }

    fn invalid(name: &str, reason: impl Into<String>) -> Self {
        StacError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// A link object of a STAC item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacLink {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// STAC item (GeoJSON Feature)
///
/// `assets` stays an untyped JSON mapping: render metadata and extension
/// fields are read from it by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub stac_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stac_extensions: Vec<String>,
    pub id: String,
    pub geometry: Value,
    #[serde(default)]
    pub bbox: Vec<f64>,
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub links: Vec<StacLink>,
    #[serde(default)]
    pub assets: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

/// Options controlling how an item is generated from a raster source
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOptions {
    /// Acquisition instant, written to `properties.datetime`
    pub datetime: Option<DateTime<Utc>>,
    /// Extra properties (e.g. `start_datetime` / `end_datetime`)
    pub properties: Map<String, Value>,
    /// Extension schema URLs the item implements
    pub extensions: Vec<String>,
    pub collection: Option<String>,
    pub collection_url: Option<String>,
    /// Item id; defaults to the source basename
    pub id: Option<String>,
    pub asset_name: String,
    pub asset_roles: Vec<String>,
    /// Explicit media type; `None` means detect it
    pub asset_media_type: Option<String>,
    /// Asset href; defaults to the source path
    pub asset_href: Option<String>,
    pub with_proj: bool,
    pub with_raster: bool,
    pub with_eo: bool,
    /// Upper bound on the array size used for band statistics
    pub raster_max_size: u32,
    /// Points added to each bbox edge before reprojection
    pub geom_densify_pts: u32,
    /// Decimals kept in geometry coordinates (-1 keeps them all)
    pub geom_precision: i32,
}

impl Default for ItemOptions {
    fn default() -> Self {
        Self {
            datetime: None,
            properties: Map::new(),
            extensions: Vec::new(),
            collection: None,
            collection_url: None,
            id: None,
            asset_name: "data".to_string(),
            asset_roles: Vec::new(),
            asset_media_type: None,
            asset_href: None,
            with_proj: true,
            with_raster: true,
            with_eo: true,
            raster_max_size: 1024,
            geom_densify_pts: 0,
            geom_precision: -1,
        }
    }
}

impl ItemOptions {
    pub fn with_asset_name(mut self, asset_name: impl Into<String>) -> Self {
        self.asset_name = asset_name.into();
        self
    }
}

/// Parsed query of `GET /stac`
#[derive(Debug, Clone, PartialEq)]
pub struct StacItemQuery {
    pub src_path: String,
    pub options: ItemOptions,
}

impl StacItemQuery {
    pub fn from_pairs(query: &QueryPairs) -> Result<Self, StacError> {
        let src_path = query.required("url")?.to_string();
        let mut options = ItemOptions::default();

        if let Some(value) = query.last("datetime").filter(|v| !v.is_empty()) {
            match value.split_once('/') {
                Some((start, end)) => {
                    if let Some(start) = parse_open_datetime(start)? {
                        options
                            .properties
                            .insert("start_datetime".to_string(), Value::String(format_datetime(&start)));
                    }
                    if let Some(end) = parse_open_datetime(end)? {
                        options
                            .properties
                            .insert("end_datetime".to_string(), Value::String(format_datetime(&end)));
                    }
                }
                None => options.datetime = Some(parse_datetime(value)?),
            }
        }

        options.extensions = query.all("extensions").into_iter().map(String::from).collect();
        options.collection = query.last("collection").map(String::from);
        options.collection_url = query.last("collection_url").map(String::from);
        options.id = query.last("id").map(String::from);
        if let Some(name) = query.last("asset_name") {
            options.asset_name = name.to_string();
        }
        options.asset_roles = query.all("asset_roles").into_iter().map(String::from).collect();
        options.asset_href = query.last("asset_href").map(String::from);

        if let Some(media_type) = query.last("asset_media_type") {
            if media_type != "auto" && !MEDIA_TYPES.contains(&media_type) {
                return Err(StacError::invalid(
                    "asset_media_type",
                    format!("'{}' is not a known media type", media_type),
                ));
            }
            options.asset_media_type = (media_type != "auto").then(|| media_type.to_string());
        }

        options.with_proj = query.flag("with_proj", true)?;
        options.with_raster = query.flag("with_raster", true)?;
        options.with_eo = query.flag("with_eo", true)?;

        if let Some(max_size) = query.parse::<i64>("max_size")? {
            if max_size <= 0 {
                return Err(StacError::invalid("max_size", "must be greater than 0"));
            }
            options.raster_max_size = u32::try_from(max_size)
                .map_err(|_| StacError::invalid("max_size", "value is too large"))?;
        }
        if let Some(densify) = query.parse::<i64>("geometry_densify")? {
            let densify = u32::try_from(densify)
                .map_err(|_| StacError::invalid("geometry_densify", "must be 0 or greater"))?;
            if densify > MAX_DENSIFY_PTS {
                return Err(StacError::invalid(
                    "geometry_densify",
                    format!("must be {} or less", MAX_DENSIFY_PTS),
                ));
            }
            options.geom_densify_pts = densify;
        }
        if let Some(precision) = query.parse::<i32>("geometry_precision")? {
            if precision < -1 {
                return Err(StacError::invalid(
                    "geometry_precision",
                    "must be -1 or greater",
                ));
            }
            options.geom_precision = precision;
        }

        Ok(Self { src_path, options })
    }
}

/// Parse a date or date-time; values without an offset are taken as UTC
pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>, StacError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        && let Some(dt) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(dt.and_utc());
    }

    Err(StacError::invalid(
        "datetime",
        format!("'{}' is not a valid date or date-time", value),
    ))
}

/// Interval bound; `..` or an empty string leaves the bound open
fn parse_open_datetime(value: &str) -> Result<Option<DateTime<Utc>>, StacError> {
    match value.trim() {
        "" | ".." => Ok(None),
        v => parse_datetime(v).map(Some),
    }
}

pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(items: &[(&str, &str)]) -> QueryPairs {
        QueryPairs::new(
            items
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_parse_datetime_variants() {
        assert_eq!(
            format_datetime(&parse_datetime("2020-01-01").unwrap()),
            "2020-01-01T00:00:00Z"
        );
        assert_eq!(
            format_datetime(&parse_datetime("2020-01-01T01:01:01").unwrap()),
            "2020-01-01T01:01:01Z"
        );
        assert_eq!(
            format_datetime(&parse_datetime("2020-01-01T01:01:01+02:00").unwrap()),
            "2019-12-31T23:01:01Z"
        );
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn test_defaults() {
        let q = StacItemQuery::from_pairs(&query(&[("url", "a.tif")])).unwrap();
        assert_eq!(q.src_path, "a.tif");
        assert_eq!(q.options, ItemOptions::default());
        assert_eq!(q.options.asset_name, "data");
    }

    #[test]
    fn test_missing_url() {
        let err = StacItemQuery::from_pairs(&query(&[])).unwrap_err();
        assert!(matches!(err, StacError::Query(QueryError::Missing(_))));
    }

    #[test]
    fn test_single_datetime() {
        let q = StacItemQuery::from_pairs(&query(&[("url", "a.tif"), ("datetime", "2021-06-01")]))
            .unwrap();
        assert!(q.options.datetime.is_some());
        assert!(q.options.properties.is_empty());
    }

    #[test]
    fn test_datetime_interval() {
        let q = StacItemQuery::from_pairs(&query(&[
            ("url", "a.tif"),
            ("datetime", "2021-01-01/2021-12-31T12:00:00Z"),
        ]))
        .unwrap();

        assert!(q.options.datetime.is_none());
        assert_eq!(
            q.options.properties.get("start_datetime"),
            Some(&Value::String("2021-01-01T00:00:00Z".to_string()))
        );
        assert_eq!(
            q.options.properties.get("end_datetime"),
            Some(&Value::String("2021-12-31T12:00:00Z".to_string()))
        );
    }

    #[test]
    fn test_repeated_params() {
        let q = StacItemQuery::from_pairs(&query(&[
            ("url", "a.tif"),
            ("extensions", "https://example.com/ext1.json"),
            ("extensions", "https://example.com/ext2.json"),
            ("asset_roles", "data"),
            ("asset_roles", "visual"),
        ]))
        .unwrap();

        assert_eq!(q.options.extensions.len(), 2);
        assert_eq!(q.options.asset_roles, vec!["data", "visual"]);
    }

    #[test]
    fn test_media_type() {
        let q = StacItemQuery::from_pairs(&query(&[
            ("url", "a.tif"),
            ("asset_media_type", "image/png"),
        ]))
        .unwrap();
        assert_eq!(q.options.asset_media_type.as_deref(), Some("image/png"));

        let q = StacItemQuery::from_pairs(&query(&[("url", "a.tif"), ("asset_media_type", "auto")]))
            .unwrap();
        assert_eq!(q.options.asset_media_type, None);

        assert!(
            StacItemQuery::from_pairs(&query(&[
                ("url", "a.tif"),
                ("asset_media_type", "image/bmp")
            ]))
            .is_err()
        );
    }

    #[test]
    fn test_numeric_bounds() {
        for (name, value) in [
            ("max_size", "0"),
            ("geometry_densify", "-1"),
            ("geometry_densify", "10001"),
            ("geometry_densify", "4294967295"),
            ("geometry_precision", "-2"),
            ("max_size", "big"),
        ] {
            let result = StacItemQuery::from_pairs(&query(&[("url", "a.tif"), (name, value)]));
            assert!(result.is_err(), "{}={} should be rejected", name, value);
        }

        let q = StacItemQuery::from_pairs(&query(&[
            ("url", "a.tif"),
            ("geometry_densify", "21"),
            ("geometry_precision", "6"),
            ("with_eo", "false"),
        ]))
        .unwrap();
        assert_eq!(q.options.geom_densify_pts, 21);
        assert_eq!(q.options.geom_precision, 6);
        assert!(!q.options.with_eo);
    }

    #[test]
    fn test_upstream_not_found_detection() {
        let err = StacError::from(RasterError::Fetch {
            url: "https://example.com/a.tif".to_string(),
            status: 404,
        });
        assert!(err.is_upstream_not_found());

        let err = StacError::from(RasterError::Fetch {
            url: "https://example.com/a.tif".to_string(),
            status: 503,
        });
        assert!(!err.is_upstream_not_found());
    }
}
