//! The three layers of render parameters: asset defaults, STAC `render`
//! metadata and the user's query string

use serde_json::{Map, Value};

use super::params::{RenderKey, RenderParameterSet};
use super::types::RenderError;

/// Default band selection when the asset does not describe its bands
pub const DEFAULT_BANDS: &str = "1";
/// Default rescale range when nothing else is known
pub const DEFAULT_RESCALE: &str = "0,255";

/// Query parameters consumed by the render endpoints themselves, never
/// forwarded to the tile URL as pass-through
const RESERVED_QUERY_KEYS: &[&str] = &[
    "url",
    "tile_format",
    "tile_scale",
    "minzoom",
    "maxzoom",
    "asset_name",
];

/// Serialize a JSON value the way render parameters travel in a query string.
///
/// Lists are comma-joined (nested lists are flattened), numbers keep their
/// JSON text form.
pub fn param_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(param_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Lowest-precedence layer derived from the STAC asset itself.
///
/// Starts from `bands=1` and `rescale=0,255`, then takes the asset-level
/// `nodata` and a band count from the asset when it describes them. Per-band
/// `nodata` values are not used.
pub fn asset_defaults(asset: &Map<String, Value>) -> RenderParameterSet {
    let mut defaults = RenderParameterSet::new()
        .with(RenderKey::Bands, DEFAULT_BANDS)
        .with(RenderKey::Rescale, DEFAULT_RESCALE);

    let band_list = asset
        .get("bands")
        .or_else(|| asset.get("raster:bands"))
        .and_then(Value::as_array);

    if let Some(nodata) = asset.get("nodata").filter(|v| !v.is_null()) {
        defaults.set(RenderKey::Nodata, param_string(nodata));
    }

    if let Some(bands) = band_list
        && !bands.is_empty()
        && bands.iter().all(Value::is_object)
    {
        let indexes = (1..=bands.len())
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        defaults.set(RenderKey::Bands, indexes);
    }

    defaults
}

/// Middle layer parsed from an asset's `render` block.
///
/// Unknown keys are ignored and null values skipped, except `bands`: once a
/// `render` block names `bands` it must give a value.
pub fn stac_render_layer(render: &Map<String, Value>) -> Result<RenderParameterSet, RenderError> {
    let mut layer = RenderParameterSet::new();

    for key in RenderKey::ALL {
        match render.get(key.as_str()) {
            None => {}
            Some(Value::Null) if key == RenderKey::Bands => {
                return Err(RenderError::MissingParameter("bands"));
            }
            Some(Value::Null) => {}
            Some(value) => layer.set(key, param_string(value)),
        }
    }

    Ok(layer)
}

/// Highest-precedence layer: the request's own query parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserRenderQuery {
    /// Recognized render keys; the last occurrence of a repeated key wins
    pub params: RenderParameterSet,
    /// Every other parameter, in order of appearance
    pub passthrough: Vec<(String, String)>,
}

impl UserRenderQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut query = Self::default();

        for (name, value) in pairs {
            if let Some(key) = RenderKey::parse(name) {
                query.params.set(key, value.clone());
                continue;
            }
            if is_reserved(name) {
                continue;
            }
            query.passthrough.push((name.clone(), value.clone()));
        }

        query
    }
}

fn is_reserved(name: &str) -> bool {
    let lower = name.to_lowercase();
    RESERVED_QUERY_KEYS.contains(&lower.as_str()) || RenderKey::parse(&lower).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_param_string_forms() {
        assert_eq!(param_string(&json!([1, 2, 3])), "1,2,3");
        assert_eq!(param_string(&json!([[0, 255]])), "0,255");
        assert_eq!(param_string(&json!([0.5, 10])), "0.5,10");
        assert_eq!(param_string(&json!(-9999.0)), "-9999.0");
        assert_eq!(param_string(&json!("gamma r 2")), "gamma r 2");
        assert_eq!(param_string(&json!(true)), "true");
    }

    #[test]
    fn test_asset_defaults_without_metadata() {
        let defaults = asset_defaults(&Map::new());
        assert_eq!(defaults.get(RenderKey::Bands), Some("1"));
        assert_eq!(defaults.get(RenderKey::Rescale), Some("0,255"));
        assert!(!defaults.contains(RenderKey::Nodata));
    }

    #[test]
    fn test_asset_defaults_from_bands_and_nodata() {
        let asset = as_map(json!({
            "href": "s3://bucket/scene.tif",
            "nodata": 0,
            "bands": [{"name": "red"}, {"name": "green"}, {"name": "blue"}]
        }));

        let defaults = asset_defaults(&asset);
        assert_eq!(defaults.get(RenderKey::Bands), Some("1,2,3"));
        assert_eq!(defaults.get(RenderKey::Nodata), Some("0"));
    }

    #[test]
    fn test_asset_defaults_from_raster_bands() {
        let asset = as_map(json!({
            "raster:bands": [{"data_type": "uint16", "nodata": -1}, {"data_type": "uint16"}]
        }));

        let defaults = asset_defaults(&asset);
        assert_eq!(defaults.get(RenderKey::Bands), Some("1,2"));
        assert_eq!(defaults.get(RenderKey::Nodata), None);
    }

    #[test]
    fn test_asset_defaults_ignore_non_object_bands() {
        let asset = as_map(json!({"bands": ["red", "green"], "nodata": null}));

        let defaults = asset_defaults(&asset);
        assert_eq!(defaults.get(RenderKey::Bands), Some("1"));
        assert!(!defaults.contains(RenderKey::Nodata));
    }

    #[test]
    fn test_stac_layer_skips_nulls_and_unknown_keys() {
        let render = as_map(json!({
            "rescale": [[0, 100]],
            "nodata": null,
            "title": "True color",
            "colormap_name": "viridis"
        }));

        let layer = stac_render_layer(&render).unwrap();
        assert_eq!(layer.get(RenderKey::Rescale), Some("0,100"));
        assert_eq!(layer.get(RenderKey::ColormapName), Some("viridis"));
        assert!(!layer.contains(RenderKey::Nodata));
        assert_eq!(layer.len(), 2);
    }

    #[test]
    fn test_stac_layer_null_bands_is_rejected() {
        let render = as_map(json!({"bands": null, "rescale": "0,255"}));

        let err = stac_render_layer(&render).unwrap_err();
        assert!(matches!(err, RenderError::MissingParameter("bands")));
        assert_eq!(err.to_string(), "Missing required parameter: bands");
    }

    #[test]
    fn test_user_query_last_value_wins() {
        let query = UserRenderQuery::from_pairs(&pairs(&[
            ("rescale", "0,10"),
            ("rescale", "0,20"),
        ]));
        assert_eq!(query.params.get(RenderKey::Rescale), Some("0,20"));
    }

    #[test]
    fn test_user_query_passthrough_preserves_order() {
        let query = UserRenderQuery::from_pairs(&pairs(&[
            ("url", "s3://bucket/a.tif"),
            ("resampling", "bilinear"),
            ("bands", "1"),
            ("TILE_FORMAT", "png"),
            ("algorithm", "hillshade"),
            ("Rescale", "0,1"),
            ("resampling", "nearest"),
        ]));

        assert_eq!(
            query.passthrough,
            pairs(&[
                ("resampling", "bilinear"),
                ("algorithm", "hillshade"),
                ("resampling", "nearest"),
            ])
        );
        assert_eq!(query.params.get(RenderKey::Bands), Some("1"));
        assert!(!query.params.contains(RenderKey::Rescale));
    }
}
