//! Layered render parameter resolution
//!
//! Asset defaults, STAC `render` metadata and the user's query are applied
//! in that order onto one accumulator; each layer only overwrites the keys
//! it defines. The merged set is then serialized into the query string of
//! a tile URL template.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::encode::{QUERY, QUERY_KEEP_PERCENT, quote_plus};
use super::params::{ParameterSource, RenderKey, RenderParameterSet};
use super::sources::{UserRenderQuery, asset_defaults, stac_render_layer};
use super::types::RenderError;

/// Merges render parameter layers into a [`ResolvedRender`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderParameterResolver;

impl RenderParameterResolver {
    pub fn new() -> Self {
        Self
    }

    /// Merge the three layers, lowest precedence first.
    ///
    /// `stac_render` is the raw `render` block of a STAC asset, if it has one.
    pub fn resolve(
        &self,
        asset_defaults: &RenderParameterSet,
        stac_render: Option<&Map<String, Value>>,
        user: &UserRenderQuery,
    ) -> Result<ResolvedRender, RenderError> {
        let stac_layer = stac_render.map(stac_render_layer).transpose()?;
        let layers = [
            (ParameterSource::AssetDefault, Some(asset_defaults)),
            (ParameterSource::StacMetadata, stac_layer.as_ref()),
            (ParameterSource::UserQuery, Some(&user.params)),
        ];

        let mut params = RenderParameterSet::new();
        let mut sources = BTreeMap::new();
        for (source, layer) in layers {
            let Some(layer) = layer else { continue };
            for (key, _) in layer.iter() {
                sources.insert(key, source);
            }
            params.overlay(layer);
        }

        if let Some(formula) = params.value_mut(RenderKey::ColorFormula) {
            *formula = formula.to_lowercase();
        }

        Ok(ResolvedRender {
            params,
            sources,
            passthrough: user.passthrough.clone(),
        })
    }

    /// Resolve against one asset of a STAC item's `assets` mapping
    pub fn resolve_asset(
        &self,
        assets: &Map<String, Value>,
        asset_name: &str,
        user: &UserRenderQuery,
    ) -> Result<ResolvedRender, RenderError> {
        let asset = assets
            .get(asset_name)
            .and_then(Value::as_object)
            .ok_or_else(|| RenderError::AssetNotFound(asset_name.to_string()))?;

        let render = asset.get("render").and_then(Value::as_object);

        self.resolve(&asset_defaults(asset), render, user)
    }
}

/// The merged parameters of one request plus the parameters passed through
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRender {
    pub params: RenderParameterSet,
    /// Layer each merged key was taken from
    pub sources: BTreeMap<RenderKey, ParameterSource>,
    pub passthrough: Vec<(String, String)>,
}

impl ResolvedRender {
    pub fn source_of(&self, key: RenderKey) -> Option<ParameterSource> {
        self.sources.get(&key).copied()
    }

    /// Serialize to a query string: render keys first, in canonical order,
    /// then pass-through parameters in their original order.
    pub fn query_string(&self) -> String {
        let render = self.params.iter().map(|(key, value)| {
            let value = match key {
                RenderKey::ColorFormula => value.replace('/', "%2f"),
                _ => value.to_string(),
            };
            format!(
                "{}={}",
                key.as_str(),
                quote_plus(&value, QUERY_KEEP_PERCENT)
            )
        });

        let passthrough = self
            .passthrough
            .iter()
            .map(|(k, v)| format!("{}={}", quote_plus(k, QUERY), quote_plus(v, QUERY)));

        render.chain(passthrough).collect::<Vec<_>>().join("&")
    }

    /// Append the query string to `base`, omitting `?` when it is empty
    pub fn tile_url(&self, base: &str) -> String {
        self.tile_url_with(base, &[])
    }

    /// Like [`ResolvedRender::tile_url`], with `leading` parameters (such as
    /// the source `url`) placed before the render keys
    pub fn tile_url_with(&self, base: &str, leading: &[(&str, &str)]) -> String {
        let mut parts: Vec<String> = leading
            .iter()
            .map(|(k, v)| format!("{}={}", quote_plus(k, QUERY), quote_plus(v, QUERY)))
            .collect();

        let query = self.query_string();
        if !query.is_empty() {
            parts.push(query);
        }

        if parts.is_empty() {
            base.to_string()
        } else {
            format!("{}?{}", base, parts.join("&"))
        }
    }
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

    fn user(items: &[(&str, &str)]) -> UserRenderQuery {
        let pairs: Vec<(String, String)> = items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        UserRenderQuery::from_pairs(&pairs)
    }

    #[test]
    fn test_end_to_end_query_order() {
        let resolver = RenderParameterResolver::new();
        let render = as_map(json!({"bands": "1,2,3", "rescale": "0,100"}));

        let resolved = resolver
            .resolve(&RenderParameterSet::new(), Some(&render), &user(&[("rescale", "10,200")]))
            .unwrap();

        assert_eq!(resolved.query_string(), "bands=1%2C2%2C3&rescale=10%2C200");
    }

    #[test]
    fn test_user_value_always_wins() {
        let resolver = RenderParameterResolver::new();
        let defaults = RenderParameterSet::new().with(RenderKey::Nodata, "0");
        let render = as_map(json!({"nodata": -9999}));

        let resolved = resolver
            .resolve(&defaults, Some(&render), &user(&[("nodata", "nan")]))
            .unwrap();

        assert_eq!(resolved.params.get(RenderKey::Nodata), Some("nan"));
    }

    #[test]
    fn test_each_key_records_winning_layer() {
        let resolver = RenderParameterResolver::new();
        let defaults = RenderParameterSet::new()
            .with(RenderKey::Bands, "1")
            .with(RenderKey::Rescale, "0,255");
        let render = as_map(json!({"rescale": [0, 1000], "colormap_name": "viridis"}));

        let resolved = resolver
            .resolve(&defaults, Some(&render), &user(&[("colormap_name", "terrain")]))
            .unwrap();

        assert_eq!(
            resolved.source_of(RenderKey::Bands),
            Some(ParameterSource::AssetDefault)
        );
        assert_eq!(
            resolved.source_of(RenderKey::Rescale),
            Some(ParameterSource::StacMetadata)
        );
        assert_eq!(
            resolved.source_of(RenderKey::ColormapName),
            Some(ParameterSource::UserQuery)
        );
        assert_eq!(resolved.source_of(RenderKey::Nodata), None);
    }

    #[test]
    fn test_default_survives_when_metadata_is_silent() {
        let resolver = RenderParameterResolver::new();
        let defaults = RenderParameterSet::new()
            .with(RenderKey::Bands, "1")
            .with(RenderKey::Rescale, "0,255");
        let render = as_map(json!({"colormap_name": "terrain"}));

        let resolved = resolver
            .resolve(&defaults, Some(&render), &UserRenderQuery::default())
            .unwrap();

        assert_eq!(resolved.params.get(RenderKey::Bands), Some("1"));
        assert_eq!(resolved.params.get(RenderKey::Rescale), Some("0,255"));
        assert_eq!(resolved.params.get(RenderKey::ColormapName), Some("terrain"));
    }

    #[test]
    fn test_null_bands_in_metadata_fails() {
        let resolver = RenderParameterResolver::new();
        let defaults = RenderParameterSet::new()
            .with(RenderKey::Bands, "1")
            .with(RenderKey::Rescale, "0,255");
        let render = as_map(json!({"bands": null}));

        let err = resolver
            .resolve(&defaults, Some(&render), &UserRenderQuery::default())
            .unwrap_err();

        assert!(err.to_string().contains("bands"));
    }

    #[test]
    fn test_color_formula_normalized_from_any_source() {
        let resolver = RenderParameterResolver::new();
        let render = as_map(json!({"color_formula": "Gamma/R/1.5"}));

        let resolved = resolver
            .resolve(&RenderParameterSet::new(), Some(&render), &UserRenderQuery::default())
            .unwrap();

        assert_eq!(resolved.query_string(), "color_formula=gamma%2fr%2f1.5");

        let resolved = resolver
            .resolve(
                &RenderParameterSet::new(),
                None,
                &user(&[("color_formula", "Gamma R 1.5")]),
            )
            .unwrap();

        assert_eq!(resolved.query_string(), "color_formula=gamma+r+1.5");
    }

    #[test]
    fn test_passthrough_follows_render_keys() {
        let resolver = RenderParameterResolver::new();

        let resolved = resolver
            .resolve(
                &RenderParameterSet::new(),
                None,
                &user(&[
                    ("resampling", "bilinear"),
                    ("bands", "2"),
                    ("expression", "b1/b2"),
                ]),
            )
            .unwrap();

        assert_eq!(
            resolved.query_string(),
            "bands=2&resampling=bilinear&expression=b1%2Fb2"
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let resolver = RenderParameterResolver::new();
        let defaults = RenderParameterSet::new().with(RenderKey::Bands, "1");
        let render = as_map(json!({"rescale": [0, 3000], "color_formula": "sigmoidal RGB 6 0.1"}));
        let query = user(&[("nodata", "0"), ("pixel_selection", "first")]);

        let first = resolver.resolve(&defaults, Some(&render), &query).unwrap();
        let second = resolver.resolve(&defaults, Some(&render), &query).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.query_string(), second.query_string());
    }

    #[test]
    fn test_tile_url_without_query() {
        let resolved = ResolvedRender {
            params: RenderParameterSet::new(),
            sources: BTreeMap::new(),
            passthrough: Vec::new(),
        };
        assert_eq!(resolved.tile_url("/tiles/{z}/{x}/{y}"), "/tiles/{z}/{x}/{y}");
    }

    #[test]
    fn test_tile_url_with_source_first() {
        let resolved = ResolvedRender {
            params: RenderParameterSet::new().with(RenderKey::Bands, "1"),
            sources: BTreeMap::new(),
            passthrough: vec![("pixel_selection".to_string(), "first".to_string())],
        };
        assert_eq!(
            resolved.tile_url_with("/tiles/{z}/{x}/{y}", &[("url", "s3://b/k.tif")]),
            "/tiles/{z}/{x}/{y}?url=s3%3A%2F%2Fb%2Fk.tif&bands=1&pixel_selection=first"
        );
    }

    #[test]
    fn test_resolve_asset_missing() {
        let resolver = RenderParameterResolver::new();
        let assets = as_map(json!({"data": {"href": "a.tif"}}));

        let err = resolver
            .resolve_asset(&assets, "visual", &UserRenderQuery::default())
            .unwrap_err();

        assert!(matches!(err, RenderError::AssetNotFound(ref name) if name == "visual"));
        assert_eq!(err.to_string(), "Asset 'visual' not found in STAC metadata");
    }

    #[test]
    fn test_resolve_asset_uses_render_block() {
        let resolver = RenderParameterResolver::new();
        let assets = as_map(json!({
            "data": {
                "href": "a.tif",
                "bands": [{"name": "b1"}, {"name": "b2"}, {"name": "b3"}],
                "render": {"rescale": [[0, 4000]]}
            }
        }));

        let resolved = resolver
            .resolve_asset(&assets, "data", &UserRenderQuery::default())
            .unwrap();

        assert_eq!(
            resolved.query_string(),
            "bands=1%2C2%2C3&rescale=0%2C4000"
        );
    }
}
