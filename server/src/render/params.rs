//! Render parameter keys, sets and sources

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use super::types::RenderError;

/// The closed set of render parameters understood by the tiler
///
/// Declaration order is the order in which keys are serialized into a
/// tile URL query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderKey {
    Bands,
    ColorFormula,
    Range,
    Rescale,
    Nodata,
    ColormapName,
}

impl RenderKey {
    pub const ALL: [RenderKey; 6] = [
        RenderKey::Bands,
        RenderKey::ColorFormula,
        RenderKey::Range,
        RenderKey::Rescale,
        RenderKey::Nodata,
        RenderKey::ColormapName,
    ];

    /// Query parameter name for this key
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderKey::Bands => "bands",
            RenderKey::ColorFormula => "color_formula",
            RenderKey::Range => "range",
            RenderKey::Rescale => "rescale",
            RenderKey::Nodata => "nodata",
            RenderKey::ColormapName => "colormap_name",
        }
    }

    /// Look up a key by its exact query parameter name
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for RenderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a layer of render parameters came from, lowest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParameterSource {
    AssetDefault,
    StacMetadata,
    UserQuery,
}

/// A partial or merged mapping of render parameters in serialized string form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderParameterSet {
    values: BTreeMap<RenderKey, String>,
}

impl RenderParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: RenderKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn set(&mut self, key: RenderKey, value: impl Into<String>) {
        self.values.insert(key, value.into());
    }

    /// Builder-style variant of [`RenderParameterSet::set`]
    pub fn with(mut self, key: RenderKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn contains(&self, key: RenderKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Iterate in canonical key order
    pub fn iter(&self) -> impl Iterator<Item = (RenderKey, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Overwrite every key `layer` defines, leaving the others untouched
    pub fn overlay(&mut self, layer: &RenderParameterSet) {
        for (key, value) in layer.iter() {
            self.set(key, value);
        }
    }

    pub(crate) fn value_mut(&mut self, key: RenderKey) -> Option<&mut String> {
        self.values.get_mut(&key)
    }
}

impl FromIterator<(RenderKey, String)> for RenderParameterSet {
    fn from_iter<I: IntoIterator<Item = (RenderKey, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Colormap selection from the request
///
/// A named colormap is forwarded to the tiler as `colormap_name`; a custom
/// JSON colormap is validated but carries no name.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMap {
    pub name: Option<String>,
    pub custom: Option<Value>,
}

impl ColorMap {
    /// Build from the `colormap_name` and `colormap` query parameters.
    /// The name takes priority when both are given.
    pub fn from_query(
        colormap_name: Option<&str>,
        colormap: Option<&str>,
    ) -> Result<Option<Self>, RenderError> {
        if let Some(name) = colormap_name {
            let valid = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !valid {
                return Err(RenderError::InvalidParameter {
                    name: "colormap_name".to_string(),
                    reason: format!("unknown colormap '{}'", name),
                });
            }
            return Ok(Some(Self {
                name: Some(name.to_lowercase()),
                custom: None,
            }));
        }

        match colormap {
            Some(raw) => {
                let custom: Value =
                    serde_json::from_str(raw).map_err(|e| RenderError::InvalidParameter {
                        name: "colormap".to_string(),
                        reason: format!("could not parse colormap JSON: {}", e),
                    })?;
                if !custom.is_object() && !custom.is_array() {
                    return Err(RenderError::InvalidParameter {
                        name: "colormap".to_string(),
                        reason: "colormap must be a JSON object or array".to_string(),
                    });
                }
                Ok(Some(Self {
                    name: None,
                    custom: Some(custom),
                }))
            }
            None => Ok(None),
        }
    }
}
