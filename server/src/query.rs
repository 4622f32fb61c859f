//! Ordered query parameter access
//!
//! The extension routes need repeated keys and the original order of
//! appearance, so handlers extract `Query<Vec<(String, String)>>` and read
//! it through [`QueryPairs`].

use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("Missing required query parameter: {0}")]
    Missing(String),

    #[error("Invalid value '{value}' for query parameter {name}: {reason}")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct QueryPairs {
    pairs: Vec<(String, String)>,
}

impl QueryPairs {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Last value given for `name`
    pub fn last(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value given for `name`, in order
    pub fn all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn required(&self, name: &str) -> Result<&str, QueryError> {
        self.last(name)
            .ok_or_else(|| QueryError::Missing(name.to_string()))
    }

    pub fn parse<T>(&self, name: &str) -> Result<Option<T>, QueryError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.last(name) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| QueryError::Invalid {
                    name: name.to_string(),
                    value: raw.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Boolean flag accepting `true/false`, `1/0`, `yes/no` and `on/off`
    pub fn flag(&self, name: &str, default: bool) -> Result<bool, QueryError> {
        let Some(raw) = self.last(name) else {
            return Ok(default);
        };
        match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(QueryError::Invalid {
                name: name.to_string(),
                value: raw.to_string(),
                reason: "expected a boolean".to_string(),
            }),
        }
    }
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
    fn test_last_and_all() {
        let q = query(&[("a", "1"), ("b", "2"), ("a", "3")]);
        assert_eq!(q.last("a"), Some("3"));
        assert_eq!(q.all("a"), vec!["1", "3"]);
        assert_eq!(q.last("c"), None);
    }

    #[test]
    fn test_required() {
        let q = query(&[("url", "a.tif")]);
        assert_eq!(q.required("url"), Ok("a.tif"));
        assert_eq!(
            q.required("id"),
            Err(QueryError::Missing("id".to_string()))
        );
    }

    #[test]
    fn test_parse() {
        let q = query(&[("minzoom", "4"), ("maxzoom", "high")]);
        assert_eq!(q.parse::<i64>("minzoom"), Ok(Some(4)));
        assert_eq!(q.parse::<i64>("missing"), Ok(None));
        assert!(matches!(
            q.parse::<i64>("maxzoom"),
            Err(QueryError::Invalid { .. })
        ));
    }

    #[test]
    fn test_flag() {
        let q = query(&[("with_eo", "False"), ("with_proj", "1"), ("bad", "maybe")]);
        assert_eq!(q.flag("with_eo", true), Ok(false));
        assert_eq!(q.flag("with_proj", false), Ok(true));
        assert_eq!(q.flag("with_raster", true), Ok(true));
        assert!(q.flag("bad", true).is_err());
    }
}
