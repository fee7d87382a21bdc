//! Typed access to the flat fields of a persisted record.
//!
//! Required fields fail with a [`FieldError`]. Optional fields are returned
//! only when present with the right JSON type and are silently dropped
//! otherwise; a present value of the right type that breaks a range rule
//! still fails.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tile_common::tile::MAX_ZOOM;
use tile_protocol::LayerCommon;

use crate::error::{ErrorCode, FieldError};

/// Read side.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
    prefix: &'a str,
}

impl<'a> Fields<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map, prefix: "" }
    }

    /// Fields of a nested object; error paths are prefixed with `prefix`.
    pub fn nested(map: &'a Map<String, Value>, prefix: &'a str) -> Self {
        Self { map, prefix }
    }

    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.prefix, key)
        }
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    pub fn required_str(&self, key: &str) -> Result<String, FieldError> {
        match self.get(key) {
            None => Err(FieldError::missing(&self.path(key))),
            Some(Value::String(s)) if s.trim().is_empty() => {
                Err(FieldError::missing(&self.path(key)))
            }
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(FieldError::new(
                self.path(key),
                format!("expected a string, got {}", other),
                ErrorCode::InvalidString,
            )),
        }
    }

    /// A required `http://` or `https://` URL.
    pub fn required_url(&self, key: &str) -> Result<String, FieldError> {
        let url = self.required_str(key)?;
        let lower = url.trim_start().to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(FieldError::new(
                self.path(key),
                format!("'{}' is not an http(s) URL", url),
                ErrorCode::InvalidUrl,
            ));
        }
        Ok(url)
    }

    /// One of a closed set of string values.
    pub fn required_enum(&self, key: &str, allowed: &[&str]) -> Result<String, FieldError> {
        let value = self.required_str(key)?;
        if !allowed.contains(&value.as_str()) {
            return Err(FieldError::new(
                self.path(key),
                format!("'{}' is not one of {}", value, allowed.join(", ")),
                ErrorCode::InvalidEnum,
            ));
        }
        Ok(value)
    }

    pub fn optional_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Value::as_str).map(str::to_string)
    }

    pub fn optional_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn optional_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Integer in `[0, max]`; other numbers are out of range.
    pub fn optional_bounded(&self, key: &str, max: u64) -> Result<Option<u32>, FieldError> {
        let Some(value) = self.get(key).filter(|v| v.is_number()) else {
            return Ok(None);
        };
        match value.as_u64().filter(|v| *v <= max) {
            Some(v) => Ok(Some(v as u32)),
            None => Err(FieldError::new(
                self.path(key),
                format!("must be an integer within [0, {}], got {}", max, value),
                ErrorCode::OutOfRange,
            )),
        }
    }

    /// Strictly positive integer, e.g. a tile size.
    pub fn optional_positive(&self, key: &str) -> Result<Option<u32>, FieldError> {
        let Some(value) = self.get(key).filter(|v| v.is_number()) else {
            return Ok(None);
        };
        positive(value)
            .map(Some)
            .ok_or_else(|| self.not_positive(key, value))
    }

    pub fn required_positive(&self, key: &str) -> Result<u32, FieldError> {
        match self.get(key) {
            None => Err(FieldError::missing(&self.path(key))),
            Some(value) => positive(value).ok_or_else(|| self.not_positive(key, value)),
        }
    }

    pub fn required_f64(&self, key: &str) -> Result<f64, FieldError> {
        match self.get(key) {
            None => Err(FieldError::missing(&self.path(key))),
            Some(value) => value.as_f64().ok_or_else(|| {
                FieldError::new(
                    self.path(key),
                    format!("expected a number, got {}", value),
                    ErrorCode::InvalidNumber,
                )
            }),
        }
    }

    fn not_positive(&self, key: &str, value: &Value) -> FieldError {
        FieldError::new(
            self.path(key),
            format!("must be a positive integer, got {}", value),
            ErrorCode::InvalidNumber,
        )
    }

    /// A list of strings, stored as an array or as one comma-separated string.
    ///
    /// Absent yields an empty list; anything else is `INVALID_ARRAY`.
    pub fn string_list(&self, key: &str) -> Result<Vec<String>, FieldError> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::String(s)) if s.is_empty() => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(s.split(',').map(|p| p.trim().to_string()).collect()),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        FieldError::new(
                            format!("{}[{}]", self.path(key), i),
                            format!("expected a string, got {}", item),
                            ErrorCode::InvalidArray,
                        )
                    })
                })
                .collect(),
            Some(other) => Err(FieldError::new(
                self.path(key),
                format!("expected an array of strings, got {}", other),
                ErrorCode::InvalidArray,
            )),
        }
    }

    /// A non-empty [`Fields::string_list`].
    pub fn required_list(&self, key: &str) -> Result<Vec<String>, FieldError> {
        let list = self.string_list(key)?;
        if list.iter().all(|s| s.trim().is_empty()) {
            return Err(FieldError::missing(&self.path(key)));
        }
        Ok(list)
    }

    /// String-valued object; non-string entries are dropped.
    pub fn string_map(&self, key: &str) -> BTreeMap<String, String> {
        self.get(key)
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `id`, `title`, `attribution`, `opacity`, `minZoom`, `maxZoom`.
    pub fn common(&self) -> Result<LayerCommon, FieldError> {
        let id = self.required_str("id")?;

        let opacity = self.optional_f64("opacity");
        if let Some(o) = opacity {
            if !(0.0..=1.0).contains(&o) {
                return Err(FieldError::new(
                    self.path("opacity"),
                    format!("must be within [0, 1], got {}", o),
                    ErrorCode::OutOfRange,
                ));
            }
        }

        let max = u64::from(MAX_ZOOM);
        let min_zoom = self.optional_bounded("minZoom", max)?;
        let max_zoom = self.optional_bounded("maxZoom", max)?;
        if let (Some(min), Some(max)) = (min_zoom, max_zoom) {
            if min > max {
                return Err(FieldError::new(
                    self.path("minZoom"),
                    format!("minZoom ({}) is greater than maxZoom ({})", min, max),
                    ErrorCode::OutOfRange,
                ));
            }
        }

        Ok(LayerCommon {
            id,
            title: self.optional_str("title"),
            attribution: self.optional_str("attribution"),
            opacity,
            min_zoom,
            max_zoom,
        })
    }
}

fn positive(value: &Value) -> Option<u32> {
    value
        .as_u64()
        .filter(|v| *v > 0)
        .and_then(|v| u32::try_from(v).ok())
}

/// Write side. `None` and empty collections are never written.
pub struct FieldWriter<'a> {
    map: &'a mut Map<String, Value>,
}

impl<'a> FieldWriter<'a> {
    pub fn new(map: &'a mut Map<String, Value>) -> Self {
        Self { map }
    }

    pub fn put(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.map.insert(key.to_string(), value.into());
        self
    }

    pub fn opt<T: Into<Value> + Clone>(&mut self, key: &str, value: &Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.map.insert(key.to_string(), v.clone().into());
        }
        self
    }

    pub fn list(&mut self, key: &str, values: &[String]) -> &mut Self {
        if !values.is_empty() {
            self.map.insert(key.to_string(), Value::from(values.to_vec()));
        }
        self
    }

    pub fn string_map(&mut self, key: &str, values: &BTreeMap<String, String>) -> &mut Self {
        if !values.is_empty() {
            let obj: Map<String, Value> = values
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                .collect();
            self.map.insert(key.to_string(), Value::Object(obj));
        }
        self
    }

    pub fn common(&mut self, common: &LayerCommon) -> &mut Self {
        self.put("id", common.id.as_str())
            .opt("title", &common.title)
            .opt("attribution", &common.attribution)
            .opt("opacity", &common.opacity)
            .opt("minZoom", &common.min_zoom)
            .opt("maxZoom", &common.max_zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_required_string_codes() {
        let m = map(json!({"a": "x", "b": 3, "c": "  "}));
        let f = Fields::new(&m);
        assert_eq!(f.required_str("a").unwrap(), "x");
        assert_eq!(f.required_str("b").unwrap_err().code, ErrorCode::InvalidString);
        assert_eq!(f.required_str("c").unwrap_err().code, ErrorCode::MissingField);
        assert_eq!(f.required_str("d").unwrap_err().code, ErrorCode::MissingField);
    }

    #[test]
    fn test_url_scheme_checked() {
        let m = map(json!({"u": "javascript:alert(1)", "v": "HTTPS://h"}));
        let f = Fields::new(&m);
        assert_eq!(f.required_url("u").unwrap_err().code, ErrorCode::InvalidUrl);
        assert!(f.required_url("v").is_ok());
    }

    #[test]
    fn test_string_list_forms() {
        let m = map(json!({"s": "a, b", "a": ["x", "y"], "bad": [1], "n": 4}));
        let f = Fields::new(&m);
        assert_eq!(f.string_list("s").unwrap(), ["a", "b"]);
        assert_eq!(f.string_list("a").unwrap(), ["x", "y"]);
        assert!(f.string_list("missing").unwrap().is_empty());

        let err = f.string_list("bad").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArray);
        assert_eq!(err.path, "bad[0]");
        assert_eq!(f.string_list("n").unwrap_err().code, ErrorCode::InvalidArray);
    }

    #[test]
    fn test_optional_fields_dropped_when_mistyped() {
        let m = map(json!({"id": "x", "title": 5, "opacity": "half", "minZoom": "3"}));
        let common = Fields::new(&m).common().unwrap();
        assert_eq!(common, LayerCommon::new("x"));
    }

    #[test]
    fn test_ranges_enforced() {
        let cases = [
            json!({"id": "x", "opacity": 1.5}),
            json!({"id": "x", "minZoom": 25}),
            json!({"id": "x", "maxZoom": -1}),
            json!({"id": "x", "minZoom": 10, "maxZoom": 2}),
        ];
        for case in cases {
            let m = map(case);
            assert_eq!(Fields::new(&m).common().unwrap_err().code, ErrorCode::OutOfRange);
        }
    }

    #[test]
    fn test_nested_paths() {
        let m = map(json!({"tileWidth": 0}));
        let err = Fields::nested(&m, "tileMatrices[1]")
            .required_positive("tileWidth")
            .unwrap_err();
        assert_eq!(err.path, "tileMatrices[1].tileWidth");
        assert_eq!(err.code, ErrorCode::InvalidNumber);
    }

    #[test]
    fn test_writer_skips_empty_values() {
        let mut m = Map::new();
        FieldWriter::new(&mut m)
            .common(&LayerCommon::new("x"))
            .list("styles", &[])
            .string_map("extra", &BTreeMap::new());
        assert_eq!(Value::Object(m), json!({"id": "x"}));
    }
}
