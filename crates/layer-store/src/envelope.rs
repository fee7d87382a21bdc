//! The `_version` / `_type` envelope shared by every persisted layer.

use serde_json::{Map, Value};

use crate::error::{ErrorCode, FieldError, PersistenceWarning};

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: u64 = 1;

/// Oldest version that can still be migrated forward.
pub const MIN_SUPPORTED_VERSION: u64 = 1;

pub const VERSION_KEY: &str = "_version";
pub const TYPE_KEY: &str = "_type";

/// Discriminators, one per layer kind.
pub mod kinds {
    pub const WMS: &str = "wms-raster";
    pub const WMTS: &str = "wmts-raster";
    pub const ESRI: &str = "esri-raster";
    pub const XYZ: &str = "xyz-raster";
    pub const PMTILES: &str = "pmtiles";

    pub const ALL: [&str; 5] = [WMS, WMTS, ESRI, XYZ, PMTILES];
}

/// A fresh envelope at the current version.
pub fn new_envelope(kind: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(VERSION_KEY.to_string(), Value::from(CURRENT_SCHEMA_VERSION));
    map.insert(TYPE_KEY.to_string(), Value::from(kind));
    map
}

/// The record must be a JSON object.
pub fn as_object(value: &Value) -> Result<&Map<String, Value>, FieldError> {
    value.as_object().ok_or_else(|| {
        FieldError::new(
            "",
            "persisted layer must be a JSON object",
            ErrorCode::InvalidEnvelope,
        )
    })
}

/// Read `_version`, an integer >= 1.
pub fn read_version(map: &Map<String, Value>) -> Result<u64, FieldError> {
    match map.get(VERSION_KEY) {
        None => Err(FieldError::new(
            VERSION_KEY,
            "schema version is missing",
            ErrorCode::InvalidVersion,
        )),
        Some(value) => value.as_u64().filter(|v| *v >= 1).ok_or_else(|| {
            FieldError::new(
                VERSION_KEY,
                format!("schema version must be an integer >= 1, got {}", value),
                ErrorCode::InvalidVersion,
            )
        }),
    }
}

/// Version gate: too old fails, newer than `current` only warns.
pub fn check_version(
    version: u64,
    min_supported: u64,
    current: u64,
) -> Result<Option<PersistenceWarning>, FieldError> {
    if version < min_supported {
        return Err(FieldError::new(
            VERSION_KEY,
            format!(
                "schema version {} is older than the oldest supported version {}",
                version, min_supported
            ),
            ErrorCode::VersionTooOld,
        ));
    }
    if version > current {
        return Ok(Some(PersistenceWarning::NewerVersion {
            found: version,
            current,
        }));
    }
    Ok(None)
}

/// Read `_type` without checking it against anything.
pub fn read_type(map: &Map<String, Value>) -> Result<&str, FieldError> {
    map.get(TYPE_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| FieldError::new(TYPE_KEY, "layer type is missing", ErrorCode::InvalidType))
}

/// Type gate: `_type` must be exactly `expected`.
pub fn check_type(map: &Map<String, Value>, expected: &str) -> Result<(), FieldError> {
    let found = read_type(map)?;
    if found != expected {
        return Err(FieldError::new(
            TYPE_KEY,
            format!("expected layer type '{}', found '{}'", expected, found),
            ErrorCode::InvalidType,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_version_must_be_positive_integer() {
        for bad in [json!({}), json!({"_version": 0}), json!({"_version": "1"}), json!({"_version": 1.5})] {
            let err = read_version(bad.as_object().unwrap()).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidVersion);
        }
        assert_eq!(read_version(json!({"_version": 3}).as_object().unwrap()).unwrap(), 3);
    }

    #[test]
    fn test_version_gate() {
        assert_eq!(check_version(1, 1, 1).unwrap(), None);
        assert_eq!(
            check_version(4, 1, 2).unwrap(),
            Some(PersistenceWarning::NewerVersion { found: 4, current: 2 })
        );
        assert_eq!(check_version(1, 2, 3).unwrap_err().code, ErrorCode::VersionTooOld);
    }

    #[test]
    fn test_type_gate() {
        let map = new_envelope(kinds::XYZ);
        assert!(check_type(&map, kinds::XYZ).is_ok());
        assert_eq!(check_type(&map, kinds::WMS).unwrap_err().code, ErrorCode::InvalidType);
        assert_eq!(as_object(&json!([1])).unwrap_err().code, ErrorCode::InvalidEnvelope);
    }
}
