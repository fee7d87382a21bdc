//! Coordinate Reference System types and utilities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aliases that all denote spherical Web Mercator.
const WEB_MERCATOR_ALIASES: [&str; 5] = [
    "EPSG:3857",
    "EPSG:900913",
    "EPSG:102100",
    "EPSG:102113",
    "EPSG:3785",
];

/// Well-known CRS codes understood by the tile math.
///
/// Anything else is carried through verbatim as [`CrsCode::Other`] so that
/// callers can still emit it in `CRS`/`SRS` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// Web Mercator (meters)
    Epsg3857,
    /// WGS84 Geographic (degrees, lat/lon axis order in WMS 1.3.0)
    Epsg4326,
    /// OGC CRS:84 (degrees, always lon/lat)
    Crs84,
    /// Any other code, normalized to `AUTHORITY:CODE` form when possible.
    Other(String),
}

impl CrsCode {
    /// Parse a CRS string from a config or capabilities document.
    ///
    /// Parsing is total. Accepts formats like:
    /// - "EPSG:4326", "epsg:3857"
    /// - "CRS:84"
    /// - "urn:ogc:def:crs:EPSG::3857", "urn:ogc:def:crs:EPSG:6.18:3:3857"
    /// - "http://www.opengis.net/def/crs/EPSG/0/4326"
    pub fn parse(s: &str) -> Self {
        let normalized = normalize_crs_identifier(s);

        match normalized.as_str() {
            "EPSG:4326" => CrsCode::Epsg4326,
            "CRS:84" | "OGC:CRS84" => CrsCode::Crs84,
            code if WEB_MERCATOR_ALIASES.contains(&code) => CrsCode::Epsg3857,
            _ => CrsCode::Other(normalized),
        }
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326 | CrsCode::Crs84)
    }

    /// Check if this is spherical Web Mercator (any alias).
    pub fn is_web_mercator(&self) -> bool {
        matches!(self, CrsCode::Epsg3857)
    }

    /// Numeric EPSG code, used for Esri `bboxSR`/`imageSR` parameters.
    pub fn epsg_code(&self) -> Option<u32> {
        match self {
            CrsCode::Epsg3857 => Some(3857),
            CrsCode::Epsg4326 | CrsCode::Crs84 => Some(4326),
            CrsCode::Other(code) => code
                .strip_prefix("EPSG:")
                .and_then(|n| n.parse().ok()),
        }
    }

    /// Get the axis order used when serializing a BBOX for the given WMS version.
    ///
    /// Only EPSG:4326 under WMS 1.1.1 is emitted latitude-first; every other
    /// combination uses `minx,miny,maxx,maxy`.
    pub fn axis_order(&self, version: WmsVersion) -> AxisOrder {
        match (self, version) {
            (CrsCode::Epsg4326, WmsVersion::V1_1_1) => AxisOrder::LatLon,
            _ => AxisOrder::XY,
        }
    }
}

impl Default for CrsCode {
    fn default() -> Self {
        CrsCode::Epsg3857
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrsCode::Epsg3857 => write!(f, "EPSG:3857"),
            CrsCode::Epsg4326 => write!(f, "EPSG:4326"),
            CrsCode::Crs84 => write!(f, "CRS:84"),
            CrsCode::Other(code) => write!(f, "{}", code),
        }
    }
}

/// Reduce the URN/URL spellings of a CRS to `AUTHORITY:CODE`, upper-cased.
pub fn normalize_crs_identifier(s: &str) -> String {
    let trimmed = s.trim();
    let upper = trimmed.to_uppercase();

    if let Some(rest) = upper.strip_prefix("URN:OGC:DEF:CRS:") {
        // AUTHORITY:[VERSION]:CODE, the version may itself contain colons
        let mut parts = rest.split(':').filter(|p| !p.is_empty());
        let authority = parts.next().unwrap_or_default();
        let code = rest.rsplit(':').next().unwrap_or_default();
        return format!("{}:{}", authority, code);
    }

    if upper.starts_with("HTTP://WWW.OPENGIS.NET/DEF/CRS/")
        || upper.starts_with("HTTPS://WWW.OPENGIS.NET/DEF/CRS/")
    {
        let parts: Vec<&str> = upper.trim_end_matches('/').rsplit('/').collect();
        if parts.len() >= 3 {
            return format!("{}:{}", parts[2], parts[0]);
        }
    }

    upper
}

/// Supported WMS protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WmsVersion {
    #[serde(rename = "1.1.1")]
    V1_1_1,
    #[default]
    #[serde(rename = "1.3.0")]
    V1_3_0,
}

impl WmsVersion {
    /// Parse a VERSION value; anything other than 1.1.x / 1.3.x is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "1.1.1" | "1.1.0" | "1.1" => Some(WmsVersion::V1_1_1),
            "1.3.0" | "1.3" => Some(WmsVersion::V1_3_0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WmsVersion::V1_1_1 => "1.1.1",
            WmsVersion::V1_3_0 => "1.3.0",
        }
    }

    /// Name of the CRS query parameter for this version.
    pub fn crs_param(&self) -> &'static str {
        match self {
            WmsVersion::V1_1_1 => "SRS",
            WmsVersion::V1_3_0 => "CRS",
        }
    }
}

impl fmt::Display for WmsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis order for coordinate serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// X (longitude/easting), Y (latitude/northing)
    XY,
    /// Y (latitude/northing), X (longitude/easting)
    LatLon,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crs() {
        assert_eq!(CrsCode::parse("EPSG:4326"), CrsCode::Epsg4326);
        assert_eq!(CrsCode::parse("epsg:3857"), CrsCode::Epsg3857);
        assert_eq!(CrsCode::parse("EPSG:900913"), CrsCode::Epsg3857);
        assert_eq!(CrsCode::parse("CRS:84"), CrsCode::Crs84);
        assert_eq!(
            CrsCode::parse("EPSG:2154"),
            CrsCode::Other("EPSG:2154".to_string())
        );
    }

    #[test]
    fn test_parse_urn_forms() {
        assert_eq!(CrsCode::parse("urn:ogc:def:crs:EPSG::3857"), CrsCode::Epsg3857);
        assert_eq!(
            CrsCode::parse("urn:ogc:def:crs:EPSG:6.18:3:3857"),
            CrsCode::Epsg3857
        );
        assert_eq!(CrsCode::parse("urn:ogc:def:crs:OGC:1.3:CRS84"), CrsCode::Crs84);
        assert_eq!(
            CrsCode::parse("http://www.opengis.net/def/crs/EPSG/0/4326"),
            CrsCode::Epsg4326
        );
    }

    #[test]
    fn test_axis_order() {
        assert_eq!(
            CrsCode::Epsg4326.axis_order(WmsVersion::V1_1_1),
            AxisOrder::LatLon
        );
        assert_eq!(CrsCode::Epsg4326.axis_order(WmsVersion::V1_3_0), AxisOrder::XY);
        assert_eq!(CrsCode::Epsg3857.axis_order(WmsVersion::V1_1_1), AxisOrder::XY);
        assert_eq!(CrsCode::Crs84.axis_order(WmsVersion::V1_1_1), AxisOrder::XY);
    }

    #[test]
    fn test_epsg_code() {
        assert_eq!(CrsCode::Epsg3857.epsg_code(), Some(3857));
        assert_eq!(CrsCode::Crs84.epsg_code(), Some(4326));
        assert_eq!(CrsCode::parse("EPSG:2154").epsg_code(), Some(2154));
        assert_eq!(CrsCode::parse("IGNF:LAMB93").epsg_code(), None);
    }

    #[test]
    fn test_wms_version() {
        assert_eq!(WmsVersion::parse("1.1.1"), Some(WmsVersion::V1_1_1));
        assert_eq!(WmsVersion::parse("1.3.0"), Some(WmsVersion::V1_3_0));
        assert_eq!(WmsVersion::parse("2.0"), None);
        assert_eq!(WmsVersion::V1_3_0.crs_param(), "CRS");
        assert_eq!(WmsVersion::V1_1_1.crs_param(), "SRS");
    }
}
