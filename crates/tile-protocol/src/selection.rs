//! Choosing a matrix set, format, style and resource URL from capabilities.
//!
//! Each function is an ordered fallback chain: the first rule that matches
//! wins. They never perform I/O and are independent of each other.

use tile_common::crs::normalize_crs_identifier;
use tile_common::{CrsCode, TileMatrixSet};
use tracing::debug;

use crate::capabilities::{LayerCapability, ResourceUrlTemplate, StyleDescriptor};

/// Matrix set identifiers/CRSes tried, in order, when nothing matches the preferred CRS.
pub const WEB_MERCATOR_MATRIX_SETS: [&str; 5] = [
    "GoogleMapsCompatible",
    "EPSG:3857",
    "EPSG:900913",
    "EPSG:102113",
    "EPSG:102100",
];

/// Format preference used when the caller gives none.
pub const DEFAULT_FORMAT_PREFERENCE: [&str; 2] = ["image/png", "image/jpeg"];

/// Resource type of WMTS tile templates.
pub const TILE_RESOURCE_TYPE: &str = "tile";

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixSetPreference {
    pub crs: String,
    pub well_known_scale_set: Option<String>,
}

impl Default for MatrixSetPreference {
    fn default() -> Self {
        Self {
            crs: "EPSG:3857".to_string(),
            well_known_scale_set: None,
        }
    }
}

/// Pick a matrix set identifier among those the layer links to.
///
/// 1. preferred CRS and well-known scale set both match
/// 2. preferred CRS matches
/// 3. a Web Mercator alias, in [`WEB_MERCATOR_MATRIX_SETS`] order
/// 4. the first link
///
/// Links whose definition is missing from `sets` can only win through rule 3
/// (by identifier) or rule 4.
pub fn select_matrix_set<'a>(
    layer: &'a LayerCapability,
    sets: &'a [TileMatrixSet],
    preference: &MatrixSetPreference,
) -> Option<&'a str> {
    let linked: Vec<(&'a str, Option<&'a TileMatrixSet>)> = layer
        .tile_matrix_set_links
        .iter()
        .map(|link| {
            (
                link.as_str(),
                sets.iter().find(|s| &s.identifier == link),
            )
        })
        .collect();
    let preferred_crs = CrsCode::parse(&preference.crs);

    let chosen = preference
        .well_known_scale_set
        .as_deref()
        .and_then(|wkss| {
            let wkss = wkss.to_ascii_lowercase();
            linked.iter().find(|(_, set)| {
                set.is_some_and(|s| {
                    s.crs() == preferred_crs
                        && s.well_known_scale_set
                            .as_deref()
                            .is_some_and(|w| w.to_ascii_lowercase().contains(&wkss))
                })
            })
        })
        .or_else(|| {
            linked
                .iter()
                .find(|(_, set)| set.is_some_and(|s| s.crs() == preferred_crs))
        })
        .or_else(|| {
            WEB_MERCATOR_MATRIX_SETS.iter().find_map(|alias| {
                linked.iter().find(|(id, set)| {
                    id.eq_ignore_ascii_case(alias)
                        || set.is_some_and(|s| normalize_crs_identifier(&s.supported_crs) == *alias)
                })
            })
        })
        .or_else(|| linked.first())
        .map(|(id, _)| *id);

    debug!(layer = %layer.identifier, matrix_set = ?chosen, "Selected matrix set");
    chosen
}

/// Pick a format: each preference in order (case-insensitive, substring
/// tolerant, so `image/png` matches `image/png; mode=8bit`), else the first advertised.
pub fn select_format<'a, S: AsRef<str>>(
    layer: &'a LayerCapability,
    preferred: &[S],
) -> Option<&'a str> {
    let chosen = preferred
        .iter()
        .find_map(|pref| {
            let pref = pref.as_ref().to_ascii_lowercase();
            layer
                .formats
                .iter()
                .find(|f| f.to_ascii_lowercase().contains(&pref))
        })
        .or_else(|| layer.formats.first())
        .map(String::as_str);

    debug!(layer = %layer.identifier, format = ?chosen, "Selected format");
    chosen
}

/// Pick a style: exact identifier, else the document default, else the first.
pub fn select_style<'a>(
    layer: &'a LayerCapability,
    preferred: Option<&str>,
) -> Option<&'a StyleDescriptor> {
    preferred
        .and_then(|p| layer.styles.iter().find(|s| s.identifier == p))
        .or_else(|| layer.styles.iter().find(|s| s.is_default))
        .or_else(|| layer.styles.first())
}

/// Pick a resource URL: exact resource type (matching `format` when given),
/// else any tile template, else the first entry.
pub fn select_resource_url<'a>(
    layer: &'a LayerCapability,
    resource_type: &str,
    format: Option<&str>,
) -> Option<&'a ResourceUrlTemplate> {
    let find = |t: &str, f: Option<&str>| {
        layer.resource_urls.iter().find(|r| {
            r.resource_type.eq_ignore_ascii_case(t)
                && f.map_or(true, |f| r.format.eq_ignore_ascii_case(f))
        })
    };

    format
        .and_then(|f| find(resource_type, Some(f)))
        .or_else(|| find(resource_type, None))
        .or_else(|| format.and_then(|f| find(TILE_RESOURCE_TYPE, Some(f))))
        .or_else(|| find(TILE_RESOURCE_TYPE, None))
        .or_else(|| layer.resource_urls.first())
}
