//! WMTS tile templates, explicit or resolved from a capabilities document.
//!
//! Supports both bindings of WMTS 1.0.0: RESTful `ResourceURL` templates and
//! KVP GetTile requests.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use tile_common::tile::matrix_for_zoom;
use tile_common::{ConfigError, ConfigErrorCode, TileAddress, TileMatrix};
use tracing::{debug, info};

use crate::capabilities::Capabilities;
use crate::config::{
    CapabilitiesWmts, ExplicitWmts, LayerCommon, WmtsLayerConfig, WmtsSource, DEFAULT_TILE_SIZE,
};
use crate::selection::{
    select_format, select_matrix_set, select_resource_url, select_style, MatrixSetPreference,
    DEFAULT_FORMAT_PREFERENCE, TILE_RESOURCE_TYPE,
};
use crate::source::{BuildOptions, RasterSource, SourceHandoff, TileSource};
use crate::url::{append_query, ensure_http_url, fill_template, strip_query, QueryParams};

/// Style used when neither the caller nor the document names one.
pub const DEFAULT_STYLE: &str = "default";

/// Everything needed to fill a WMTS template for any tile.
#[derive(Debug, Clone)]
pub struct WmtsTileTemplate {
    template: String,
    matrix_set: String,
    matrices: Vec<TileMatrix>,
    style: Option<String>,
    dimensions: Vec<(String, String)>,
}

impl WmtsTileTemplate {
    pub fn new(explicit: &ExplicitWmts) -> Self {
        Self {
            template: explicit.tile_url_template.clone(),
            matrix_set: explicit.matrix_set.clone(),
            matrices: explicit.tile_matrices.clone(),
            style: explicit.style.clone(),
            dimensions: explicit
                .dimensions
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Matrix identifier for a zoom; the deepest matrix past the end of the list,
    /// the zoom itself when no matrices are known.
    fn matrix_id(&self, zoom: u32) -> Cow<'_, str> {
        match matrix_for_zoom(&self.matrices, zoom) {
            Some(matrix) => Cow::Borrowed(matrix.identifier.as_str()),
            None => Cow::Owned(zoom.to_string()),
        }
    }

    /// Fill `{TileMatrix}`, `{TileCol}`, `{TileRow}`, `{TileMatrixSet}`, `{Style}`
    /// and dimension placeholders. Names match case-insensitively.
    pub fn url_for(&self, address: TileAddress) -> String {
        fill_template(&self.template, |name| {
            if name.eq_ignore_ascii_case("TileMatrix") {
                Some(self.matrix_id(address.z))
            } else if name.eq_ignore_ascii_case("TileCol") {
                Some(Cow::Owned(address.x.to_string()))
            } else if name.eq_ignore_ascii_case("TileRow") {
                Some(Cow::Owned(address.y.to_string()))
            } else if name.eq_ignore_ascii_case("TileMatrixSet") {
                Some(Cow::Borrowed(self.matrix_set.as_str()))
            } else if name.eq_ignore_ascii_case("Style") {
                Some(Cow::Borrowed(self.style.as_deref().unwrap_or(DEFAULT_STYLE)))
            } else {
                self.dimensions
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| Cow::Borrowed(v.as_str()))
            }
        })
    }
}

/// Build a single tile URL from an explicit configuration.
pub fn tile_url(explicit: &ExplicitWmts, address: TileAddress) -> String {
    WmtsTileTemplate::new(explicit).url_for(address)
}

/// Tile size advertised by the first (lowest zoom) matrix.
pub fn tile_size(matrices: &[TileMatrix]) -> u32 {
    matrices
        .first()
        .map(|m| m.tile_width)
        .filter(|w| *w > 0)
        .unwrap_or(DEFAULT_TILE_SIZE)
}

/// Build the raster source for an explicit WMTS configuration.
pub fn create_wmts_source(
    common: &LayerCommon,
    explicit: &ExplicitWmts,
    options: &BuildOptions,
) -> Result<SourceHandoff, ConfigError> {
    common.validate()?;
    ensure_http_url("source.explicit.tile_url_template", &explicit.tile_url_template)?;
    if explicit.matrix_set.trim().is_empty() {
        return Err(ConfigError::missing("source.explicit.matrix_set"));
    }

    let template = WmtsTileTemplate::new(explicit);
    let options = options.clone();
    debug!(
        layer = %common.id,
        matrix_set = %explicit.matrix_set,
        matrices = explicit.tile_matrices.len(),
        "Built WMTS tile resolver"
    );
    let tiles = TileSource::Dynamic(Arc::new(move |address: TileAddress| {
        options.apply(template.url_for(address))
    }));

    Ok(SourceHandoff::new(
        common,
        RasterSource::from_tiles(tiles, tile_size(&explicit.tile_matrices), common),
    ))
}

/// KVP GetTile template for servers without RESTful resource URLs.
fn kvp_template(endpoint: &str, layer: &str, format: &str, dimensions: &[String]) -> String {
    let mut params = QueryParams::new();
    params
        .push("SERVICE", "WMTS")
        .push("REQUEST", "GetTile")
        .push("VERSION", "1.0.0")
        .push("LAYER", layer)
        .push_raw("STYLE", "{Style}")
        .push_raw("TILEMATRIXSET", "{TileMatrixSet}")
        .push_raw("TILEMATRIX", "{TileMatrix}")
        .push_raw("TILEROW", "{TileRow}")
        .push_raw("TILECOL", "{TileCol}")
        .push("FORMAT", format);
    for dim in dimensions {
        params.push_raw(dim, format!("{{{}}}", dim));
    }
    append_query(endpoint, &params.to_query_string())
}

/// Turn a capabilities-driven configuration into an explicit one.
pub fn resolve_wmts(
    capabilities: &Capabilities,
    common: &LayerCommon,
    cfg: &CapabilitiesWmts,
) -> Result<WmtsLayerConfig, ConfigError> {
    Ok(WmtsLayerConfig {
        common: common.clone(),
        source: WmtsSource::Explicit(resolve_explicit(capabilities, cfg)?),
    })
}

/// Runs the selection heuristics for matrix set, style and format, and picks a
/// RESTful template when the layer advertises one, a KVP template otherwise.
pub fn resolve_explicit(
    capabilities: &Capabilities,
    cfg: &CapabilitiesWmts,
) -> Result<ExplicitWmts, ConfigError> {
    let layer = capabilities.find_layer(&cfg.layer_id).ok_or_else(|| {
        ConfigError::new(
            "source.capabilities.layer_id",
            format!("layer '{}' is not advertised by the service", cfg.layer_id),
            ConfigErrorCode::LayerNotFound,
        )
    })?;

    let no_matrix_set = |message: String| {
        ConfigError::new(
            "source.capabilities.matrix_set",
            message,
            ConfigErrorCode::NoMatrixSet,
        )
    };
    let matrix_set = match cfg.matrix_set.as_deref() {
        Some(requested) => {
            let known = layer.tile_matrix_set_links.iter().any(|l| l == requested)
                || capabilities.tile_matrix_set(requested).is_some();
            if !known {
                return Err(no_matrix_set(format!(
                    "matrix set '{}' is not available for layer '{}'",
                    requested, cfg.layer_id
                )));
            }
            requested.to_string()
        }
        None => {
            let preference = MatrixSetPreference {
                crs: cfg
                    .preferred_crs
                    .clone()
                    .unwrap_or_else(|| MatrixSetPreference::default().crs),
                well_known_scale_set: cfg.preferred_well_known_scale_set.clone(),
            };
            select_matrix_set(layer, &capabilities.tile_matrix_sets, &preference)
                .ok_or_else(|| {
                    no_matrix_set(format!("layer '{}' links no tile matrix set", cfg.layer_id))
                })?
                .to_string()
        }
    };
    let tile_matrices = capabilities
        .tile_matrix_set(&matrix_set)
        .map(|s| s.tile_matrices.clone())
        .unwrap_or_default();

    let style = select_style(layer, cfg.style.as_deref())
        .map(|s| s.identifier.clone())
        .filter(|s| !s.is_empty())
        .or_else(|| cfg.style.clone())
        .unwrap_or_else(|| DEFAULT_STYLE.to_string());

    let mut preferred: Vec<&str> = cfg.format.as_deref().into_iter().collect();
    preferred.extend(DEFAULT_FORMAT_PREFERENCE);
    let format = select_format(layer, &preferred);

    let mut dimensions = BTreeMap::new();
    for dim in &layer.dimensions {
        let value = cfg
            .dimensions
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&dim.identifier))
            .map(|(_, v)| v.as_str())
            .or_else(|| dim.effective_default());
        if let Some(value) = value {
            dimensions.insert(dim.identifier.clone(), value.to_string());
        }
    }
    for (key, value) in &cfg.dimensions {
        if !dimensions.keys().any(|k| k.eq_ignore_ascii_case(key)) {
            dimensions.insert(key.clone(), value.clone());
        }
    }

    let tile_url_template = match select_resource_url(layer, TILE_RESOURCE_TYPE, format) {
        Some(resource) => resource.template.clone(),
        None => {
            let format = format.ok_or_else(|| {
                ConfigError::new(
                    "source.capabilities.format",
                    format!("layer '{}' advertises no image format", cfg.layer_id),
                    ConfigErrorCode::NoFormat,
                )
            })?;
            let endpoint = capabilities
                .get_tile_url
                .as_deref()
                .unwrap_or_else(|| strip_query(&cfg.capabilities_url));
            let dims: Vec<String> = dimensions.keys().cloned().collect();
            kvp_template(endpoint, &layer.identifier, format, &dims)
        }
    };

    info!(
        layer = %cfg.layer_id,
        matrix_set = %matrix_set,
        style = %style,
        format = ?format,
        "Resolved WMTS layer from capabilities"
    );

    Ok(ExplicitWmts {
        tile_url_template,
        matrix_set,
        tile_matrices,
        style: Some(style),
        dimensions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_common::tile::WEB_MERCATOR_Z0_SCALE;

    fn matrix(id: &str, scale: f64, size: u32) -> TileMatrix {
        TileMatrix {
            identifier: id.to_string(),
            scale_denominator: scale,
            top_left_corner: (-20037508.3427892, 20037508.3427892),
            tile_width: size,
            tile_height: size,
            matrix_width: 1,
            matrix_height: 1,
        }
    }

    fn explicit() -> ExplicitWmts {
        ExplicitWmts {
            tile_url_template:
                "https://h/wmts/{Style}/{TileMatrixSet}/{TileMatrix}/{TileRow}/{TileCol}.png"
                    .to_string(),
            matrix_set: "PM".to_string(),
            tile_matrices: vec![matrix("z0", WEB_MERCATOR_Z0_SCALE, 256)],
            style: Some("normal".to_string()),
            dimensions: BTreeMap::new(),
        }
    }

    #[test]
    fn test_minimal_explicit_source() {
        let handoff =
            create_wmts_source(&LayerCommon::new("w"), &explicit(), &BuildOptions::default())
                .unwrap();
        assert_eq!(handoff.source.tile_size, 256);
        assert_eq!(handoff.layers.len(), 1);
        assert_eq!(handoff.layers[0].layer_type, "raster");
        assert_eq!(handoff.layers[0].paint["raster-opacity"], 1.0);
    }

    #[test]
    fn test_zoom_past_matrix_list_uses_last() {
        let url = tile_url(&explicit(), TileAddress::new(3, 4, 7));
        assert_eq!(url, "https://h/wmts/normal/PM/z0/4/3.png");
    }

    #[test]
    fn test_missing_style_uses_default() {
        let cfg = ExplicitWmts {
            tile_url_template:
                "https://h/wmts/{Style}/{TileMatrixSet}/{TileMatrix}/{TileRow}/{TileCol}.png"
                    .to_string(),
            matrix_set: "GoogleMapsCompatible".to_string(),
            ..Default::default()
        };
        assert_eq!(
            tile_url(&cfg, TileAddress::new(1, 3, 2)),
            "https://h/wmts/default/GoogleMapsCompatible/2/3/1.png"
        );
    }

    #[test]
    fn test_placeholders_are_case_insensitive() {
        let mut cfg = explicit();
        cfg.tile_url_template = "https://h/{tilematrix}/{TILEROW}/{tilecol}?t={time}".to_string();
        cfg.tile_matrices.clear();
        cfg.dimensions.insert("Time".to_string(), "2024".to_string());
        assert_eq!(
            tile_url(&cfg, TileAddress::new(1, 2, 5)),
            "https://h/5/2/1?t=2024"
        );
    }

    #[test]
    fn test_tile_size_from_first_matrix() {
        assert_eq!(tile_size(&[matrix("0", 1.0, 512)]), 512);
        assert_eq!(tile_size(&[]), 256);
    }

    #[test]
    fn test_missing_matrix_set_rejected() {
        let mut cfg = explicit();
        cfg.matrix_set.clear();
        let err = create_wmts_source(&LayerCommon::new("w"), &cfg, &BuildOptions::default())
            .unwrap_err();
        assert_eq!(err.code, ConfigErrorCode::MissingField);
    }
}
