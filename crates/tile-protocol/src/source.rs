//! Source handoff types passed to the rendering host.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tile_common::{ConfigError, ConfigErrorCode, TileAddress};

use crate::config::{LayerCommon, ServiceEndpointConfig, WmtsSource};
use crate::url::fill_template;
use crate::{esri, pmtiles, wms, wmts, xyz};

/// Per-tile URL resolver. Must not block or perform I/O.
pub type TileUrlFn = Arc<dyn Fn(TileAddress) -> String + Send + Sync>;

/// Synchronous URL rewrite applied to every tile URL (auth tokens, signing).
pub type TileUrlTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Where the host gets tile URLs from.
#[derive(Clone)]
pub enum TileSource {
    /// Templates the host fills itself (`{z}`, `{x}`, `{y}`, `{bbox-epsg-3857}`).
    Static(Vec<String>),
    /// A resolver invoked once per tile.
    Dynamic(TileUrlFn),
}

impl TileSource {
    /// Resolve the URL the host would request for `address`.
    ///
    /// Static templates are picked by `(x + y + z) mod n` and filled the way
    /// the host fills them, so both variants can be compared in tests and
    /// from the CLI.
    pub fn url_for(&self, address: TileAddress) -> Option<String> {
        match self {
            TileSource::Static(templates) => {
                if templates.is_empty() {
                    return None;
                }
                let idx = (address.x as u64 + address.y as u64 + address.z as u64)
                    % templates.len() as u64;
                Some(fill_host_template(&templates[idx as usize], address))
            }
            TileSource::Dynamic(resolve) => Some(resolve(address)),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, TileSource::Dynamic(_))
    }
}

impl fmt::Debug for TileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileSource::Static(templates) => f.debug_tuple("Static").field(templates).finish(),
            TileSource::Dynamic(_) => f.write_str("Dynamic(<fn>)"),
        }
    }
}

fn fill_host_template(template: &str, address: TileAddress) -> String {
    fill_template(template, |name| match name {
        "z" => Some(Cow::Owned(address.z.to_string())),
        "x" => Some(Cow::Owned(address.x.to_string())),
        "y" => Some(Cow::Owned(address.y.to_string())),
        "bbox-epsg-3857" => Some(Cow::Owned(
            tile_common::tile::web_mercator_tile_bbox(address)
                .to_wms_string(tile_common::AxisOrder::XY),
        )),
        _ => None,
    })
}

/// Hooks supplied by the caller when building a source.
#[derive(Clone, Default)]
pub struct BuildOptions {
    pub transform: Option<TileUrlTransform>,
}

impl BuildOptions {
    pub fn with_transform<F>(transform: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self {
            transform: Some(Arc::new(transform)),
        }
    }

    pub(crate) fn apply(&self, url: String) -> String {
        match &self.transform {
            Some(transform) => transform(&url),
            None => url,
        }
    }
}

impl fmt::Debug for BuildOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildOptions")
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// A raster source description.
#[derive(Debug, Clone)]
pub struct RasterSource {
    /// Tile templates or resolver; `None` for archive-backed sources
    pub tiles: Option<TileSource>,
    /// Archive URL (e.g. `pmtiles://...`)
    pub url: Option<String>,
    pub tile_size: u32,
    pub min_zoom: Option<u32>,
    pub max_zoom: Option<u32>,
    pub attribution: Option<String>,
    /// `[west, south, east, north]` in degrees
    pub bounds: Option<[f64; 4]>,
}

impl RasterSource {
    pub fn from_tiles(tiles: TileSource, tile_size: u32, common: &LayerCommon) -> Self {
        Self {
            tiles: Some(tiles),
            url: None,
            tile_size,
            min_zoom: common.min_zoom,
            max_zoom: common.max_zoom,
            attribution: common.attribution.clone(),
            bounds: None,
        }
    }

    /// Host-style JSON for the serializable part of the source.
    ///
    /// A dynamic resolver cannot be serialized and shows up as `"tiles": "dynamic"`.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), json!("raster"));
        match &self.tiles {
            Some(TileSource::Static(templates)) => {
                obj.insert("tiles".to_string(), json!(templates));
            }
            Some(TileSource::Dynamic(_)) => {
                obj.insert("tiles".to_string(), json!("dynamic"));
            }
            None => {}
        }
        if let Some(url) = &self.url {
            obj.insert("url".to_string(), json!(url));
        }
        obj.insert("tileSize".to_string(), json!(self.tile_size));
        if let Some(z) = self.min_zoom {
            obj.insert("minzoom".to_string(), json!(z));
        }
        if let Some(z) = self.max_zoom {
            obj.insert("maxzoom".to_string(), json!(z));
        }
        if let Some(attribution) = &self.attribution {
            obj.insert("attribution".to_string(), json!(attribution));
        }
        if let Some(bounds) = self.bounds {
            obj.insert("bounds".to_string(), json!(bounds));
        }
        Value::Object(obj)
    }
}

/// A drawable layer referencing a source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub layer_type: String,
    pub source: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub paint: Map<String, Value>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub layout: Map<String, Value>,
    #[serde(rename = "minzoom", skip_serializing_if = "Option::is_none")]
    pub min_zoom: Option<u32>,
    #[serde(rename = "maxzoom", skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<u32>,
}

/// Everything the host needs to add one configured layer.
#[derive(Debug, Clone)]
pub struct SourceHandoff {
    pub source_id: String,
    pub source: RasterSource,
    pub layers: Vec<LayerSpec>,
}

impl SourceHandoff {
    pub fn new(common: &LayerCommon, source: RasterSource) -> Self {
        Self {
            source_id: common.id.clone(),
            layers: vec![raster_layer(common, &common.id)],
            source,
        }
    }

    /// Resolve one tile URL, if the source is tile-based.
    pub fn tile_url(&self, address: TileAddress) -> Option<String> {
        self.source.tiles.as_ref().and_then(|t| t.url_for(address))
    }
}

/// The single `raster` layer every source gets, opacity defaulting to 1.
pub fn raster_layer(common: &LayerCommon, source_id: &str) -> LayerSpec {
    let mut paint = Map::new();
    paint.insert(
        "raster-opacity".to_string(),
        json!(common.opacity.unwrap_or(1.0)),
    );
    LayerSpec {
        id: format!("{}-raster", common.id),
        layer_type: "raster".to_string(),
        source: source_id.to_string(),
        paint,
        layout: Map::new(),
        min_zoom: common.min_zoom,
        max_zoom: common.max_zoom,
    }
}

/// Build the handoff for any resolved configuration.
///
/// Capabilities-driven WMTS has to go through
/// [`crate::wmts::resolve_wmts`] first.
pub fn create_source(
    config: &ServiceEndpointConfig,
    options: &BuildOptions,
) -> Result<SourceHandoff, ConfigError> {
    match config {
        ServiceEndpointConfig::Wms(cfg) => wms::create_wms_source(cfg, options),
        ServiceEndpointConfig::Wmts(cfg) => match &cfg.source {
            WmtsSource::Explicit(explicit) => {
                wmts::create_wmts_source(&cfg.common, explicit, options)
            }
            WmtsSource::Capabilities(caps) => Err(ConfigError::new(
                "source.capabilities",
                format!(
                    "layer '{}' must be resolved from {} before building",
                    caps.layer_id, caps.capabilities_url
                ),
                ConfigErrorCode::UnresolvedCapabilities,
            )),
        },
        ServiceEndpointConfig::Esri(cfg) => esri::create_esri_source(cfg, options),
        ServiceEndpointConfig::Xyz(cfg) => xyz::create_xyz_source(cfg, options),
        ServiceEndpointConfig::Pmtiles(cfg) => pmtiles::create_pmtiles_source(cfg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_source_fills_host_placeholders() {
        let tiles = TileSource::Static(vec!["https://h/{z}/{x}/{y}.png".to_string()]);
        assert_eq!(
            tiles.url_for(TileAddress::new(1, 2, 3)).unwrap(),
            "https://h/3/1/2.png"
        );
        assert!(!tiles.is_dynamic());
    }

    #[test]
    fn test_dynamic_source_calls_resolver() {
        let tiles = TileSource::Dynamic(Arc::new(|a: TileAddress| format!("t/{}", a.z)));
        assert_eq!(tiles.url_for(TileAddress::new(0, 0, 7)).unwrap(), "t/7");
        assert_eq!(format!("{:?}", tiles), "Dynamic(<fn>)");
    }

    #[test]
    fn test_raster_layer_defaults_opacity() {
        let layer = raster_layer(&LayerCommon::new("osm"), "osm");
        assert_eq!(layer.id, "osm-raster");
        assert_eq!(layer.layer_type, "raster");
        assert_eq!(layer.paint["raster-opacity"], 1.0);
    }

    #[test]
    fn test_unresolved_capabilities_rejected() {
        use crate::config::{CapabilitiesWmts, WmtsLayerConfig};

        let cfg = ServiceEndpointConfig::Wmts(WmtsLayerConfig {
            common: LayerCommon::new("w"),
            source: WmtsSource::Capabilities(CapabilitiesWmts {
                capabilities_url: "https://h/wmts".to_string(),
                layer_id: "l".to_string(),
                ..Default::default()
            }),
        });
        let err = create_source(&cfg, &BuildOptions::default()).unwrap_err();
        assert_eq!(err.code, ConfigErrorCode::UnresolvedCapabilities);
    }

    #[test]
    fn test_source_json_marks_dynamic() {
        let source = RasterSource::from_tiles(
            TileSource::Dynamic(Arc::new(|_: TileAddress| String::new())),
            512,
            &LayerCommon::new("x"),
        );
        let json = source.to_json();
        assert_eq!(json["tiles"], "dynamic");
        assert_eq!(json["tileSize"], 512);
    }
}
