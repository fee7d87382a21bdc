//! Declarative layer configurations, one variant per protocol.
//!
//! Optional fields stay `None` here; protocol defaults are applied by the
//! builders when a source is created, never written back into the config.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tile_common::tile::MAX_ZOOM;
use tile_common::{ConfigError, ConfigErrorCode, CrsCode, TileMatrix, WmsVersion};

use crate::url::ensure_http_url;

/// Tile edge length used when a config does not say otherwise.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Fields shared by every layer kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerCommon {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_zoom: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<u32>,
}

impl LayerCommon {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::missing("id"));
        }
        if let Some(opacity) = self.opacity {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(ConfigError::new(
                    "opacity",
                    format!("opacity must be within [0, 1], got {}", opacity),
                    ConfigErrorCode::InvalidOpacity,
                ));
            }
        }
        for (field, zoom) in [("min_zoom", self.min_zoom), ("max_zoom", self.max_zoom)] {
            if let Some(z) = zoom {
                if z > MAX_ZOOM {
                    return Err(ConfigError::new(
                        field,
                        format!("zoom must be within [0, {}], got {}", MAX_ZOOM, z),
                        ConfigErrorCode::InvalidZoom,
                    ));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_zoom, self.max_zoom) {
            if min > max {
                return Err(ConfigError::new(
                    "min_zoom",
                    format!("min_zoom ({}) is greater than max_zoom ({})", min, max),
                    ConfigErrorCode::InvalidZoomRange,
                ));
            }
        }
        Ok(())
    }
}

/// OGC WMS GetMap layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WmsLayerConfig {
    #[serde(flatten)]
    pub common: LayerCommon,
    pub base_url: String,
    pub layers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<WmsVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_size: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_params: BTreeMap<String, String>,
}

impl WmsLayerConfig {
    pub const DEFAULT_FORMAT: &'static str = "image/png";

    pub fn version(&self) -> WmsVersion {
        self.version.unwrap_or_default()
    }

    pub fn crs(&self) -> CrsCode {
        self.crs.as_deref().map(CrsCode::parse).unwrap_or_default()
    }

    pub fn format(&self) -> &str {
        self.format.as_deref().unwrap_or(Self::DEFAULT_FORMAT)
    }

    pub fn transparent(&self) -> bool {
        self.transparent.unwrap_or(true)
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size.unwrap_or(DEFAULT_TILE_SIZE)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.common.validate()?;
        ensure_http_url("base_url", &self.base_url)?;
        if self.layers.iter().all(|l| l.trim().is_empty()) {
            return Err(ConfigError::missing("layers"));
        }
        if !self.styles.is_empty() && self.styles.len() != self.layers.len() {
            return Err(ConfigError::new(
                "styles",
                format!(
                    "{} styles given for {} layers",
                    self.styles.len(),
                    self.layers.len()
                ),
                ConfigErrorCode::StylesLayersMismatch,
            ));
        }
        Ok(())
    }
}

/// WMTS tile template with its matrix definitions already known.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExplicitWmts {
    pub tile_url_template: String,
    pub matrix_set: String,
    #[serde(default)]
    pub tile_matrices: Vec<TileMatrix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Values for `{<dimension>}` placeholders, e.g. `Time`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dimensions: BTreeMap<String, String>,
}

/// WMTS layer to be resolved from a capabilities document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CapabilitiesWmts {
    pub capabilities_url: String,
    pub layer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Preferred CRS for matrix-set selection (Web Mercator when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_crs: Option<String>,
    /// Breaks ties between matrix sets in the preferred CRS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_well_known_scale_set: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dimensions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WmtsSource {
    Explicit(ExplicitWmts),
    Capabilities(CapabilitiesWmts),
}

/// OGC WMTS layer, explicit or capabilities-driven.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WmtsLayerConfig {
    #[serde(flatten)]
    pub common: LayerCommon,
    pub source: WmtsSource,
}

impl WmtsLayerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.common.validate()?;
        match &self.source {
            WmtsSource::Explicit(explicit) => {
                ensure_http_url("source.explicit.tile_url_template", &explicit.tile_url_template)?;
                if explicit.matrix_set.trim().is_empty() {
                    return Err(ConfigError::missing("source.explicit.matrix_set"));
                }
            }
            WmtsSource::Capabilities(caps) => {
                ensure_http_url("source.capabilities.capabilities_url", &caps.capabilities_url)?;
                if caps.layer_id.trim().is_empty() {
                    return Err(ConfigError::missing("source.capabilities.layer_id"));
                }
            }
        }
        Ok(())
    }
}

/// Esri ArcGIS REST MapServer/ImageServer `export` layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EsriLayerConfig {
    #[serde(flatten)]
    pub common: LayerCommon,
    pub service_url: String,
    /// Sublayer id(s) for `layers=show:<id>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_size: Option<u32>,
}

impl EsriLayerConfig {
    pub const DEFAULT_FORMAT: &'static str = "png32";

    pub fn format(&self) -> &str {
        self.format.as_deref().unwrap_or(Self::DEFAULT_FORMAT)
    }

    pub fn transparent(&self) -> bool {
        self.transparent.unwrap_or(true)
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size.unwrap_or(DEFAULT_TILE_SIZE)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.common.validate()?;
        ensure_http_url("service_url", &self.service_url)
    }
}

/// Plain `{z}/{x}/{y}` (or TMS) tile template.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct XyzLayerConfig {
    #[serde(flatten)]
    pub common: LayerCommon,
    pub url_template: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subdomains: Vec<String>,
    #[serde(default)]
    pub tms: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_size: Option<u32>,
}

impl XyzLayerConfig {
    pub fn tile_size(&self) -> u32 {
        self.tile_size.unwrap_or(DEFAULT_TILE_SIZE)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.common.validate()?;
        ensure_http_url("url_template", &self.url_template)?;
        if self.url_template.contains("{s}") && self.subdomains.is_empty() {
            return Err(ConfigError::missing("subdomains"));
        }
        Ok(())
    }
}

/// Single-file PMTiles archive served over HTTP.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PmtilesLayerConfig {
    #[serde(flatten)]
    pub common: LayerCommon,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_size: Option<u32>,
}

impl PmtilesLayerConfig {
    pub fn tile_size(&self) -> u32 {
        self.tile_size.unwrap_or(DEFAULT_TILE_SIZE)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.common.validate()?;
        ensure_http_url("url", &self.url)
    }
}

/// A remote raster service, tagged by protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum ServiceEndpointConfig {
    Wms(WmsLayerConfig),
    Wmts(WmtsLayerConfig),
    Esri(EsriLayerConfig),
    Xyz(XyzLayerConfig),
    Pmtiles(PmtilesLayerConfig),
}

impl ServiceEndpointConfig {
    pub fn common(&self) -> &LayerCommon {
        match self {
            ServiceEndpointConfig::Wms(c) => &c.common,
            ServiceEndpointConfig::Wmts(c) => &c.common,
            ServiceEndpointConfig::Esri(c) => &c.common,
            ServiceEndpointConfig::Xyz(c) => &c.common,
            ServiceEndpointConfig::Pmtiles(c) => &c.common,
        }
    }

    pub fn id(&self) -> &str {
        &self.common().id
    }

    /// Protocol name as used in config files and logs.
    pub fn protocol(&self) -> &'static str {
        match self {
            ServiceEndpointConfig::Wms(_) => "wms",
            ServiceEndpointConfig::Wmts(_) => "wmts",
            ServiceEndpointConfig::Esri(_) => "esri",
            ServiceEndpointConfig::Xyz(_) => "xyz",
            ServiceEndpointConfig::Pmtiles(_) => "pmtiles",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ServiceEndpointConfig::Wms(c) => c.validate(),
            ServiceEndpointConfig::Wmts(c) => c.validate(),
            ServiceEndpointConfig::Esri(c) => c.validate(),
            ServiceEndpointConfig::Xyz(c) => c.validate(),
            ServiceEndpointConfig::Pmtiles(c) => c.validate(),
        }
    }
}
