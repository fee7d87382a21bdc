//! Capabilities document model and parser for WMS 1.1.1/1.3.0 and WMTS 1.0.0.
//!
//! Only the elements needed to build tile requests are read; everything else
//! in the document is ignored. Optional elements that are missing are simply
//! absent from the model.

mod wms;
mod wmts;
pub mod xml;

use serde::Serialize;
use tile_common::{BoundingBox, ParseError, TileMatrixSet};
use tracing::debug;

use self::xml::{parse_document, Element};

/// Which dialect a document was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Wms,
    Wmts,
}

/// Parsed capabilities document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capabilities {
    pub service: ServiceKind,
    pub version: String,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub keywords: Vec<String>,
    /// WMTS: flat list. WMS: top-level layers, nested via `children`.
    pub layers: Vec<LayerCapability>,
    /// WMTS only
    pub tile_matrix_sets: Vec<TileMatrixSet>,
    /// WMS GetMap endpoint
    pub get_map_url: Option<String>,
    /// WMTS GetTile KVP endpoint
    pub get_tile_url: Option<String>,
}

impl Capabilities {
    /// Find a layer by identifier, searching the WMS tree depth-first.
    ///
    /// Unnamed WMS group layers have an empty identifier and never match.
    pub fn find_layer(&self, identifier: &str) -> Option<&LayerCapability> {
        if identifier.is_empty() {
            return None;
        }
        fn walk<'a>(layers: &'a [LayerCapability], id: &str) -> Option<&'a LayerCapability> {
            for layer in layers {
                if layer.identifier == id {
                    return Some(layer);
                }
                if let Some(found) = walk(&layer.children, id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.layers, identifier)
    }

    /// Every named layer, depth-first.
    pub fn named_layers(&self) -> Vec<&LayerCapability> {
        fn walk<'a>(layers: &'a [LayerCapability], out: &mut Vec<&'a LayerCapability>) {
            for layer in layers {
                if !layer.identifier.is_empty() {
                    out.push(layer);
                }
                walk(&layer.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.layers, &mut out);
        out
    }

    pub fn tile_matrix_set(&self, identifier: &str) -> Option<&TileMatrixSet> {
        self.tile_matrix_sets
            .iter()
            .find(|s| s.identifier == identifier)
    }
}

/// One layer as advertised by the service.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LayerCapability {
    /// WMTS `Identifier` or WMS `Name` (empty for unnamed WMS groups)
    pub identifier: String,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub formats: Vec<String>,
    pub styles: Vec<StyleDescriptor>,
    /// WMTS only
    pub tile_matrix_set_links: Vec<String>,
    /// WMS only, including inherited entries
    pub crs: Vec<String>,
    pub resource_urls: Vec<ResourceUrlTemplate>,
    pub dimensions: Vec<DimensionDescriptor>,
    pub bbox: Option<LayerBoundingBox>,
    pub queryable: bool,
    pub children: Vec<LayerCapability>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StyleDescriptor {
    pub identifier: String,
    pub title: Option<String>,
    pub is_default: bool,
    pub legend_url: Option<String>,
}

/// A WMTS `ResourceURL` template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceUrlTemplate {
    pub format: String,
    pub resource_type: String,
    pub template: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DimensionDescriptor {
    pub identifier: String,
    pub units: Option<String>,
    pub default: Option<String>,
    pub values: Vec<String>,
}

impl DimensionDescriptor {
    /// Value to use when the caller gives none: the advertised default, else the first value.
    pub fn effective_default(&self) -> Option<&str> {
        self.default
            .as_deref()
            .or_else(|| self.values.first().map(String::as_str))
    }
}

/// A bounding box together with the CRS it is expressed in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerBoundingBox {
    pub crs: String,
    pub bbox: BoundingBox,
}

/// Parse a WMS or WMTS capabilities document.
pub fn parse_capabilities(document: &str) -> Result<Capabilities, ParseError> {
    let root = parse_document(document)?;
    let capabilities = match root.name.as_str() {
        "WMS_Capabilities" | "WMT_MS_Capabilities" => wms::parse(&root),
        "Capabilities" => wmts::parse(&root)?,
        "ServiceExceptionReport" | "ExceptionReport" => {
            return Err(service_exception(&root));
        }
        other => return Err(ParseError::UnsupportedDocument(other.to_string())),
    };
    debug!(
        service = ?capabilities.service,
        version = %capabilities.version,
        layers = capabilities.layers.len(),
        matrix_sets = capabilities.tile_matrix_sets.len(),
        "Parsed capabilities"
    );
    Ok(capabilities)
}

/// OWS `ExceptionReport` or WMS `ServiceExceptionReport`.
fn service_exception(root: &Element) -> ParseError {
    let exception = root
        .child("Exception")
        .or_else(|| root.child("ServiceException"));
    let code = exception
        .and_then(|e| e.attr("exceptionCode").or_else(|| e.attr("code")))
        .unwrap_or("Unknown")
        .to_string();
    let message = exception
        .and_then(|e| e.child_text("ExceptionText").or_else(|| e.text()))
        .unwrap_or_default()
        .to_string();
    ParseError::ServiceException { code, message }
}

/// Keywords from `KeywordList/Keyword` (WMS) or `Keywords/Keyword` (OWS).
fn keywords(service: &Element) -> Vec<String> {
    service
        .child("KeywordList")
        .or_else(|| service.child("Keywords"))
        .map(|list| {
            list.children_named("Keyword")
                .filter_map(Element::text)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Finite numbers only; `NaN` and `inf` parse as floats but mean nothing here.
fn parse_f64(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
