//! Raster source resolution for OGC and de-facto tile services.
//!
//! Supports:
//! - WMS 1.1.1 and 1.3.0 GetMap / GetLegendGraphic
//! - WMTS 1.0.0 (RESTful and KVP bindings), explicit or capabilities-driven
//! - Esri ArcGIS REST `export`
//! - XYZ / TMS templates and PMTiles archives

pub mod capabilities;
pub mod config;
pub mod esri;
pub mod fetch;
pub mod pmtiles;
pub mod selection;
pub mod source;
pub mod url;
pub mod wms;
pub mod wmts;
pub mod xyz;

pub use capabilities::{
    parse_capabilities, Capabilities, DimensionDescriptor, LayerBoundingBox, LayerCapability,
    ResourceUrlTemplate, ServiceKind, StyleDescriptor,
};
pub use config::{
    CapabilitiesWmts, EsriLayerConfig, ExplicitWmts, LayerCommon, PmtilesLayerConfig,
    ServiceEndpointConfig, WmsLayerConfig, WmtsLayerConfig, WmtsSource, XyzLayerConfig,
};
pub use fetch::{
    discover_wmts, discover_wmts_source, fetch_capabilities, load_capabilities, resolve_endpoint,
    CapabilitiesRequest, FetchOptions, RequestTransform,
};
pub use pmtiles::ProtocolRegistry;
pub use selection::{select_format, select_matrix_set, select_resource_url, select_style};
pub use source::{
    create_source, raster_layer, BuildOptions, LayerSpec, RasterSource, SourceHandoff, TileSource,
    TileUrlFn, TileUrlTransform,
};
pub use wmts::resolve_wmts;
