//! Esri ArcGIS REST `export` requests.

use std::sync::Arc;

use tile_common::{tile_to_bbox, AxisOrder, BoundingBox, ConfigError, CrsCode, TileAddress};
use tracing::debug;

use crate::config::EsriLayerConfig;
use crate::source::{BuildOptions, RasterSource, SourceHandoff, TileSource};
use crate::url::{append_query, QueryParams};

/// `{service}/export`, tolerating a trailing slash or an `export` suffix already present.
pub fn export_endpoint(service_url: &str) -> String {
    let trimmed = service_url.trim().trim_end_matches('/');
    let base = trimmed.strip_suffix("/export").unwrap_or(trimmed);
    format!("{}/export", base)
}

/// The CRS whose math is used for tiles: geographic or Web Mercator.
fn tile_crs(cfg: &EsriLayerConfig) -> CrsCode {
    match cfg.crs.as_deref().map(CrsCode::parse) {
        Some(crs) if crs.is_geographic() => CrsCode::Epsg4326,
        _ => CrsCode::Epsg3857,
    }
}

fn export_params(cfg: &EsriLayerConfig, bbox: &BoundingBox, width: u32, height: u32) -> QueryParams {
    let crs = tile_crs(cfg);
    let mut params = QueryParams::new();
    params.push_raw("bbox", bbox.to_wms_string(AxisOrder::XY));
    if cfg.crs.is_some() {
        let sr = crs.epsg_code().unwrap_or(3857).to_string();
        params.push("bboxSR", sr.as_str()).push("imageSR", sr);
    }
    params
        .push("size", format!("{},{}", width, height))
        .push("format", cfg.format())
        .push("transparent", cfg.transparent().to_string())
        .push("f", "image");
    if let Some(layer_id) = cfg.layer_id.as_deref().filter(|l| !l.is_empty()) {
        params.push("layers", format!("show:{}", layer_id));
    }
    params
}

/// Build one export URL for a known bounding box.
pub fn export_url(
    cfg: &EsriLayerConfig,
    bbox: &BoundingBox,
    width: u32,
    height: u32,
) -> Result<String, ConfigError> {
    cfg.validate()?;
    let params = export_params(cfg, bbox, width, height);
    Ok(append_query(
        &export_endpoint(&cfg.service_url),
        &params.to_query_string(),
    ))
}

/// Esri export has no host-side bbox placeholder for `bboxSR`, so the source
/// always resolves per tile.
pub fn create_esri_source(
    cfg: &EsriLayerConfig,
    options: &BuildOptions,
) -> Result<SourceHandoff, ConfigError> {
    cfg.validate()?;

    let cfg_owned = cfg.clone();
    let endpoint = export_endpoint(&cfg.service_url);
    let crs = tile_crs(cfg);
    let tile_size = cfg.tile_size();
    let options = options.clone();
    debug!(layer = %cfg.common.id, endpoint = %endpoint, crs = %crs, "Built Esri export resolver");

    let tiles = TileSource::Dynamic(Arc::new(move |address: TileAddress| {
        let bbox = tile_to_bbox(address, &crs);
        let params = export_params(&cfg_owned, &bbox, tile_size, tile_size);
        options.apply(append_query(&endpoint, &params.to_query_string()))
    }));

    Ok(SourceHandoff::new(
        &cfg.common,
        RasterSource::from_tiles(tiles, tile_size, &cfg.common),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerCommon;

    fn cfg() -> EsriLayerConfig {
        EsriLayerConfig {
            common: LayerCommon::new("esri"),
            service_url: "https://gis.example.com/arcgis/rest/services/World/MapServer/".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_export_endpoint_normalization() {
        assert_eq!(
            export_endpoint("https://h/MapServer/"),
            "https://h/MapServer/export"
        );
        assert_eq!(
            export_endpoint("https://h/MapServer/export"),
            "https://h/MapServer/export"
        );
    }

    #[test]
    fn test_export_url_defaults() {
        let url = export_url(&cfg(), &BoundingBox::new(0.0, 0.0, 10.0, 10.0), 256, 256).unwrap();
        assert_eq!(
            url,
            "https://gis.example.com/arcgis/rest/services/World/MapServer/export\
             ?bbox=0,0,10,10&size=256,256&format=png32&transparent=true&f=image"
        );
    }

    #[test]
    fn test_sublayer_and_spatial_reference() {
        let mut c = cfg();
        c.layer_id = Some("3".to_string());
        c.crs = Some("EPSG:4326".to_string());
        let handoff = create_esri_source(&c, &BuildOptions::default()).unwrap();
        let url = handoff.tile_url(TileAddress::new(0, 0, 0)).unwrap();
        assert!(url.contains("bbox=-180,"), "{}", url);
        assert!(url.contains("bboxSR=4326&imageSR=4326"));
        assert!(url.ends_with("&layers=show:3"));
    }

    #[test]
    fn test_unrecognized_crs_uses_web_mercator() {
        let mut c = cfg();
        c.crs = Some("EPSG:2154".to_string());
        let handoff = create_esri_source(&c, &BuildOptions::default()).unwrap();
        let url = handoff.tile_url(TileAddress::new(0, 0, 0)).unwrap();
        assert!(url.contains("bbox=-20037508.34"), "{}", url);
        assert!(url.contains("bboxSR=3857"));
    }
}
