//! WMS GetMap / GetLegendGraphic request construction.

use tile_common::{tile_to_bbox, BoundingBox, ConfigError, TileAddress};
use tracing::debug;

use crate::config::WmsLayerConfig;
use crate::source::{BuildOptions, RasterSource, SourceHandoff, TileSource};
use crate::url::{append_query, QueryParams};

/// Placeholder the host replaces with the tile's Web Mercator bbox.
pub const BBOX_3857_PLACEHOLDER: &str = "{bbox-epsg-3857}";

/// PNG and GIF are the only formats where `TRANSPARENT=TRUE` means anything.
pub fn supports_transparency(format: &str) -> bool {
    let lower = format.to_ascii_lowercase();
    lower.contains("png") || lower.contains("gif")
}

/// Styles padded with empty strings to the layer count.
fn styles_param(cfg: &WmsLayerConfig) -> String {
    if cfg.styles.is_empty() {
        vec![""; cfg.layers.len()].join(",")
    } else {
        cfg.styles.join(",")
    }
}

/// All GetMap parameters except `BBOX`, in emission order.
fn get_map_params(cfg: &WmsLayerConfig, width: u32, height: u32) -> Result<QueryParams, ConfigError> {
    cfg.validate()?;

    let version = cfg.version();
    let format = cfg.format();
    let mut params = QueryParams::new();
    params
        .push("SERVICE", "WMS")
        .push("VERSION", version.as_str())
        .push("REQUEST", "GetMap")
        .push("LAYERS", cfg.layers.join(","))
        .push("STYLES", styles_param(cfg))
        .push("FORMAT", format);
    if cfg.transparent() && supports_transparency(format) {
        params.push("TRANSPARENT", "TRUE");
    }
    params
        .push("WIDTH", width.to_string())
        .push("HEIGHT", height.to_string())
        .push(version.crs_param(), cfg.crs().to_string());

    for (key, value) in &cfg.extra_params {
        params.set(key, value);
    }
    Ok(params)
}

/// Build a GetMap URL for a known bounding box.
///
/// `bbox` is `minx,miny,maxx,maxy` in the layer CRS; axis order for the
/// configured version is applied here.
pub fn get_map_url(
    cfg: &WmsLayerConfig,
    bbox: &BoundingBox,
    width: u32,
    height: u32,
) -> Result<String, ConfigError> {
    let mut params = get_map_params(cfg, width, height)?;
    let order = cfg.crs().axis_order(cfg.version());
    params.push_raw("BBOX", bbox.to_wms_string(order));
    Ok(append_query(&cfg.base_url, &params.to_query_string()))
}

/// Build a GetLegendGraphic URL for `layer` (the first configured layer when `None`).
pub fn legend_url(cfg: &WmsLayerConfig, layer: Option<&str>) -> Result<String, ConfigError> {
    cfg.validate()?;

    let layer = layer
        .or_else(|| cfg.layers.first().map(String::as_str))
        .unwrap_or_default();
    let style = cfg
        .layers
        .iter()
        .position(|l| l == layer)
        .and_then(|i| cfg.styles.get(i))
        .filter(|s| !s.is_empty());

    let version = cfg.version();
    let mut params = QueryParams::new();
    params
        .push("SERVICE", "WMS")
        .push("VERSION", version.as_str())
        .push("REQUEST", "GetLegendGraphic")
        .push("LAYER", layer)
        .push("FORMAT", "image/png");
    if let Some(style) = style {
        params.push("STYLE", style.as_str());
    }
    if version == tile_common::WmsVersion::V1_3_0 {
        params.push("SLD_VERSION", "1.1.0");
    }
    Ok(append_query(&cfg.base_url, &params.to_query_string()))
}

/// Build the tile source for a WMS layer.
///
/// Web Mercator without a transform hook yields a static template using the
/// host's bbox placeholder; everything else resolves per tile.
pub fn create_wms_source(
    cfg: &WmsLayerConfig,
    options: &BuildOptions,
) -> Result<SourceHandoff, ConfigError> {
    let tile_size = cfg.tile_size();
    let params = get_map_params(cfg, tile_size, tile_size)?;
    let base = append_query(&cfg.base_url, &params.to_query_string());
    let crs = cfg.crs();

    let tiles = if crs.is_web_mercator() && options.transform.is_none() {
        let template = format!("{}&BBOX={}", base, BBOX_3857_PLACEHOLDER);
        debug!(layer = %cfg.common.id, template = %template, "Built static WMS template");
        TileSource::Static(vec![template])
    } else {
        let prefix = format!("{}&BBOX=", base);
        let order = crs.axis_order(cfg.version());
        let options = options.clone();
        debug!(layer = %cfg.common.id, crs = %crs, "Built per-tile WMS resolver");
        TileSource::Dynamic(std::sync::Arc::new(move |address: TileAddress| {
            let bbox = tile_to_bbox(address, &crs);
            let mut url = String::with_capacity(prefix.len() + 64);
            url.push_str(&prefix);
            url.push_str(&bbox.to_wms_string(order));
            options.apply(url)
        }))
    };

    Ok(SourceHandoff::new(
        &cfg.common,
        RasterSource::from_tiles(tiles, tile_size, &cfg.common),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerCommon;
    use tile_common::WmsVersion;

    fn cfg(crs: &str, version: WmsVersion) -> WmsLayerConfig {
        WmsLayerConfig {
            common: LayerCommon::new("wms"),
            base_url: "https://maps.example.com/wms".to_string(),
            layers: vec!["countries".to_string()],
            crs: Some(crs.to_string()),
            version: Some(version),
            ..Default::default()
        }
    }

    #[test]
    fn test_bbox_axis_order_1_3_0() {
        let url = get_map_url(
            &cfg("EPSG:4326", WmsVersion::V1_3_0),
            &BoundingBox::new(-180.0, -90.0, 180.0, 90.0),
            256,
            256,
        )
        .unwrap();
        assert!(url.contains("BBOX=-180,-90,180,90"), "{}", url);
        assert!(url.contains("CRS=EPSG:4326"));
    }

    #[test]
    fn test_bbox_axis_order_1_1_1() {
        let url = get_map_url(
            &cfg("EPSG:4326", WmsVersion::V1_1_1),
            &BoundingBox::new(-180.0, -90.0, 180.0, 90.0),
            256,
            256,
        )
        .unwrap();
        assert!(url.contains("BBOX=-90,-180,90,180"), "{}", url);
        assert!(url.contains("SRS=EPSG:4326"));
        assert!(!url.contains("CRS="));
    }

    #[test]
    fn test_transparent_only_for_png_family() {
        let mut c = cfg("EPSG:3857", WmsVersion::V1_3_0);
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert!(get_map_url(&c, &bbox, 256, 256).unwrap().contains("TRANSPARENT=TRUE"));

        c.format = Some("image/jpeg".to_string());
        assert!(!get_map_url(&c, &bbox, 256, 256).unwrap().contains("TRANSPARENT"));

        c.format = Some("image/png".to_string());
        c.transparent = Some(false);
        assert!(!get_map_url(&c, &bbox, 256, 256).unwrap().contains("TRANSPARENT"));
    }

    #[test]
    fn test_styles_padded_to_layer_count() {
        let mut c = cfg("EPSG:3857", WmsVersion::V1_3_0);
        c.layers = vec!["a".into(), "b".into(), "c".into()];
        let url = get_map_url(&c, &BoundingBox::new(0.0, 0.0, 1.0, 1.0), 256, 256).unwrap();
        assert!(url.contains("LAYERS=a,b,c&STYLES=,,&"), "{}", url);
    }

    #[test]
    fn test_extra_params_override_case_insensitively() {
        let mut c = cfg("EPSG:3857", WmsVersion::V1_3_0);
        c.extra_params.insert("format".to_string(), "image/webp".to_string());
        c.extra_params.insert("DIM_RUN".to_string(), "2024-01-01T00:00Z".to_string());
        let url = get_map_url(&c, &BoundingBox::new(0.0, 0.0, 1.0, 1.0), 256, 256).unwrap();
        assert!(url.contains("FORMAT=image%2Fwebp"), "{}", url);
        assert!(url.contains("DIM_RUN=2024-01-01T00:00Z"));
        assert!(url.ends_with("BBOX=0,0,1,1"));
    }

    #[test]
    fn test_web_mercator_uses_static_template() {
        let handoff =
            create_wms_source(&cfg("EPSG:3857", WmsVersion::V1_3_0), &BuildOptions::default())
                .unwrap();
        match handoff.source.tiles.as_ref().unwrap() {
            TileSource::Static(templates) => {
                assert_eq!(templates.len(), 1);
                assert!(templates[0].ends_with("&BBOX={bbox-epsg-3857}"));
                assert!(templates[0].contains("WIDTH=256&HEIGHT=256"));
            }
            other => panic!("expected static, got {:?}", other),
        }
    }

    #[test]
    fn test_transform_forces_dynamic() {
        let options = BuildOptions::with_transform(|url| format!("{}&token=abc", url));
        let handoff = create_wms_source(&cfg("EPSG:3857", WmsVersion::V1_3_0), &options).unwrap();
        assert!(handoff.source.tiles.as_ref().unwrap().is_dynamic());
        let url = handoff.tile_url(TileAddress::new(0, 0, 0)).unwrap();
        assert!(url.ends_with("&token=abc"));
        assert!(url.contains("BBOX=-20037508.34"), "{}", url);
    }

    #[test]
    fn test_geographic_resolves_per_tile() {
        let handoff = create_wms_source(
            &cfg("EPSG:4326", WmsVersion::V1_1_1),
            &BuildOptions::default(),
        )
        .unwrap();
        let url = handoff.tile_url(TileAddress::new(0, 0, 1)).unwrap();
        // lat,lon order under 1.1.1
        assert!(url.contains("&BBOX=0,-180,"), "{}", url);
    }

    #[test]
    fn test_legend_url() {
        let mut c = cfg("EPSG:3857", WmsVersion::V1_3_0);
        c.styles = vec!["gradient".to_string()];
        let url = legend_url(&c, None).unwrap();
        assert_eq!(
            url,
            "https://maps.example.com/wms?SERVICE=WMS&VERSION=1.3.0&REQUEST=GetLegendGraphic\
             &LAYER=countries&FORMAT=image%2Fpng&STYLE=gradient&SLD_VERSION=1.1.0"
        );
    }
}
