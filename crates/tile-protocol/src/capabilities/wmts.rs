//! WMTS 1.0.0 capabilities.

use tile_common::tile::sort_matrices_by_zoom;
use tile_common::{BoundingBox, ParseError, TileMatrix, TileMatrixSet};
use tracing::warn;

use super::xml::Element;
use super::{
    keywords, parse_f64, Capabilities, DimensionDescriptor, LayerBoundingBox, LayerCapability,
    ResourceUrlTemplate, ServiceKind, StyleDescriptor,
};

pub(super) fn parse(root: &Element) -> Result<Capabilities, ParseError> {
    let service = root.child("ServiceIdentification");
    let contents = root.child("Contents");

    let layers = match contents {
        Some(c) => c
            .children_named("Layer")
            .map(parse_layer)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    let tile_matrix_sets = match contents {
        Some(c) => c
            .children_named("TileMatrixSet")
            .map(parse_matrix_set)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    Ok(Capabilities {
        service: ServiceKind::Wmts,
        version: root.attr("version").unwrap_or("1.0.0").to_string(),
        title: service.and_then(|s| s.child_text("Title")).map(str::to_string),
        abstract_text: service
            .and_then(|s| s.child_text("Abstract"))
            .map(str::to_string),
        keywords: service.map(keywords).unwrap_or_default(),
        layers,
        tile_matrix_sets,
        get_map_url: None,
        get_tile_url: get_tile_url(root),
    })
}

/// KVP GET endpoint of the GetTile operation.
fn get_tile_url(root: &Element) -> Option<String> {
    root.child("OperationsMetadata")?
        .children_named("Operation")
        .find(|op| op.attr("name") == Some("GetTile"))?
        .find_path(&["DCP", "HTTP"])?
        .children_named("Get")
        .find(|get| {
            // prefer an endpoint that declares KVP, accept one that declares nothing
            get.find_path(&["Constraint", "AllowedValues"])
                .map(|allowed| {
                    allowed
                        .children_named("Value")
                        .any(|v| v.text() == Some("KVP"))
                })
                .unwrap_or(true)
        })
        .and_then(|get| get.attr("href"))
        .map(str::to_string)
}

fn parse_layer(el: &Element) -> Result<LayerCapability, ParseError> {
    let identifier = el
        .child_text("Identifier")
        .ok_or_else(|| ParseError::MissingElement("Layer/Identifier".to_string()))?
        .to_string();

    let styles = el
        .children_named("Style")
        .map(|s| StyleDescriptor {
            identifier: s.child_text("Identifier").unwrap_or_default().to_string(),
            title: s.child_text("Title").map(str::to_string),
            is_default: s.attr("isDefault") == Some("true"),
            legend_url: s
                .child("LegendURL")
                .and_then(|l| l.attr("href"))
                .map(str::to_string),
        })
        .collect();

    let resource_urls = el
        .children_named("ResourceURL")
        .filter_map(|r| {
            Some(ResourceUrlTemplate {
                format: r.attr("format").unwrap_or_default().to_string(),
                resource_type: r.attr("resourceType").unwrap_or("tile").to_string(),
                template: r.attr("template")?.to_string(),
            })
        })
        .collect();

    let dimensions = el
        .children_named("Dimension")
        .filter_map(|d| {
            Some(DimensionDescriptor {
                identifier: d.child_text("Identifier")?.to_string(),
                units: d.child_text("UOM").map(str::to_string),
                default: d.child_text("Default").map(str::to_string),
                values: d
                    .children_named("Value")
                    .filter_map(Element::text)
                    .map(str::to_string)
                    .collect(),
            })
        })
        .collect();

    Ok(LayerCapability {
        identifier,
        title: el.child_text("Title").map(str::to_string),
        abstract_text: el.child_text("Abstract").map(str::to_string),
        formats: el
            .children_named("Format")
            .filter_map(Element::text)
            .map(str::to_string)
            .collect(),
        styles,
        tile_matrix_set_links: el
            .children_named("TileMatrixSetLink")
            .filter_map(|link| link.child_text("TileMatrixSet"))
            .map(str::to_string)
            .collect(),
        crs: Vec::new(),
        resource_urls,
        dimensions,
        bbox: wgs84_bbox(el),
        queryable: false,
        children: Vec::new(),
    })
}

fn wgs84_bbox(el: &Element) -> Option<LayerBoundingBox> {
    let bb = el.child("WGS84BoundingBox")?;
    let (min_x, min_y) = corner(bb.child_text("LowerCorner")?)?;
    let (max_x, max_y) = corner(bb.child_text("UpperCorner")?)?;
    Some(LayerBoundingBox {
        crs: "CRS:84".to_string(),
        bbox: BoundingBox::new(min_x, min_y, max_x, max_y),
    })
}

fn corner(text: &str) -> Option<(f64, f64)> {
    let mut parts = text.split_whitespace().map(parse_f64);
    Some((parts.next()??, parts.next()??))
}

fn parse_matrix_set(el: &Element) -> Result<TileMatrixSet, ParseError> {
    let identifier = el
        .child_text("Identifier")
        .ok_or_else(|| ParseError::MissingElement("TileMatrixSet/Identifier".to_string()))?
        .to_string();
    // an incomplete matrix only costs its own zoom level
    let mut tile_matrices: Vec<TileMatrix> = el
        .children_named("TileMatrix")
        .filter_map(|m| match parse_matrix(m, &identifier) {
            Ok(matrix) => Some(matrix),
            Err(e) => {
                warn!(matrix_set = %identifier, error = %e, "Skipping incomplete tile matrix");
                None
            }
        })
        .collect();
    sort_matrices_by_zoom(&mut tile_matrices);

    Ok(TileMatrixSet {
        supported_crs: el.child_text("SupportedCRS").unwrap_or_default().to_string(),
        well_known_scale_set: el.child_text("WellKnownScaleSet").map(str::to_string),
        identifier,
        tile_matrices,
    })
}

fn parse_matrix(el: &Element, set: &str) -> Result<TileMatrix, ParseError> {
    let missing = |name: &str| ParseError::MissingElement(format!("TileMatrixSet[{}]/TileMatrix/{}", set, name));
    let text = |name: &str| el.child_text(name).ok_or_else(|| missing(name));
    let number = |name: &str| text(name).and_then(|t| parse_f64(t).ok_or_else(|| missing(name)));
    let integer = |name: &str| {
        text(name).and_then(|t| t.trim().parse::<u32>().map_err(|_| missing(name)))
    };

    let top_left = corner(text("TopLeftCorner")?).ok_or_else(|| missing("TopLeftCorner"))?;

    Ok(TileMatrix {
        identifier: text("Identifier")?.to_string(),
        scale_denominator: number("ScaleDenominator")?,
        top_left_corner: top_left,
        tile_width: integer("TileWidth")?,
        tile_height: integer("TileHeight")?,
        matrix_width: integer("MatrixWidth")?,
        matrix_height: integer("MatrixHeight")?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::parse_capabilities;
    use super::*;
    use test_utils::capabilities::{WMTS_BASIC, WMTS_KVP_ONLY};

    #[test]
    fn test_service_identification() {
        let caps = parse_capabilities(WMTS_BASIC).unwrap();
        assert_eq!(caps.service, ServiceKind::Wmts);
        assert_eq!(caps.version, "1.0.0");
        assert_eq!(caps.title.as_deref(), Some("Demo Tiles"));
        assert_eq!(caps.abstract_text.as_deref(), Some("Orthophotos & topography"));
        assert_eq!(caps.keywords, vec!["imagery", "basemap"]);
        assert_eq!(caps.get_tile_url.as_deref(), Some("https://tiles.example.com/wmts?"));
    }

    #[test]
    fn test_layer_contents() {
        let caps = parse_capabilities(WMTS_BASIC).unwrap();
        assert_eq!(caps.layers.len(), 2);
        let ortho = caps.find_layer("ortho").unwrap();
        assert_eq!(ortho.title.as_deref(), Some("Orthophotos"));
        assert_eq!(ortho.formats, vec!["image/jpeg", "image/png"]);
        assert_eq!(ortho.tile_matrix_set_links, vec!["WGS84", "PM"]);
        assert_eq!(ortho.styles.len(), 2);
        assert!(!ortho.styles[0].is_default);
        assert!(ortho.styles[1].is_default);
        assert_eq!(
            ortho.styles[1].legend_url.as_deref(),
            Some("https://tiles.example.com/legend/ortho.png")
        );
        assert_eq!(ortho.resource_urls.len(), 3);
        assert_eq!(ortho.resource_urls[0].resource_type, "FeatureInfo");
        assert_eq!(ortho.dimensions[0].identifier, "Time");
        assert_eq!(ortho.dimensions[0].default.as_deref(), Some("2024-01-15"));
        assert_eq!(ortho.dimensions[0].units.as_deref(), Some("ISO8601"));
        let bbox = ortho.bbox.as_ref().unwrap();
        assert_eq!(bbox.bbox.to_array(), [-5.5, 41.0, 10.0, 51.5]);
    }

    #[test]
    fn test_matrices_sorted_by_zoom() {
        let caps = parse_capabilities(WMTS_BASIC).unwrap();
        let pm = caps.tile_matrix_set("PM").unwrap();
        let ids: Vec<&str> = pm.tile_matrices.iter().map(|m| m.identifier.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
        assert_eq!(
            pm.well_known_scale_set.as_deref(),
            Some("urn:ogc:def:wkss:OGC:1.0:GoogleMapsCompatible")
        );
        assert!(pm.crs().is_web_mercator());
        assert_eq!(pm.tile_matrices[0].top_left_corner.1, 20037508.3427892);

        let wgs = caps.tile_matrix_set("WGS84").unwrap();
        assert_eq!(wgs.tile_matrices[0].matrix_width, 2);
        assert!(wgs.crs().is_geographic());
    }

    #[test]
    fn test_get_tile_url_without_constraint() {
        let caps = parse_capabilities(WMTS_KVP_ONLY).unwrap();
        assert_eq!(
            caps.get_tile_url.as_deref(),
            Some("https://kvp.example.com/service/wmts?")
        );
        assert!(caps.layers[0].resource_urls.is_empty());
        assert_eq!(caps.tile_matrix_sets[0].tile_matrices[0].tile_width, 512);
    }

    const MATRIX_1: &str = r#"<TileMatrix><Identifier>1</Identifier><ScaleDenominator>279541132.0143589</ScaleDenominator>
              <TopLeftCorner>-20037508.3427892 20037508.3427892</TopLeftCorner><TileWidth>256</TileWidth>
              <TileHeight>256</TileHeight><MatrixWidth>2</MatrixWidth><MatrixHeight>2</MatrixHeight></TileMatrix>"#;

    fn single_set(matrices: &str) -> String {
        format!(
            r#"<Capabilities version="1.0.0"><Contents>
            <Layer><Identifier>l</Identifier><TileMatrixSetLink><TileMatrixSet>s</TileMatrixSet></TileMatrixSetLink></Layer>
            <TileMatrixSet><Identifier>s</Identifier><SupportedCRS>EPSG:3857</SupportedCRS>{}</TileMatrixSet>
            </Contents></Capabilities>"#,
            matrices
        )
    }

    #[test]
    fn test_incomplete_matrix_is_skipped() {
        let xml = single_set(&format!(
            "<TileMatrix><Identifier>0</Identifier><ScaleDenominator>1</ScaleDenominator></TileMatrix>{}",
            MATRIX_1
        ));
        let caps = parse_capabilities(&xml).unwrap();
        assert_eq!(caps.layers.len(), 1);
        let set = caps.tile_matrix_set("s").unwrap();
        let ids: Vec<&str> = set.tile_matrices.iter().map(|m| m.identifier.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[test]
    fn test_non_finite_scale_is_skipped() {
        let nan = MATRIX_1
            .replace("279541132.0143589", "NaN")
            .replace("<Identifier>1</Identifier>", "<Identifier>x</Identifier>");
        let caps = parse_capabilities(&single_set(&format!("{}{}", nan, MATRIX_1))).unwrap();
        let set = caps.tile_matrix_set("s").unwrap();
        assert_eq!(set.tile_matrices.len(), 1);
        assert!(set.tile_matrices[0].scale_denominator.is_finite());
    }

    #[test]
    fn test_layer_without_identifier() {
        let xml = r#"<Capabilities version="1.0.0"><Contents><Layer><Title>x</Title></Layer></Contents></Capabilities>"#;
        assert_eq!(
            parse_capabilities(xml).unwrap_err(),
            ParseError::MissingElement("Layer/Identifier".to_string())
        );
    }
}
