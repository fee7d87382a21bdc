//! WMS 1.1.1 / 1.3.0 capabilities.

use tile_common::BoundingBox;

use super::xml::Element;
use super::{
    keywords, parse_f64, Capabilities, DimensionDescriptor, LayerBoundingBox, LayerCapability,
    ServiceKind, StyleDescriptor,
};

/// Values a child layer inherits from its ancestors.
#[derive(Default, Clone)]
struct Inherited {
    crs: Vec<String>,
    styles: Vec<StyleDescriptor>,
    bbox: Option<LayerBoundingBox>,
    dimensions: Vec<DimensionDescriptor>,
}

pub(super) fn parse(root: &Element) -> Capabilities {
    let service = root.child("Service");
    let get_map = root.find_path(&["Capability", "Request", "GetMap"]);

    let formats: Vec<String> = get_map
        .map(|gm| {
            gm.children_named("Format")
                .filter_map(Element::text)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let get_map_url = get_map
        .and_then(|gm| gm.find_path(&["DCPType", "HTTP", "Get", "OnlineResource"]))
        .and_then(|r| r.attr("href"))
        .map(str::to_string);

    let layers = root
        .child("Capability")
        .map(|cap| {
            cap.children_named("Layer")
                .map(|l| parse_layer(l, &formats, &Inherited::default()))
                .collect()
        })
        .unwrap_or_default();

    Capabilities {
        service: ServiceKind::Wms,
        version: root.attr("version").unwrap_or("1.3.0").to_string(),
        title: service.and_then(|s| s.child_text("Title")).map(str::to_string),
        abstract_text: service
            .and_then(|s| s.child_text("Abstract"))
            .map(str::to_string),
        keywords: service.map(keywords).unwrap_or_default(),
        layers,
        tile_matrix_sets: Vec::new(),
        get_map_url,
        get_tile_url: None,
    }
}

fn parse_layer(el: &Element, formats: &[String], parent: &Inherited) -> LayerCapability {
    // CRS (1.3.0) or SRS (1.1.1, possibly whitespace separated), added to the parent's list
    let mut crs = parent.crs.clone();
    for code in el
        .children
        .iter()
        .filter(|c| c.name == "CRS" || c.name == "SRS")
        .filter_map(Element::text)
        .flat_map(str::split_whitespace)
    {
        if !crs.iter().any(|c| c.eq_ignore_ascii_case(code)) {
            crs.push(code.to_string());
        }
    }

    let mut styles = parent.styles.clone();
    for style in el.children_named("Style").map(parse_style) {
        if !styles.iter().any(|s| s.identifier == style.identifier) {
            styles.push(style);
        }
    }

    let bbox = layer_bbox(el).or_else(|| parent.bbox.clone());

    let mut dimensions = parent.dimensions.clone();
    for dim in el.children_named("Dimension").filter_map(|d| parse_dimension(d, el)) {
        match dimensions
            .iter_mut()
            .find(|d| d.identifier.eq_ignore_ascii_case(&dim.identifier))
        {
            Some(existing) => *existing = dim,
            None => dimensions.push(dim),
        }
    }

    let inherited = Inherited {
        crs: crs.clone(),
        styles: styles.clone(),
        bbox: bbox.clone(),
        dimensions: dimensions.clone(),
    };
    let children = el
        .children_named("Layer")
        .map(|child| parse_layer(child, formats, &inherited))
        .collect();

    LayerCapability {
        identifier: el.child_text("Name").unwrap_or_default().to_string(),
        title: el.child_text("Title").map(str::to_string),
        abstract_text: el.child_text("Abstract").map(str::to_string),
        formats: formats.to_vec(),
        styles,
        tile_matrix_set_links: Vec::new(),
        crs,
        resource_urls: Vec::new(),
        dimensions,
        bbox,
        queryable: matches!(el.attr("queryable"), Some("1") | Some("true")),
        children,
    }
}

fn parse_style(el: &Element) -> StyleDescriptor {
    StyleDescriptor {
        identifier: el.child_text("Name").unwrap_or_default().to_string(),
        title: el.child_text("Title").map(str::to_string),
        is_default: false,
        legend_url: el
            .find_path(&["LegendURL", "OnlineResource"])
            .and_then(|r| r.attr("href"))
            .map(str::to_string),
    }
}

/// 1.3.0 carries values in the `Dimension` text; 1.1.1 puts them in a sibling `Extent`.
fn parse_dimension(dim: &Element, layer: &Element) -> Option<DimensionDescriptor> {
    let name = dim.attr("name")?.to_string();
    let extent = layer
        .children_named("Extent")
        .find(|e| e.attr("name").is_some_and(|n| n.eq_ignore_ascii_case(&name)));
    let text = dim.text().or_else(|| extent.and_then(Element::text));
    let default = dim
        .attr("default")
        .or_else(|| extent.and_then(|e| e.attr("default")))
        .map(str::to_string);

    Some(DimensionDescriptor {
        identifier: name,
        units: dim.attr("units").map(str::to_string),
        default,
        values: text
            .map(|t| {
                t.split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    })
}

/// First `BoundingBox`, else the geographic box as CRS:84.
fn layer_bbox(el: &Element) -> Option<LayerBoundingBox> {
    if let Some(bb) = el.child("BoundingBox") {
        let crs = bb.attr("CRS").or_else(|| bb.attr("SRS")).unwrap_or("CRS:84");
        if let Some(bbox) = attr_box(bb) {
            return Some(LayerBoundingBox {
                crs: crs.to_string(),
                bbox,
            });
        }
    }
    if let Some(geo) = el.child("EX_GeographicBoundingBox") {
        let coord = |name: &str| geo.child_text(name).and_then(parse_f64);
        if let (Some(w), Some(s), Some(e), Some(n)) = (
            coord("westBoundLongitude"),
            coord("southBoundLatitude"),
            coord("eastBoundLongitude"),
            coord("northBoundLatitude"),
        ) {
            return Some(LayerBoundingBox {
                crs: "CRS:84".to_string(),
                bbox: BoundingBox::new(w, s, e, n),
            });
        }
    }
    el.child("LatLonBoundingBox")
        .and_then(attr_box)
        .map(|bbox| LayerBoundingBox {
            crs: "CRS:84".to_string(),
            bbox,
        })
}

fn attr_box(el: &Element) -> Option<BoundingBox> {
    let v = |name: &str| el.attr(name).and_then(parse_f64);
    Some(BoundingBox::new(v("minx")?, v("miny")?, v("maxx")?, v("maxy")?))
}

#[cfg(test)]
mod tests {
    use super::super::parse_capabilities;
    use super::*;
    use test_utils::capabilities::{WMS_111, WMS_130};

    #[test]
    fn test_wms_130_service_and_tree() {
        let caps = parse_capabilities(WMS_130).unwrap();
        assert_eq!(caps.service, ServiceKind::Wms);
        assert_eq!(caps.version, "1.3.0");
        assert_eq!(caps.title.as_deref(), Some("Weather Maps"));
        assert_eq!(caps.keywords, vec!["weather", "forecast"]);
        assert_eq!(caps.get_map_url.as_deref(), Some("https://maps.example.com/wms?"));

        assert_eq!(caps.layers.len(), 1);
        let root = &caps.layers[0];
        assert_eq!(root.identifier, "");
        assert_eq!(root.children.len(), 2);

        let names: Vec<&str> = caps.named_layers().iter().map(|l| l.identifier.as_str()).collect();
        assert_eq!(names, vec!["temperature", "wind"]);
    }

    #[test]
    fn test_wms_children_inherit() {
        let caps = parse_capabilities(WMS_130).unwrap();
        let temp = caps.find_layer("temperature").unwrap();
        assert_eq!(temp.crs, vec!["EPSG:4326", "EPSG:3857", "EPSG:32632"]);
        let style_ids: Vec<&str> = temp.styles.iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(style_ids, vec!["default", "gradient"]);
        assert_eq!(
            temp.styles[1].legend_url.as_deref(),
            Some("https://maps.example.com/legend/temperature.png")
        );
        assert!(temp.queryable);
        assert_eq!(temp.bbox.as_ref().unwrap().crs, "EPSG:3857");
        assert_eq!(temp.formats, vec!["image/png", "image/jpeg"]);

        let time = &temp.dimensions[0];
        assert_eq!(time.identifier, "time");
        assert_eq!(time.default.as_deref(), Some("2024-01-15T12:00:00Z"));
        assert_eq!(time.values.len(), 2);

        // nested two levels down, bbox from the root's geographic box
        let wind = caps.find_layer("wind").unwrap();
        assert_eq!(wind.crs, vec!["EPSG:4326", "EPSG:3857"]);
        let bbox = wind.bbox.as_ref().unwrap();
        assert_eq!(bbox.crs, "CRS:84");
        assert_eq!(bbox.bbox.to_array(), [-180.0, -90.0, 180.0, 90.0]);
        assert!(!wind.queryable);
    }

    #[test]
    fn test_wms_111() {
        let caps = parse_capabilities(WMS_111).unwrap();
        assert_eq!(caps.version, "1.1.1");
        assert_eq!(
            caps.get_map_url.as_deref(),
            Some("http://legacy.example.com/cgi-bin/wms?")
        );
        let countries = caps.find_layer("countries").unwrap();
        assert_eq!(countries.crs, vec!["EPSG:4326"]);
        assert_eq!(countries.formats, vec!["image/gif"]);
        assert_eq!(countries.bbox.as_ref().unwrap().crs, "CRS:84");
    }

    #[test]
    fn test_extent_values_in_111() {
        let xml = r#"<WMT_MS_Capabilities version="1.1.1"><Capability><Layer>
            <Name>radar</Name>
            <SRS>EPSG:4326 EPSG:3857</SRS>
            <Dimension name="time" units="ISO8601"/>
            <Extent name="time" default="2024-02-01">2024-01-01,2024-02-01</Extent>
        </Layer></Capability></WMT_MS_Capabilities>"#;
        let caps = parse_capabilities(xml).unwrap();
        let radar = caps.find_layer("radar").unwrap();
        assert_eq!(radar.crs, vec!["EPSG:4326", "EPSG:3857"]);
        assert_eq!(radar.dimensions[0].default.as_deref(), Some("2024-02-01"));
        assert_eq!(radar.dimensions[0].values, vec!["2024-01-01", "2024-02-01"]);
    }
}
