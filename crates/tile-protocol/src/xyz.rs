//! XYZ / TMS tile templates.

use std::borrow::Cow;
use std::sync::Arc;

use tile_common::tile::tms_flip_y;
use tile_common::{ConfigError, TileAddress};
use tracing::debug;

use crate::config::XyzLayerConfig;
use crate::source::{BuildOptions, RasterSource, SourceHandoff, TileSource};
use crate::url::fill_template;

/// Subdomain for a tile: `(x + y + z) mod n`, so a tile always hits the same host.
pub fn subdomain_for(address: TileAddress, subdomains: &[String]) -> Option<&str> {
    if subdomains.is_empty() {
        return None;
    }
    let idx = (address.x as u64 + address.y as u64 + address.z as u64) % subdomains.len() as u64;
    Some(subdomains[idx as usize].as_str())
}

/// Substitute `{z}`, `{x}`, `{y}`, `{-y}` and `{s}` for one tile.
pub fn xyz_tile_url(
    template: &str,
    address: TileAddress,
    tms: bool,
    subdomains: &[String],
) -> String {
    let y = if tms { address.tms_y() } else { address.y };
    fill_template(template, |name| match name {
        "z" => Some(Cow::Owned(address.z.to_string())),
        "x" => Some(Cow::Owned(address.x.to_string())),
        "y" => Some(Cow::Owned(y.to_string())),
        "-y" => Some(Cow::Owned(tms_flip_y(address.y, address.z).to_string())),
        "s" => subdomain_for(address, subdomains).map(Cow::Borrowed),
        _ => None,
    })
}

/// Expand `{s}` into one template per subdomain, leaving the rest for the host.
pub fn expand_subdomains(template: &str, subdomains: &[String]) -> Vec<String> {
    if !template.contains("{s}") || subdomains.is_empty() {
        return vec![template.to_string()];
    }
    subdomains
        .iter()
        .map(|s| template.replace("{s}", s))
        .collect()
}

pub fn create_xyz_source(
    cfg: &XyzLayerConfig,
    options: &BuildOptions,
) -> Result<SourceHandoff, ConfigError> {
    cfg.validate()?;

    let needs_resolver = cfg.tms || options.transform.is_some() || cfg.url_template.contains("{-y}");
    let tiles = if needs_resolver {
        let template = cfg.url_template.clone();
        let subdomains = cfg.subdomains.clone();
        let tms = cfg.tms;
        let options = options.clone();
        debug!(layer = %cfg.common.id, tms, "Built per-tile XYZ resolver");
        TileSource::Dynamic(Arc::new(move |address: TileAddress| {
            options.apply(xyz_tile_url(&template, address, tms, &subdomains))
        }))
    } else {
        let templates = expand_subdomains(&cfg.url_template, &cfg.subdomains);
        debug!(layer = %cfg.common.id, count = templates.len(), "Built static XYZ templates");
        TileSource::Static(templates)
    };

    Ok(SourceHandoff::new(
        &cfg.common,
        RasterSource::from_tiles(tiles, cfg.tile_size(), &cfg.common),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerCommon;

    fn osm() -> XyzLayerConfig {
        XyzLayerConfig {
            common: LayerCommon::new("osm"),
            url_template: "https://{s}.tile.example.org/{z}/{x}/{y}.png".to_string(),
            subdomains: vec!["a".into(), "b".into(), "c".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_eager_subdomain_expansion() {
        let handoff = create_xyz_source(&osm(), &BuildOptions::default()).unwrap();
        match handoff.source.tiles.as_ref().unwrap() {
            TileSource::Static(templates) => {
                assert_eq!(
                    templates,
                    &vec![
                        "https://a.tile.example.org/{z}/{x}/{y}.png".to_string(),
                        "https://b.tile.example.org/{z}/{x}/{y}.png".to_string(),
                        "https://c.tile.example.org/{z}/{x}/{y}.png".to_string(),
                    ]
                );
            }
            other => panic!("expected static, got {:?}", other),
        }
    }

    #[test]
    fn test_hooked_subdomain_is_deterministic() {
        let options = BuildOptions::with_transform(|u| format!("{}?key=k", u));
        let handoff = create_xyz_source(&osm(), &options).unwrap();
        // (1 + 2 + 3) % 3 == 0
        let url = handoff.tile_url(TileAddress::new(1, 2, 3)).unwrap();
        assert_eq!(url, "https://a.tile.example.org/3/1/2.png?key=k");
        assert_eq!(handoff.tile_url(TileAddress::new(1, 2, 3)).unwrap(), url);
        let other = handoff.tile_url(TileAddress::new(2, 2, 3)).unwrap();
        assert!(other.starts_with("https://b."));
    }

    #[test]
    fn test_static_and_dynamic_agree() {
        let address = TileAddress::new(5, 9, 4);
        let plain = create_xyz_source(&osm(), &BuildOptions::default()).unwrap();
        let hooked =
            create_xyz_source(&osm(), &BuildOptions::with_transform(|u| u.to_string())).unwrap();
        assert_eq!(plain.tile_url(address), hooked.tile_url(address));
    }

    #[test]
    fn test_tms_flips_row() {
        let mut cfg = osm();
        cfg.tms = true;
        cfg.subdomains.clear();
        cfg.url_template = "https://tms.example.org/{z}/{x}/{y}.png".to_string();
        let handoff = create_xyz_source(&cfg, &BuildOptions::default()).unwrap();
        assert_eq!(
            handoff.tile_url(TileAddress::new(0, 0, 3)).unwrap(),
            "https://tms.example.org/3/0/7.png"
        );
    }

    #[test]
    fn test_negative_y_placeholder() {
        let url = xyz_tile_url("https://h/{z}/{x}/{-y}", TileAddress::new(1, 1, 2), false, &[]);
        assert_eq!(url, "https://h/2/1/2");
    }
}
