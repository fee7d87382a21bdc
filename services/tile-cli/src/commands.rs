//! Subcommand implementations, kept free of argument parsing.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use layer_store::{persist_endpoint, restore_any};
use serde_json::Value;
use tile_common::TileAddress;
use tile_protocol::capabilities::Capabilities;
use tile_protocol::{
    create_source, load_capabilities, resolve_endpoint, resolve_wmts, BuildOptions,
    CapabilitiesWmts, FetchOptions, LayerCommon, ServiceEndpointConfig, WmtsLayerConfig,
};
use tracing::{info, warn};

/// Read a YAML layer file.
pub fn load_layer(path: &Path) -> Result<ServiceEndpointConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read layer file {}", path.display()))?;
    let config: ServiceEndpointConfig = serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse layer file {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid layer '{}'", config.id()))?;
    Ok(config)
}

/// Tile URL for one address, resolving capabilities first when needed.
pub async fn tile_url(
    config: &ServiceEndpointConfig,
    address: TileAddress,
    fetch: &FetchOptions,
) -> Result<String> {
    let resolved = resolve_endpoint(config, fetch)
        .await
        .with_context(|| format!("Failed to resolve layer '{}'", config.id()))?;
    let handoff = create_source(&resolved, &BuildOptions::default())
        .with_context(|| format!("Failed to build source for '{}'", config.id()))?;

    match handoff.tile_url(address) {
        Some(url) => Ok(url),
        None => match handoff.source.url {
            Some(url) => Ok(url),
            None => bail!("Layer '{}' has no tile URL", config.id()),
        },
    }
}

/// Layer identifiers advertised by a capabilities document, one per line.
pub fn list_layers(capabilities: &Capabilities) -> String {
    capabilities
        .named_layers()
        .iter()
        .map(|layer| match &layer.title {
            Some(title) => format!("{}\t{}", layer.identifier, title),
            None => layer.identifier.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve `query` against a live capabilities document into an explicit
/// WMTS layer, rendered as YAML.
pub async fn discover(query: &CapabilitiesWmts, fetch: &FetchOptions) -> Result<String> {
    let capabilities = load_capabilities(&query.capabilities_url, fetch)
        .await
        .with_context(|| format!("Failed to load {}", query.capabilities_url))?;
    let resolved = resolve_layer(&capabilities, query)?;
    render_yaml(&ServiceEndpointConfig::Wmts(resolved))
}

/// Resolve against an already loaded document.
pub fn resolve_layer(
    capabilities: &Capabilities,
    query: &CapabilitiesWmts,
) -> Result<WmtsLayerConfig> {
    let resolved = resolve_wmts(capabilities, &LayerCommon::new(&query.layer_id), query)
        .with_context(|| format!("Failed to resolve layer '{}'", query.layer_id))?;
    info!(layer = %query.layer_id, "Resolved layer");
    Ok(resolved)
}

pub fn render_yaml(config: &ServiceEndpointConfig) -> Result<String> {
    serde_yaml::to_string(config).context("Failed to render layer as YAML")
}

/// Persisted envelope as pretty JSON.
pub fn persist(config: &ServiceEndpointConfig) -> Result<String> {
    serde_json::to_string_pretty(&Value::Object(persist_endpoint(config)))
        .context("Failed to serialize envelope")
}

/// Restore a JSON envelope. With `strict`, records that skipped a migration
/// step are rejected.
pub fn restore(text: &str, strict: bool) -> Result<ServiceEndpointConfig> {
    let value: Value = serde_json::from_str(text).context("Envelope is not valid JSON")?;
    let restored = restore_any(&value).context("Failed to restore envelope")?;
    for warning in &restored.warnings {
        warn!(%warning, "Restored with warning");
    }
    if strict && restored.has_skipped_migrations() {
        bail!(
            "Layer '{}' skipped one or more migrations",
            restored.config.id()
        );
    }
    Ok(restored.config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use test_utils::capabilities::WMTS_BASIC;
    use tile_protocol::parse_capabilities;

    fn layer_file(yaml: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    const XYZ_LAYER: &str = r#"
protocol: xyz
id: osm
url_template: "https://{s}.tile.example.com/{z}/{x}/{y}.png"
subdomains: [a, b, c]
"#;

    #[tokio::test]
    async fn test_tile_url_from_yaml_file() {
        let file = layer_file(XYZ_LAYER);
        let config = load_layer(file.path()).unwrap();
        let url = tile_url(&config, TileAddress::new(1, 1, 2), &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(url, "https://b.tile.example.com/2/1/1.png");
    }

    #[tokio::test]
    async fn test_pmtiles_falls_back_to_archive_url() {
        let file = layer_file("protocol: pmtiles\nid: p\nurl: https://h/a.pmtiles\n");
        let config = load_layer(file.path()).unwrap();
        let url = tile_url(&config, TileAddress::new(0, 0, 0), &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(url, "pmtiles://https://h/a.pmtiles");
    }

    #[test]
    fn test_invalid_layer_file_is_reported() {
        let file = layer_file("protocol: xyz\nid: osm\nurl_template: \"ftp://h/{z}\"\n");
        let err = load_layer(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid layer 'osm'"));
    }

    #[test]
    fn test_persist_then_restore() {
        let config: ServiceEndpointConfig = serde_yaml::from_str(XYZ_LAYER).unwrap();
        let text = persist(&config).unwrap();
        assert!(text.contains("\"_type\": \"xyz-raster\""));
        assert_eq!(restore(&text, true).unwrap(), config);
    }

    #[test]
    fn test_restore_rejects_bad_json() {
        assert!(restore("{not json", false).is_err());
    }

    #[test]
    fn test_resolve_and_list_layers() {
        let caps = parse_capabilities(WMTS_BASIC).unwrap();
        assert_eq!(list_layers(&caps), "ortho\tOrthophotos\nadmin\tAdmin boundaries");

        let query = CapabilitiesWmts {
            capabilities_url: "https://tiles.example.com/wmts".to_string(),
            layer_id: "admin".to_string(),
            ..Default::default()
        };
        let resolved = resolve_layer(&caps, &query).unwrap();
        let yaml = render_yaml(&ServiceEndpointConfig::Wmts(resolved)).unwrap();
        assert!(yaml.contains("protocol: wmts"));
        assert!(yaml.contains("matrix_set: PM"));
    }
}
