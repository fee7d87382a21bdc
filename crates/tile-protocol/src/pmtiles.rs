//! PMTiles archives and the one-time protocol handler registration they need.

use std::sync::atomic::{AtomicBool, Ordering};

use tile_common::ConfigError;
use tracing::debug;

use crate::config::PmtilesLayerConfig;
use crate::source::{RasterSource, SourceHandoff};

pub const PMTILES_SCHEME: &str = "pmtiles://";

/// `pmtiles://<archive url>`, without doubling an existing prefix.
pub fn pmtiles_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with(PMTILES_SCHEME) {
        url.to_string()
    } else {
        format!("{}{}", PMTILES_SCHEME, url)
    }
}

pub fn create_pmtiles_source(cfg: &PmtilesLayerConfig) -> Result<SourceHandoff, ConfigError> {
    cfg.validate()?;
    let source = RasterSource {
        tiles: None,
        url: Some(pmtiles_url(&cfg.url)),
        tile_size: cfg.tile_size(),
        min_zoom: cfg.common.min_zoom,
        max_zoom: cfg.common.max_zoom,
        attribution: cfg.common.attribution.clone(),
        bounds: None,
    };
    Ok(SourceHandoff::new(&cfg.common, source))
}

/// Tracks which optional protocol handlers have been installed on a host.
///
/// Owned by whoever owns the host; there is no process-wide instance.
#[derive(Debug, Default)]
pub struct ProtocolRegistry {
    pmtiles: AtomicBool,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `register` the first time only. Returns whether it ran.
    pub fn ensure_pmtiles<F: FnOnce()>(&self, register: F) -> bool {
        if self
            .pmtiles
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            debug!("Registering pmtiles protocol handler");
            register();
            true
        } else {
            false
        }
    }

    pub fn is_pmtiles_registered(&self) -> bool {
        self.pmtiles.load(Ordering::Acquire)
    }

    /// Forget all registrations.
    pub fn reset(&self) {
        self.pmtiles.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerCommon;

    #[test]
    fn test_registration_is_idempotent() {
        let registry = ProtocolRegistry::new();
        let mut calls = 0;
        assert!(registry.ensure_pmtiles(|| calls += 1));
        assert!(!registry.ensure_pmtiles(|| calls += 1));
        assert_eq!(calls, 1);
        assert!(registry.is_pmtiles_registered());

        registry.reset();
        assert!(!registry.is_pmtiles_registered());
        assert!(registry.ensure_pmtiles(|| calls += 1));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_source_uses_pmtiles_scheme() {
        let cfg = PmtilesLayerConfig {
            common: LayerCommon::new("archive"),
            url: "https://data.example.com/world.pmtiles".to_string(),
            tile_size: Some(512),
        };
        let handoff = create_pmtiles_source(&cfg).unwrap();
        assert_eq!(
            handoff.source.url.as_deref(),
            Some("pmtiles://https://data.example.com/world.pmtiles")
        );
        assert!(handoff.source.tiles.is_none());
        assert_eq!(handoff.source.tile_size, 512);
        assert_eq!(pmtiles_url("pmtiles://x"), "pmtiles://x");
    }
}
