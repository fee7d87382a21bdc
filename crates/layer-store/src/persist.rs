//! Per-kind field mapping and the save/restore pipeline.
//!
//! Restoring runs: object check, version gate, type gate, migration, field
//! validation, reconstruction. Every gate short-circuits.

use serde_json::{Map, Value};
use tile_common::{TileMatrix, WmsVersion};
use tile_protocol::{
    CapabilitiesWmts, EsriLayerConfig, ExplicitWmts, PmtilesLayerConfig, ServiceEndpointConfig,
    WmsLayerConfig, WmtsLayerConfig, WmtsSource, XyzLayerConfig,
};
use tracing::{debug, warn};

use crate::envelope::{
    as_object, check_type, check_version, kinds, new_envelope, read_type, read_version, TYPE_KEY,
};
use crate::error::{ErrorCode, FieldError, PersistenceError, PersistenceWarning};
use crate::fields::{FieldWriter, Fields};
use crate::migration::MigrationRegistry;

/// A layer configuration that can be written to and read from an envelope.
pub trait Persist: Sized {
    /// The `_type` discriminator.
    const KIND: &'static str;

    fn write_fields(&self, out: &mut FieldWriter<'_>);

    fn read_fields(fields: &Fields<'_>) -> Result<Self, FieldError>;
}

/// A restored configuration and whatever was noticed on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Restored<T> {
    pub config: T,
    pub warnings: Vec<PersistenceWarning>,
}

impl<T> Restored<T> {
    /// True when at least one migration step was missing. Callers that need
    /// fully converted records should reject these.
    pub fn has_skipped_migrations(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, PersistenceWarning::SkippedMigration { .. }))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Restored<U> {
        Restored {
            config: f(self.config),
            warnings: self.warnings,
        }
    }
}

/// Serialize `config` into an envelope at the current schema version.
pub fn to_persisted<T: Persist>(config: &T) -> Map<String, Value> {
    let mut map = new_envelope(T::KIND);
    config.write_fields(&mut FieldWriter::new(&mut map));
    map
}

/// Restore a record of kind `T` using the built-in migrations.
pub fn from_persisted<T: Persist>(value: &Value) -> Result<Restored<T>, PersistenceError> {
    from_persisted_with(value, &MigrationRegistry::default())
}

pub fn from_persisted_with<T: Persist>(
    value: &Value,
    registry: &MigrationRegistry,
) -> Result<Restored<T>, PersistenceError> {
    let map = as_object(value)?;
    let version = read_version(map)?;

    let mut warnings = Vec::new();
    if let Some(warning) = check_version(
        version,
        registry.min_supported_version(),
        registry.current_version(),
    )? {
        warn!(kind = T::KIND, %warning, "Restoring record from a newer schema");
        warnings.push(warning);
    }

    check_type(map, T::KIND)?;

    let (migrated, skipped) = registry.migrate(map.clone(), version);
    warnings.extend(skipped);

    let config = T::read_fields(&Fields::new(&migrated))?;
    debug!(
        kind = T::KIND,
        version,
        warnings = warnings.len(),
        "Restored persisted layer"
    );
    Ok(Restored { config, warnings })
}

/// [`to_persisted`] for any protocol.
pub fn persist_endpoint(config: &ServiceEndpointConfig) -> Map<String, Value> {
    match config {
        ServiceEndpointConfig::Wms(c) => to_persisted(c),
        ServiceEndpointConfig::Wmts(c) => to_persisted(c),
        ServiceEndpointConfig::Esri(c) => to_persisted(c),
        ServiceEndpointConfig::Xyz(c) => to_persisted(c),
        ServiceEndpointConfig::Pmtiles(c) => to_persisted(c),
    }
}

/// Restore a record of any kind, dispatching on `_type`.
pub fn restore_any(value: &Value) -> Result<Restored<ServiceEndpointConfig>, PersistenceError> {
    restore_any_with(value, &MigrationRegistry::default())
}

pub fn restore_any_with(
    value: &Value,
    registry: &MigrationRegistry,
) -> Result<Restored<ServiceEndpointConfig>, PersistenceError> {
    let kind = read_type(as_object(value)?)?;
    let restored = match kind {
        kinds::WMS => from_persisted_with(value, registry)?.map(ServiceEndpointConfig::Wms),
        kinds::WMTS => from_persisted_with(value, registry)?.map(ServiceEndpointConfig::Wmts),
        kinds::ESRI => from_persisted_with(value, registry)?.map(ServiceEndpointConfig::Esri),
        kinds::XYZ => from_persisted_with(value, registry)?.map(ServiceEndpointConfig::Xyz),
        kinds::PMTILES => from_persisted_with(value, registry)?.map(ServiceEndpointConfig::Pmtiles),
        other => {
            return Err(FieldError::new(
                TYPE_KEY,
                format!("unknown layer type '{}'", other),
                ErrorCode::InvalidType,
            )
            .into())
        }
    };
    Ok(restored)
}

impl Persist for WmsLayerConfig {
    const KIND: &'static str = kinds::WMS;

    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.common(&self.common)
            .put("baseUrl", self.base_url.as_str())
            .list("layers", &self.layers)
            .list("styles", &self.styles)
            .opt("version", &self.version.map(|v| v.as_str()))
            .opt("crs", &self.crs)
            .opt("format", &self.format)
            .opt("transparent", &self.transparent)
            .opt("tileSize", &self.tile_size)
            .string_map("extraParams", &self.extra_params);
    }

    fn read_fields(fields: &Fields<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            common: fields.common()?,
            base_url: fields.required_url("baseUrl")?,
            layers: fields.required_list("layers")?,
            styles: fields.string_list("styles")?,
            version: fields
                .optional_str("version")
                .as_deref()
                .and_then(WmsVersion::parse),
            crs: fields.optional_str("crs"),
            format: fields.optional_str("format"),
            transparent: fields.optional_bool("transparent"),
            tile_size: fields.optional_positive("tileSize")?,
            extra_params: fields.string_map("extraParams"),
        })
    }
}

const WMTS_MODES: [&str; 2] = ["explicit", "capabilities"];

impl Persist for WmtsLayerConfig {
    const KIND: &'static str = kinds::WMTS;

    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.common(&self.common);
        match &self.source {
            WmtsSource::Explicit(e) => {
                out.put("mode", "explicit")
                    .put("tileUrlTemplate", e.tile_url_template.as_str())
                    .put("matrixSet", e.matrix_set.as_str())
                    .opt("style", &e.style)
                    .string_map("dimensions", &e.dimensions);
                if !e.tile_matrices.is_empty() {
                    let matrices: Vec<Value> = e.tile_matrices.iter().map(matrix_to_value).collect();
                    out.put("tileMatrices", matrices);
                }
            }
            WmtsSource::Capabilities(c) => {
                out.put("mode", "capabilities")
                    .put("capabilitiesUrl", c.capabilities_url.as_str())
                    .put("layerId", c.layer_id.as_str())
                    .opt("matrixSet", &c.matrix_set)
                    .opt("style", &c.style)
                    .opt("format", &c.format)
                    .opt("preferredCrs", &c.preferred_crs)
                    .opt("preferredWellKnownScaleSet", &c.preferred_well_known_scale_set)
                    .string_map("dimensions", &c.dimensions);
            }
        }
    }

    fn read_fields(fields: &Fields<'_>) -> Result<Self, FieldError> {
        let common = fields.common()?;
        let source = match fields.required_enum("mode", &WMTS_MODES)?.as_str() {
            "explicit" => WmtsSource::Explicit(ExplicitWmts {
                tile_url_template: fields.required_url("tileUrlTemplate")?,
                matrix_set: fields.required_str("matrixSet")?,
                tile_matrices: read_matrices(fields)?,
                style: fields.optional_str("style"),
                dimensions: fields.string_map("dimensions"),
            }),
            _ => WmtsSource::Capabilities(CapabilitiesWmts {
                capabilities_url: fields.required_url("capabilitiesUrl")?,
                layer_id: fields.required_str("layerId")?,
                matrix_set: fields.optional_str("matrixSet"),
                style: fields.optional_str("style"),
                format: fields.optional_str("format"),
                preferred_crs: fields.optional_str("preferredCrs"),
                preferred_well_known_scale_set: fields.optional_str("preferredWellKnownScaleSet"),
                dimensions: fields.string_map("dimensions"),
            }),
        };
        Ok(Self { common, source })
    }
}

fn matrix_to_value(m: &TileMatrix) -> Value {
    let mut map = Map::new();
    FieldWriter::new(&mut map)
        .put("identifier", m.identifier.as_str())
        .put("scaleDenominator", m.scale_denominator)
        .put(
            "topLeftCorner",
            vec![m.top_left_corner.0, m.top_left_corner.1],
        )
        .put("tileWidth", m.tile_width)
        .put("tileHeight", m.tile_height)
        .put("matrixWidth", m.matrix_width)
        .put("matrixHeight", m.matrix_height);
    Value::Object(map)
}

fn read_matrices(fields: &Fields<'_>) -> Result<Vec<TileMatrix>, FieldError> {
    let items = match fields.get("tileMatrices") {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(FieldError::new(
                "tileMatrices",
                format!("expected an array of tile matrices, got {}", other),
                ErrorCode::InvalidArray,
            ))
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| -> Result<TileMatrix, FieldError> {
            let path = format!("tileMatrices[{}]", i);
            let obj = item.as_object().ok_or_else(|| {
                FieldError::new(path.as_str(), "expected an object", ErrorCode::InvalidArray)
            })?;
            let m = Fields::nested(obj, &path);
            let corner = match m.get("topLeftCorner") {
                Some(Value::Array(xy)) if xy.len() == 2 => xy[0].as_f64().zip(xy[1].as_f64()),
                _ => None,
            }
            .ok_or_else(|| {
                FieldError::new(
                    format!("{}.topLeftCorner", path),
                    "expected [x, y]",
                    ErrorCode::InvalidArray,
                )
            })?;
            Ok(TileMatrix {
                identifier: m.required_str("identifier")?,
                scale_denominator: m.required_f64("scaleDenominator")?,
                top_left_corner: corner,
                tile_width: m.required_positive("tileWidth")?,
                tile_height: m.required_positive("tileHeight")?,
                matrix_width: m.required_positive("matrixWidth")?,
                matrix_height: m.required_positive("matrixHeight")?,
            })
        })
        .collect()
}

impl Persist for EsriLayerConfig {
    const KIND: &'static str = kinds::ESRI;

    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.common(&self.common)
            .put("serviceUrl", self.service_url.as_str())
            .opt("layerId", &self.layer_id)
            .opt("format", &self.format)
            .opt("transparent", &self.transparent)
            .opt("crs", &self.crs)
            .opt("tileSize", &self.tile_size);
    }

    fn read_fields(fields: &Fields<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            common: fields.common()?,
            service_url: fields.required_url("serviceUrl")?,
            layer_id: fields.optional_str("layerId"),
            format: fields.optional_str("format"),
            transparent: fields.optional_bool("transparent"),
            crs: fields.optional_str("crs"),
            tile_size: fields.optional_positive("tileSize")?,
        })
    }
}

impl Persist for XyzLayerConfig {
    const KIND: &'static str = kinds::XYZ;

    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.common(&self.common)
            .put("urlTemplate", self.url_template.as_str())
            .list("subdomains", &self.subdomains)
            .put("tms", self.tms)
            .opt("tileSize", &self.tile_size);
    }

    fn read_fields(fields: &Fields<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            common: fields.common()?,
            url_template: fields.required_url("urlTemplate")?,
            subdomains: fields.string_list("subdomains")?,
            tms: fields.optional_bool("tms").unwrap_or(false),
            tile_size: fields.optional_positive("tileSize")?,
        })
    }
}

impl Persist for PmtilesLayerConfig {
    const KIND: &'static str = kinds::PMTILES;

    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.common(&self.common)
            .put("url", self.url.as_str())
            .opt("tileSize", &self.tile_size);
    }

    fn read_fields(fields: &Fields<'_>) -> Result<Self, FieldError> {
        Ok(Self {
            common: fields.common()?,
            url: fields.required_url("url")?,
            tile_size: fields.optional_positive("tileSize")?,
        })
    }
}
