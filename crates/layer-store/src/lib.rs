//! Versioned persistence for raster layer configurations.
//!
//! Records are flat JSON objects tagged with `_version` and `_type`. Older
//! records are migrated forward step by step before their fields are
//! validated and the configuration is rebuilt.

pub mod envelope;
pub mod error;
pub mod fields;
pub mod migration;
pub mod persist;

pub use envelope::{kinds, CURRENT_SCHEMA_VERSION, MIN_SUPPORTED_VERSION};
pub use error::{ErrorCode, FieldError, PersistenceError, PersistenceWarning};
pub use migration::{MigrationRegistry, MigrationStep};
pub use persist::{
    from_persisted, from_persisted_with, persist_endpoint, restore_any, restore_any_with,
    to_persisted, Persist, Restored,
};
