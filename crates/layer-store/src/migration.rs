//! Forward migration of persisted records.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::envelope::{CURRENT_SCHEMA_VERSION, MIN_SUPPORTED_VERSION, VERSION_KEY};
use crate::error::PersistenceWarning;

/// Converts a record from version `n` to `n + 1`. Must not touch `_version`.
pub type MigrationStep = fn(Map<String, Value>) -> Map<String, Value>;

/// Steps keyed by the version they migrate from.
#[derive(Debug, Clone)]
pub struct MigrationRegistry {
    current: u64,
    min_supported: u64,
    steps: BTreeMap<u64, MigrationStep>,
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::new(CURRENT_SCHEMA_VERSION, MIN_SUPPORTED_VERSION)
    }
}

impl MigrationRegistry {
    pub fn new(current: u64, min_supported: u64) -> Self {
        Self {
            current,
            min_supported,
            steps: BTreeMap::new(),
        }
    }

    /// Register the step that migrates records at `from_version`.
    pub fn with_step(mut self, from_version: u64, step: MigrationStep) -> Self {
        self.steps.insert(from_version, step);
        self
    }

    pub fn current_version(&self) -> u64 {
        self.current
    }

    pub fn min_supported_version(&self) -> u64 {
        self.min_supported
    }

    /// Bring `record` from `version` up to the current version.
    ///
    /// A missing step bumps the version anyway and records a
    /// [`PersistenceWarning::SkippedMigration`]. Records at or above the
    /// current version are returned untouched.
    pub fn migrate(
        &self,
        mut record: Map<String, Value>,
        version: u64,
    ) -> (Map<String, Value>, Vec<PersistenceWarning>) {
        let mut warnings = Vec::new();
        let mut version = version;

        while version < self.current {
            match self.steps.get(&version) {
                Some(step) => {
                    debug!(from = version, to = version + 1, "Applying migration");
                    record = step(record);
                }
                None => {
                    warn!(from = version, "No migration registered, skipping");
                    warnings.push(PersistenceWarning::SkippedMigration {
                        from_version: version,
                    });
                }
            }
            version += 1;
            record.insert(VERSION_KEY.to_string(), Value::from(version));
        }

        (record, warnings)
    }
}
