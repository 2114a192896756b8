//! Core-derived labels.
//!
//! A target's `core` attribute (e.g. `Cortex-M4`) implies extra filter
//! labels such as `CORTEX_M` and `LIKE_CORTEX_M4`. The mapping ships with the
//! crate and may be replaced by a caller-supplied metadata file.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::Deserialize;

use mbconf_core::decode_json_file;

use crate::error::{Result, TargetError};

const BUILTIN_METADATA: &str = include_str!("../data/targets_metadata.json");

#[derive(Debug, Deserialize)]
struct Metadata {
    #[serde(rename = "CORE_LABELS")]
    core_labels: HashMap<String, Vec<String>>,
}

/// Lookup table from core name to the labels it implies.
#[derive(Debug, Clone, Default)]
pub struct CoreLabels {
    table: HashMap<String, BTreeSet<String>>,
}

impl CoreLabels {
    /// The table embedded in this crate.
    pub fn standard() -> Result<Self> {
        let metadata: Metadata =
            serde_json::from_str(BUILTIN_METADATA).map_err(|e| TargetError::InvalidMetadata {
                path: "targets_metadata.json".into(),
                detail: e.to_string(),
            })?;
        Ok(Self::from_metadata(metadata))
    }

    /// Load a metadata document from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let value = decode_json_file(path)?;
        let metadata: Metadata =
            serde_json::from_value(value).map_err(|e| TargetError::InvalidMetadata {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        Ok(Self::from_metadata(metadata))
    }

    fn from_metadata(metadata: Metadata) -> Self {
        let table = metadata
            .core_labels
            .into_iter()
            .map(|(core, labels)| (core, labels.into_iter().collect()))
            .collect();
        Self { table }
    }

    /// Labels for `core`; empty for an unknown core.
    pub fn labels_for(&self, core: &str) -> BTreeSet<String> {
        self.table.get(core).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_knows_cortex_m4() {
        let labels = CoreLabels::standard().unwrap().labels_for("Cortex-M4");
        assert!(labels.contains("CORTEX_M"));
        assert!(labels.contains("LIKE_CORTEX_M4"));
        assert!(labels.contains("RTOS_M4_M7"));
    }

    #[test]
    fn unknown_core_has_no_labels() {
        assert!(CoreLabels::standard().unwrap().labels_for("Z80").is_empty());
    }

    #[test]
    fn load_custom_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets_metadata.json");
        std::fs::write(&path, r#"{"CORE_LABELS": {"RISC-V": ["RISCV", "RISCV"]}}"#).unwrap();
        let table = CoreLabels::from_file(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.labels_for("RISC-V"), BTreeSet::from(["RISCV".to_string()]));
    }

    #[test]
    fn malformed_metadata_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("targets_metadata.json");
        std::fs::write(&path, r#"{"CORES": {}}"#).unwrap();
        assert!(matches!(
            CoreLabels::from_file(&path),
            Err(TargetError::InvalidMetadata { .. })
        ));
    }
}
