//! MCU description database.
//!
//! Maps a device name to its description; only the `memories` section is
//! consumed here. The database is opened from an explicit path.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use mbconf_core::{decode_json_file, ConfigValue, Document};
use mbconf_targets::{TargetAttributes, TargetDatabase};

use crate::error::{ConfigError, Result};

/// One device's description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct McuDescription {
    /// Memory banks keyed by bank name.
    pub memories: Document,
}

/// All MCU descriptions, keyed by device name.
#[derive(Debug, Clone, Default)]
pub struct McuDescriptions {
    path: PathBuf,
    devices: IndexMap<String, McuDescription>,
}

impl McuDescriptions {
    /// Load the database from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let value = decode_json_file(path)?;
        let invalid = |detail: String| ConfigError::InvalidMcuDescriptions {
            path: path.to_path_buf(),
            detail,
        };
        let document = ConfigValue::document_from_json(value)
            .ok_or_else(|| invalid("top level must be an object keyed by device name".into()))?;

        let mut devices = IndexMap::with_capacity(document.len());
        for (device, description) in document {
            let ConfigValue::Map(mut fields) = description else {
                return Err(invalid(format!("description of {device} must be an object")));
            };
            let memories = match fields.shift_remove("memories") {
                Some(ConfigValue::Map(memories)) => memories,
                None => Document::new(),
                Some(other) => {
                    return Err(invalid(format!(
                        "'memories' of {device} must be an object, got a {}",
                        other.type_name()
                    )))
                }
            };
            devices.insert(device, McuDescription { memories });
        }
        tracing::debug!("Loaded {} MCU description(s) from {}", devices.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            devices,
        })
    }

    pub fn from_descriptions(path: impl Into<PathBuf>, devices: IndexMap<String, McuDescription>) -> Self {
        Self {
            path: path.into(),
            devices,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, device: &str) -> Option<&McuDescription> {
        self.devices.get(device)
    }

    /// Look up a device, failing if it is not described.
    pub fn require(&self, device: &str) -> Result<&McuDescription> {
        self.get(device).ok_or_else(|| ConfigError::UnknownDevice {
            device: device.to_string(),
            path: self.path.clone(),
        })
    }

    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Described devices that no target names, sorted.
    pub fn unused(&self, targets: &TargetDatabase) -> Vec<String> {
        let used = device_names(targets);
        let mut unused: Vec<String> = self
            .devices()
            .filter(|d| !used.contains(*d))
            .map(str::to_string)
            .collect();
        unused.sort();
        unused
    }

    /// Device names used by targets but absent from the database, sorted.
    pub fn missing(&self, targets: &TargetDatabase) -> Vec<String> {
        device_names(targets)
            .into_iter()
            .filter(|d| !self.devices.contains_key(d))
            .collect()
    }
}

fn device_names(targets: &TargetDatabase) -> BTreeSet<String> {
    targets
        .iter()
        .filter_map(|def| def.attributes.get("device_name").and_then(ConfigValue::as_str))
        .map(str::to_string)
        .collect()
}

/// Import memory banks the target lacks from its device description.
///
/// Banks the target already declares are kept as they are. Targets
/// without a `device_name` are left untouched.
pub fn incorporate_memory_banks(target: &mut TargetAttributes, mcus: &McuDescriptions) -> Result<()> {
    let Some(device) = target.device_name().map(str::to_string) else {
        return Ok(());
    };
    let description = mcus.require(&device)?;

    let banks = target
        .attributes
        .entry("memory_banks".to_string())
        .or_insert_with(|| ConfigValue::Map(Document::new()));
    let Some(banks) = banks.as_map_mut() else {
        return Err(ConfigError::InvalidMemoryBank {
            bank: "memory_banks".into(),
            detail: "the memory_banks section must be an object".into(),
        });
    };
    for (name, bank) in &description.memories {
        if !banks.contains_key(name) {
            tracing::debug!("Importing memory bank {name} from MCU description {device}");
            banks.insert(name.clone(), bank.clone());
        }
    }
    Ok(())
}
