//! Memory bank derivation.
//!
//! Sorts the assembled `memory_banks` into ROM and RAM, applies the user's
//! `memory_bank_config`, and derives the start/size macros for both the
//! device and the configured layout.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;

use mbconf_core::{ConfigValue, Diagnostics, Document, WarningKind};

use crate::config::Config;
use crate::error::{ConfigError, Result};

/// Old top-level memory properties that are no longer processed.
pub const DEPRECATED_MEMORY_PROPERTIES: [&str; 8] = [
    "mbed_rom_start",
    "mbed_rom_size",
    "mbed_ram_start",
    "mbed_ram_size",
    "mbed_rom1_start",
    "mbed_rom1_size",
    "mbed_ram1_start",
    "mbed_ram1_size",
];

/// Properties `memory_bank_config` may change.
const CONFIGURABLE_PROPERTIES: [&str; 2] = ["start", "size"];

/// Attribute the derived macros are stored under.
pub const MEMORY_BANK_MACROS: &str = "memory_bank_macros";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BankKind {
    #[serde(rename = "ROM")]
    Rom,
    #[serde(rename = "RAM")]
    Ram,
}

impl BankKind {
    pub const ALL: [BankKind; 2] = [BankKind::Rom, BankKind::Ram];

    pub fn as_str(self) -> &'static str {
        match self {
            BankKind::Rom => "ROM",
            BankKind::Ram => "RAM",
        }
    }
}

impl fmt::Display for BankKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One memory bank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryBank {
    pub start: u64,
    pub size: u64,
    /// The bank's full description, including `access`.
    #[serde(flatten)]
    pub extra: Document,
}

/// Banks grouped by kind, each group in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BankTable {
    #[serde(rename = "ROM")]
    pub rom: IndexMap<String, MemoryBank>,
    #[serde(rename = "RAM")]
    pub ram: IndexMap<String, MemoryBank>,
}

impl BankTable {
    pub fn banks(&self, kind: BankKind) -> &IndexMap<String, MemoryBank> {
        match kind {
            BankKind::Rom => &self.rom,
            BankKind::Ram => &self.ram,
        }
    }

    fn banks_mut(&mut self, kind: BankKind) -> &mut IndexMap<String, MemoryBank> {
        match kind {
            BankKind::Rom => &mut self.rom,
            BankKind::Ram => &mut self.ram,
        }
    }

    fn locate(&self, name: &str) -> Option<BankKind> {
        BankKind::ALL
            .into_iter()
            .find(|&kind| self.banks(kind).contains_key(name))
    }
}

/// Result of memory bank derivation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryBankReport {
    /// Banks as the device declares them.
    pub memory_banks: BankTable,
    /// Banks after `memory_bank_config` was applied.
    pub configured_memory_banks: BankTable,
    #[serde(skip)]
    pub macros: BTreeSet<String>,
    #[serde(skip)]
    pub warnings: Diagnostics,
}

impl MemoryBankReport {
    /// Write the bank tables as JSON, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(write_error)?;
        tracing::debug!("Wrote memory bank description to {}", path.display());
        Ok(())
    }
}

/// Derive memory bank tables and macros from `config`.
///
/// The macros are also stored back into the config under
/// [`MEMORY_BANK_MACROS`].
pub fn process_memory_banks(config: &mut Config) -> Result<MemoryBankReport> {
    let mut warnings = Diagnostics::new();

    for property in DEPRECATED_MEMORY_PROPERTIES {
        if config.contains(property) {
            warnings.warn(
                WarningKind::DeprecatedProperty,
                format!(
                    "Configuration uses old-style memory bank configuration property '{property}'. \
                     This is deprecated and is not processed anymore, replace it with a \
                     'memory_bank_config' section."
                ),
            );
        }
    }

    let memory_banks = classify_banks(config.get("memory_banks"))?;
    let configured = apply_bank_config(&memory_banks, config.get("memory_bank_config"))?;

    for kind in BankKind::ALL {
        if memory_banks.banks(kind).is_empty() {
            warnings.warn(
                WarningKind::MissingMemoryBanks,
                format!(
                    "No {kind} banks are known to the configuration system! This can cause problems \
                     with features like Mbed Stats and FlashIAPBlockDevice! To fix this, define a \
                     'device_name' property or specify 'memory_banks' in your target JSON."
                ),
            );
        }
    }
    log_summary(&memory_banks, &configured);

    let macros = derive_macros(&memory_banks, &configured);
    config.insert(MEMORY_BANK_MACROS, ConfigValue::Set(macros.clone()));
    config.warnings_mut().extend(warnings.clone());

    Ok(MemoryBankReport {
        memory_banks,
        configured_memory_banks: configured,
        macros,
        warnings,
    })
}

fn classify_banks(section: Option<&ConfigValue>) -> Result<BankTable> {
    let mut table = BankTable::default();
    let Some(section) = section else {
        return Ok(table);
    };
    let Some(section) = section.as_map() else {
        return Err(ConfigError::InvalidMemoryBank {
            bank: "memory_banks".into(),
            detail: format!("section must be an object, got a {}", section.type_name()),
        });
    };

    for (name, data) in section {
        let invalid = |detail: &str| ConfigError::InvalidMemoryBank {
            bank: name.clone(),
            detail: detail.to_string(),
        };
        let fields = data
            .as_map()
            .ok_or_else(|| invalid("must be an object"))?;
        let (Some(access), Some(start), Some(size)) =
            (fields.get("access"), fields.get("start"), fields.get("size"))
        else {
            return Err(invalid("must contain 'access', 'size', and 'start' elements"));
        };
        let (Some(start), Some(size)) = (address(start), address(size)) else {
            return Err(invalid("start and size must be integers"));
        };

        let flag = |key: &str| {
            access
                .as_map()
                .and_then(|a| a.get(key))
                .and_then(ConfigValue::as_bool)
                .unwrap_or(false)
        };
        let kind = if flag("read") && flag("write") {
            BankKind::Ram
        } else if flag("read") && flag("execute") {
            BankKind::Rom
        } else {
            tracing::debug!("Memory bank {name} is neither RAM nor ROM; not classified");
            continue;
        };

        let mut extra = fields.clone();
        extra.shift_remove("start");
        extra.shift_remove("size");
        table
            .banks_mut(kind)
            .insert(name.clone(), MemoryBank { start, size, extra });
    }
    Ok(table)
}

fn apply_bank_config(banks: &BankTable, bank_config: Option<&ConfigValue>) -> Result<BankTable> {
    let mut configured = banks.clone();
    let Some(bank_config) = bank_config else {
        return Ok(configured);
    };
    let Some(bank_config) = bank_config.as_map() else {
        return Err(ConfigError::InvalidMemoryBank {
            bank: "memory_bank_config".into(),
            detail: format!("section must be an object, got a {}", bank_config.type_name()),
        });
    };

    for (name, properties) in bank_config {
        let kind = configured
            .locate(name)
            .ok_or_else(|| ConfigError::UnknownMemoryBank { bank: name.clone() })?;
        let invalid = |detail: String| ConfigError::InvalidMemoryBank {
            bank: name.clone(),
            detail,
        };
        let properties = properties
            .as_map()
            .ok_or_else(|| invalid("memory_bank_config entry must be an object".into()))?;
        let bank = configured
            .banks_mut(kind)
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownMemoryBank { bank: name.clone() })?;

        for (property, value) in properties {
            if !CONFIGURABLE_PROPERTIES.iter().any(|p| *p == property.as_str()) {
                return Err(invalid(
                    "only the size and start properties of a memory bank can be configured in memory_bank_config"
                        .into(),
                ));
            }
            let value = address(value)
                .ok_or_else(|| invalid(format!("configured {property} must be an integer")))?;
            if property == "start" {
                bank.start = value;
            } else {
                bank.size = value;
            }
        }
    }
    Ok(configured)
}

fn address(value: &ConfigValue) -> Option<u64> {
    value.as_i64().and_then(|v| u64::try_from(v).ok())
}

fn derive_macros(banks: &BankTable, configured: &BankTable) -> BTreeSet<String> {
    let mut macros = BTreeSet::new();
    for kind in BankKind::ALL {
        for (index, (name, bank)) in banks.banks(kind).iter().enumerate() {
            let number = if index == 0 { String::new() } else { index.to_string() };
            let tuned = configured.banks(kind).get(name).unwrap_or(bank);

            for (prefix, b) in [("MBED", bank), ("MBED_CONFIGURED", tuned)] {
                macros.insert(format!("{prefix}_{kind}{number}_START=0x{:x}", b.start));
                macros.insert(format!("{prefix}_{kind}{number}_SIZE=0x{:x}", b.size));
                macros.insert(format!("{prefix}_{kind}_BANK_{name}_START=0x{:x}", b.start));
                macros.insert(format!("{prefix}_{kind}_BANK_{name}_SIZE=0x{:x}", b.size));
            }
        }
    }
    macros
}

fn log_summary(banks: &BankTable, configured: &BankTable) {
    tracing::info!("Summary of available memory banks:");
    for kind in BankKind::ALL {
        let group = banks.banks(kind);
        if group.is_empty() {
            continue;
        }
        tracing::info!("Target {kind} banks:");
        for (index, (name, bank)) in group.iter().enumerate() {
            let mut line = format!("{index}. {name}, start addr 0x{:08x}", bank.start);
            let tuned = configured.banks(kind).get(name).unwrap_or(bank);
            if tuned.start != bank.start {
                line.push_str(&format!(" (configured to 0x{:08x})", tuned.start));
            }
            line.push_str(&format!(", size {}", pretty_size(bank.size)));
            if tuned.size != bank.size {
                line.push_str(&format!(" (configured to {})", pretty_size(tuned.size)));
            }
            tracing::info!("{line}");
        }
    }
}

/// Format a size as MiB, kiB, or B, whichever divides it exactly.
pub fn pretty_size(size: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if size >= MIB && size % MIB == 0 {
        format!("{} MiB", size / MIB)
    } else if size >= KIB && size % KIB == 0 {
        format!("{} kiB", size / KIB)
    } else {
        format!("{size} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::source::{prepare, TARGET_NAMESPACE};

    fn config(value: serde_json::Value) -> Config {
        let document = ConfigValue::document_from_json(value).unwrap();
        let source = prepare("merged target JSON", document, Some(TARGET_NAMESPACE), &BTreeSet::new())
            .unwrap();
        Config::from_source(source).unwrap()
    }

    fn rom(start: u64, size: u64) -> serde_json::Value {
        json!({"access": {"read": true, "write": false, "execute": true}, "start": start, "size": size})
    }

    fn ram(start: u64, size: u64) -> serde_json::Value {
        json!({"access": {"read": true, "write": true, "execute": false}, "start": start, "size": size})
    }

    #[test]
    fn configured_rom_size() {
        let mut config = config(json!({
            "memory_banks": {"FLASH": {"access": {"read": true, "execute": true}, "start": 0, "size": 1048576}},
            "memory_bank_config": {"FLASH": {"size": 524288}}
        }));
        let report = process_memory_banks(&mut config).unwrap();
        for expected in [
            "MBED_ROM_START=0x0",
            "MBED_ROM_SIZE=0x100000",
            "MBED_ROM_BANK_FLASH_SIZE=0x100000",
            "MBED_CONFIGURED_ROM_START=0x0",
            "MBED_CONFIGURED_ROM_SIZE=0x80000",
            "MBED_CONFIGURED_ROM_BANK_FLASH_SIZE=0x80000",
        ] {
            assert!(report.macros.contains(expected), "missing {expected}");
        }
        assert_eq!(config.set(MEMORY_BANK_MACROS), report.macros);
        // No RAM bank.
        assert!(report.warnings.contains(WarningKind::MissingMemoryBanks));
    }

    #[test]
    fn banks_are_numbered_per_kind() {
        let mut config = config(json!({
            "memory_banks": {
                "IROM1": rom(0, 0x1000),
                "IRAM1": ram(0x2000_0000, 0x400),
                "IROM2": rom(0x1000, 0x1000),
                "IRAM2": ram(0x3000_0000, 0x400)
            }
        }));
        let report = process_memory_banks(&mut config).unwrap();
        assert!(report.macros.contains("MBED_ROM_START=0x0"));
        assert!(report.macros.contains("MBED_ROM1_START=0x1000"));
        assert!(report.macros.contains("MBED_RAM_START=0x20000000"));
        assert!(report.macros.contains("MBED_RAM1_START=0x30000000"));
        assert!(report.macros.contains("MBED_CONFIGURED_RAM1_SIZE=0x400"));
        assert_eq!(report.macros.len(), 4 * 8);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn unclassified_bank_is_skipped() {
        let mut config = config(json!({
            "memory_banks": {
                "WO": {"access": {"read": false, "write": true}, "start": 0, "size": 4},
                "FLASH": rom(0, 4)
            }
        }));
        let report = process_memory_banks(&mut config).unwrap();
        assert_eq!(report.memory_banks.rom.len(), 1);
        assert!(report.memory_banks.ram.is_empty());
    }

    #[test]
    fn incomplete_bank_is_fatal() {
        let mut config = config(json!({"memory_banks": {"FLASH": {"start": 0, "size": 4}}}));
        let err = process_memory_banks(&mut config).unwrap_err();
        assert!(err.to_string().contains("FLASH"));
    }

    #[test]
    fn non_integer_bank_is_fatal() {
        let mut config = config(json!({
            "memory_banks": {"FLASH": {"access": {"read": true, "execute": true}, "start": "0", "size": 4}}
        }));
        assert!(matches!(
            process_memory_banks(&mut config),
            Err(ConfigError::InvalidMemoryBank { .. })
        ));
    }

    #[test]
    fn configuring_unknown_bank_is_fatal() {
        let mut config = config(json!({
            "memory_banks": {"FLASH": rom(0, 4)},
            "memory_bank_config": {"SRAM": {"size": 2}}
        }));
        assert!(matches!(
            process_memory_banks(&mut config),
            Err(ConfigError::UnknownMemoryBank { .. })
        ));
    }

    #[test]
    fn configuring_access_is_fatal() {
        let mut config = config(json!({
            "memory_banks": {"FLASH": rom(0, 4)},
            "memory_bank_config": {"FLASH": {"access": {"write": true}}}
        }));
        let err = process_memory_banks(&mut config).unwrap_err();
        assert!(err.to_string().contains("only the size and start"));
    }

    #[test]
    fn non_integer_configured_value_is_fatal() {
        let mut config = config(json!({
            "memory_banks": {"FLASH": rom(0, 4)},
            "memory_bank_config": {"FLASH": {"size": 1.5}}
        }));
        let err = process_memory_banks(&mut config).unwrap_err();
        assert!(err.to_string().contains("configured size must be an integer"));
    }

    #[test]
    fn deprecated_properties_warn() {
        let mut config = config(json!({
            "memory_banks": {"FLASH": rom(0, 4), "RAM": ram(8, 4)},
            "mbed_rom_start": "0x0"
        }));
        let report = process_memory_banks(&mut config).unwrap();
        assert!(report.warnings.contains(WarningKind::DeprecatedProperty));
        assert!(config.warnings().contains(WarningKind::DeprecatedProperty));
    }

    #[test]
    fn json_artifact_layout() {
        let mut config = config(json!({
            "memory_banks": {"FLASH": rom(0, 0x100000)},
            "memory_bank_config": {"FLASH": {"size": 0x80000}}
        }));
        let report = process_memory_banks(&mut config).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("memory_banks.json");
        report.write_json(&path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["memory_banks"]["ROM"]["FLASH"]["size"], json!(0x100000));
        assert_eq!(written["configured_memory_banks"]["ROM"]["FLASH"]["size"], json!(0x80000));
        assert_eq!(written["memory_banks"]["ROM"]["FLASH"]["access"]["execute"], json!(true));
        assert_eq!(written["memory_banks"]["RAM"], json!({}));
    }

    #[test]
    fn pretty_sizes() {
        assert_eq!(pretty_size(2 * 1024 * 1024), "2 MiB");
        assert_eq!(pretty_size(64 * 1024), "64 kiB");
        assert_eq!(pretty_size(1536), "1536 B");
        assert_eq!(pretty_size(100), "100 B");
    }
}
