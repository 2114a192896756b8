//! Fully resolved attributes for a single target.

use std::collections::BTreeSet;

use mbconf_core::{ConfigValue, Diagnostics, Document, WarningKind};

use crate::classify::{Classification, NON_INHERITED_ATTRIBUTES};
use crate::core_labels::CoreLabels;
use crate::definition::TargetDatabase;
use crate::error::Result;
use crate::hierarchy::ancestor_definitions;
use crate::merge::{resolve_accumulating, resolve_overriding};

/// Set-valued attributes that are always present in the result.
const DEFAULT_SET_ATTRIBUTES: [&str; 4] = ["extra_labels", "features", "components", "macros"];

/// Options for [`resolve_target`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Permit resolving a target marked `"public": false`.
    pub allow_non_public: bool,
}

/// The flattened attribute set of one target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetAttributes {
    /// The resolved target's name.
    pub name: String,
    /// Every resolved attribute, including the derived `labels`.
    pub attributes: Document,
    /// Advisories raised while resolving.
    pub warnings: Diagnostics,
}

impl TargetAttributes {
    /// Look up a resolved attribute.
    pub fn get(&self, name: &str) -> Option<&ConfigValue> {
        self.attributes.get(name)
    }

    /// The target's filter labels: ancestor names plus core-derived labels.
    pub fn labels(&self) -> BTreeSet<String> {
        self.set("labels")
    }

    /// A set-valued attribute, empty when absent.
    pub fn set(&self, name: &str) -> BTreeSet<String> {
        self.get(name).and_then(ConfigValue::to_set).unwrap_or_default()
    }

    /// The device name used to look up MCU memory descriptions.
    pub fn device_name(&self) -> Option<&str> {
        self.get("device_name").and_then(ConfigValue::as_str)
    }
}

/// Resolve every attribute of `target_name` across its ancestors.
///
/// The result contains overriding and merging attributes (closest ancestor
/// wins), accumulating attributes with all deltas applied, non-inherited
/// attributes copied from the target itself, and `labels`. The target's
/// `overrides` are folded into its `config` section and then dropped.
pub fn resolve_target(
    db: &TargetDatabase,
    target_name: &str,
    options: ResolveOptions,
    core_labels: &CoreLabels,
) -> Result<TargetAttributes> {
    let chain = ancestor_definitions(db, target_name, options.allow_non_public)?;
    let table = Classification::standard();
    tracing::debug!(
        "Resolving {target_name} through {} ancestor(s): {}",
        chain.len(),
        chain.iter().map(|d| d.name.as_str()).collect::<Vec<_>>().join(", ")
    );

    let mut warnings = Diagnostics::new();
    let mut attributes = resolve_overriding(&chain, table);
    attributes.extend(resolve_accumulating(&chain, table, &mut warnings));

    if let Some(own) = chain.first() {
        for name in NON_INHERITED_ATTRIBUTES {
            if let Some(value) = own.attributes.get(name) {
                attributes.insert(name.to_string(), value.clone());
            }
        }
    }

    let mut labels: BTreeSet<String> = chain.iter().map(|def| def.name.clone()).collect();
    if let Some(core) = attributes.get("core").and_then(ConfigValue::as_str) {
        labels.extend(core_labels.labels_for(core));
    }
    attributes.insert("labels".into(), ConfigValue::Set(labels));

    for name in DEFAULT_SET_ATTRIBUTES {
        attributes
            .entry(name.to_string())
            .or_insert_with(|| ConfigValue::Set(BTreeSet::new()));
    }

    apply_config_overrides(&mut attributes, &mut warnings);

    Ok(TargetAttributes {
        name: target_name.to_string(),
        attributes,
        warnings,
    })
}

/// Fold the `overrides` attribute into `config`.
///
/// A mapping-valued setting has its `value` replaced; a bare setting is
/// replaced outright. Overriding an undefined setting is only a warning.
pub fn apply_config_overrides(attributes: &mut Document, warnings: &mut Diagnostics) {
    let Some(overrides) = attributes.shift_remove("overrides") else {
        return;
    };
    let Some(overrides) = overrides.as_map() else {
        warnings.warn(
            WarningKind::SchemaMismatch,
            format!("Target 'overrides' is a {}, expected a mapping; ignoring it", overrides.type_name()),
        );
        return;
    };

    let config = attributes
        .entry("config".to_string())
        .or_insert_with(|| ConfigValue::Map(Default::default()));
    let Some(config) = config.as_map_mut() else {
        warnings.warn(
            WarningKind::SchemaMismatch,
            "Target 'config' is not a mapping; cannot apply target overrides",
        );
        return;
    };

    for (key, value) in overrides {
        match config.get_mut(key) {
            Some(ConfigValue::Map(setting)) => {
                setting.insert("value".into(), value.clone());
            }
            Some(bare) => *bare = value.clone(),
            None => warnings.warn(
                WarningKind::UndefinedOverride,
                format!(
                    "Cannot apply override {key}={value}, there is no config setting defined matching that name."
                ),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::TargetDefinition;
    use crate::error::TargetError;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::Path;

    fn labels(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn resolve(db: &TargetDatabase, name: &str) -> TargetAttributes {
        resolve_target(db, name, ResolveOptions::default(), &CoreLabels::default()).unwrap()
    }

    #[test]
    fn board_inherits_mcu_macros() {
        let db = TargetDatabase::from_json(
            json!({
                "K64F": {"inherits": ["MCU_K64F"]},
                "MCU_K64F": {"macros": ["MCU_K64F"]}
            }),
            Path::new("targets.json"),
        )
        .unwrap();
        let target = resolve(&db, "K64F");
        assert_eq!(target.labels(), labels(&["K64F", "MCU_K64F"]));
        assert_eq!(target.set("macros"), labels(&["MCU_K64F"]));
    }

    #[test]
    fn set_attributes_default_to_empty() {
        let db = TargetDatabase::from_definitions([TargetDefinition::new("A")]);
        let target = resolve(&db, "A");
        for name in DEFAULT_SET_ATTRIBUTES {
            assert_eq!(target.get(name), Some(&ConfigValue::Set(BTreeSet::new())), "{name}");
        }
    }

    #[test]
    fn core_labels_are_added() {
        let db = TargetDatabase::from_definitions([
            TargetDefinition::new("MCU").with_attribute("core", "Cortex-M4"),
            TargetDefinition::new("BOARD").with_inherits(["MCU"]),
        ]);
        let target =
            resolve_target(&db, "BOARD", ResolveOptions::default(), &CoreLabels::standard().unwrap())
                .unwrap();
        let got = target.labels();
        assert!(got.contains("BOARD"));
        assert!(got.contains("MCU"));
        assert!(got.contains("CORTEX_M"));
    }

    #[test]
    fn non_inherited_come_from_target_only() {
        let db = TargetDatabase::from_definitions([
            TargetDefinition::new("MCU")
                .with_attribute("public", false)
                .with_attribute("device_name", "MK64FN1M0xxx12"),
            TargetDefinition::new("BOARD").with_inherits(["MCU"]),
        ]);
        let target = resolve(&db, "BOARD");
        assert!(target.get("public").is_none());
        assert!(target.device_name().is_none());
        assert!(target.get("inherits").is_none());

        let mcu = resolve_target(
            &db,
            "MCU",
            ResolveOptions { allow_non_public: true },
            &CoreLabels::default(),
        )
        .unwrap();
        assert_eq!(mcu.get("public"), Some(&ConfigValue::Bool(false)));
        assert_eq!(mcu.device_name(), Some("MK64FN1M0xxx12"));
    }

    #[test]
    fn non_public_target_is_rejected() {
        let db = TargetDatabase::from_definitions([TargetDefinition::new("MCU").with_attribute("public", false)]);
        let err = resolve_target(&db, "MCU", ResolveOptions::default(), &CoreLabels::default())
            .unwrap_err();
        assert!(matches!(err, TargetError::NonPublic { .. }));
    }

    #[test]
    fn overrides_update_inherited_config() {
        let db = TargetDatabase::from_json(
            json!({
                "MCU": {
                    "config": {
                        "clock-source": {"help": "Clock", "value": "USE_PLL_HSE_EXTC"},
                        "lse": 1
                    }
                },
                "BOARD": {
                    "inherits": ["MCU"],
                    "overrides": {"clock-source": "USE_PLL_HSI", "lse": 0}
                }
            }),
            Path::new("targets.json"),
        )
        .unwrap();
        let target = resolve(&db, "BOARD");
        let config = target.get("config").and_then(ConfigValue::as_map).unwrap();
        assert_eq!(
            config["clock-source"].as_map().unwrap()["value"],
            ConfigValue::from("USE_PLL_HSI")
        );
        assert_eq!(config["lse"], ConfigValue::Int(0));
        assert!(target.get("overrides").is_none());
        assert!(target.warnings.is_empty());
    }

    #[test]
    fn override_of_undefined_setting_warns() {
        let db = TargetDatabase::from_json(
            json!({"A": {"overrides": {"missing": 3}}}),
            Path::new("targets.json"),
        )
        .unwrap();
        let target = resolve(&db, "A");
        assert!(target.warnings.contains(WarningKind::UndefinedOverride));
        let message = &target.warnings.iter().next().unwrap().message;
        assert!(message.contains("missing=3"));
    }

    #[test]
    fn malformed_overrides_are_schema_mismatches() {
        let mut attributes = Document::new();
        attributes.insert("overrides".into(), ConfigValue::Int(5));
        let mut warnings = Diagnostics::new();
        apply_config_overrides(&mut attributes, &mut warnings);
        assert!(warnings.contains(WarningKind::SchemaMismatch));
        assert!(!warnings.contains(WarningKind::UndefinedOverride));

        let mut attributes = Document::new();
        attributes.insert("config".into(), ConfigValue::from("oops"));
        attributes.insert("overrides".into(), ConfigValue::Map(Document::new()));
        let mut warnings = Diagnostics::new();
        apply_config_overrides(&mut attributes, &mut warnings);
        assert!(warnings.contains(WarningKind::SchemaMismatch));
    }

    #[test]
    fn non_list_accumulating_value_is_recorded() {
        let db = TargetDatabase::from_definitions([
            TargetDefinition::new("A").with_attribute("features", true)
        ]);
        let target = resolve(&db, "A");
        assert!(target.warnings.contains(WarningKind::SchemaMismatch));
        assert_eq!(target.set("features"), BTreeSet::new());
    }
}
