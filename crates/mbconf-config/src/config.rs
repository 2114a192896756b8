//! The assembled configuration.
//!
//! A [`Config`] starts empty, absorbs prepared sources in order, and is
//! read-only once assembly finishes.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use serde::Serialize;

use mbconf_core::value::remove_items;
use mbconf_core::{ConfigValue, Diagnostics, Document, WarningKind};
use mbconf_targets::Classification;

use crate::error::{ConfigError, Result};
use crate::setting::{ConfigSetting, Modifier, Override};
use crate::source::{ConfigSource, TARGET_NAMESPACE};

/// Top-level keys unioned across sources instead of replaced.
const UNION_ATTRIBUTES: [&str; 2] = ["macros", "requires"];

/// Settings, overrides, attributes, and provenance for one target build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Config {
    attributes: Document,
    settings: Vec<ConfigSetting>,
    #[serde(skip)]
    index: HashMap<(String, String), usize>,
    overrides: Vec<Override>,
    json_sources: Vec<PathBuf>,
    warnings: Diagnostics,
}

/// Label sets used to select library files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterData {
    /// Target labels plus `extra_labels`.
    pub labels: BTreeSet<String>,
    pub features: BTreeSet<String>,
    pub components: BTreeSet<String>,
    pub requires: BTreeSet<String>,
}

impl FilterData {
    /// Every label a `target_overrides` key may match.
    pub fn target_filters(&self) -> BTreeSet<String> {
        self.labels
            .iter()
            .chain(&self.features)
            .chain(&self.components)
            .cloned()
            .collect()
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from a single prepared source.
    pub fn from_source(source: ConfigSource) -> Result<Self> {
        let mut config = Self::new();
        config.update(source)?;
        Ok(config)
    }

    /// Absorb a prepared source.
    ///
    /// Settings are added first, then top-level attributes, then overrides,
    /// so a source may override a setting it defines itself.
    pub fn update(&mut self, source: ConfigSource) -> Result<()> {
        let ConfigSource {
            context,
            settings,
            overrides,
            attributes,
            warnings,
            ..
        } = source;
        self.warnings.extend(warnings);

        for setting in settings {
            let key = (setting.namespace.clone(), setting.name.clone());
            if self.index.contains_key(&key) {
                return Err(ConfigError::DuplicateSetting {
                    namespace: setting.namespace,
                    name: setting.name,
                    context,
                });
            }
            self.index.insert(key, self.settings.len());
            self.settings.push(setting);
        }

        for (key, value) in attributes {
            if UNION_ATTRIBUTES.iter().any(|u| *u == key) {
                let mut merged = self.set(&key);
                merged.extend(value.to_set().unwrap_or_default());
                self.attributes.insert(key, ConfigValue::Set(merged));
            } else {
                self.attributes.insert(key, value);
            }
        }

        for ov in overrides {
            self.apply_override(&context, ov);
        }
        Ok(())
    }

    fn apply_override(&mut self, context: &str, ov: Override) {
        let slot = self.index.get(&(ov.namespace.clone(), ov.name.clone())).copied();

        match slot {
            Some(idx) => {
                let setting = &mut self.settings[idx];
                tracing::debug!("Applying override {} from {context}", ov.qualified_name());
                combine(&mut setting.value, &ov, false, &mut self.warnings);
                setting.check_value(&mut self.warnings);
            }
            None if ov.namespace == TARGET_NAMESPACE => {
                let key = ov.name.replace('-', "_");
                let by_name = Classification::standard().removes_by_name(&key);
                tracing::debug!("Applying target attribute override {key} from {context}");
                let slot = self.attributes.entry(key).or_insert(ConfigValue::Null);
                combine(slot, &ov, by_name, &mut self.warnings);
            }
            None => {
                self.warnings.warn(
                    WarningKind::UndefinedOverride,
                    format!(
                        "Attempt to override undefined config parameter {}.{} in {context}",
                        ov.namespace, ov.name
                    ),
                );
            }
        }
        self.overrides.push(ov);
    }

    /// Look up a top-level attribute.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.attributes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Set a top-level attribute, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.attributes.insert(key.into(), value);
    }

    /// A set-valued attribute, empty when absent.
    pub fn set(&self, key: &str) -> BTreeSet<String> {
        self.get(key).and_then(ConfigValue::to_set).unwrap_or_default()
    }

    pub fn attributes(&self) -> &Document {
        &self.attributes
    }

    /// Look up a setting by namespace and name.
    pub fn setting(&self, namespace: &str, name: &str) -> Option<&ConfigSetting> {
        self.index
            .get(&(namespace.to_string(), name.to_string()))
            .map(|&idx| &self.settings[idx])
    }

    /// All settings, in the order they were defined.
    pub fn settings(&self) -> &[ConfigSetting] {
        &self.settings
    }

    /// Every override absorbed, in application order.
    pub fn overrides(&self) -> &[Override] {
        &self.overrides
    }

    /// The accumulated macro set.
    pub fn macros(&self) -> BTreeSet<String> {
        self.set("macros")
    }

    /// Files that contributed to this config.
    pub fn json_sources(&self) -> &[PathBuf] {
        &self.json_sources
    }

    pub fn json_sources_mut(&mut self) -> &mut Vec<PathBuf> {
        &mut self.json_sources
    }

    pub fn warnings(&self) -> &Diagnostics {
        &self.warnings
    }

    pub fn warnings_mut(&mut self) -> &mut Diagnostics {
        &mut self.warnings
    }

    /// Label sets derived from the current attributes.
    pub fn filter_data(&self) -> FilterData {
        let mut labels = self.set("labels");
        labels.extend(self.set("extra_labels"));
        FilterData {
            labels,
            features: self.set("features"),
            components: self.set("components"),
            requires: self.set("requires"),
        }
    }
}

fn combine(slot: &mut ConfigValue, ov: &Override, remove_by_name: bool, warnings: &mut Diagnostics) {
    if ov.modifier == Modifier::None {
        *slot = ov.value.clone();
        return;
    }
    let (Some(mut current), Some(delta)) = (slot.to_set(), ov.value.to_set()) else {
        warnings.warn(
            WarningKind::InvalidValue,
            format!(
                "Cannot apply {} to a {} with a {}; override ignored",
                ov.qualified_name(),
                slot.type_name(),
                ov.value.type_name()
            ),
        );
        return;
    };
    match ov.modifier {
        Modifier::Add => current.extend(delta),
        Modifier::Remove => remove_items(&mut current, &delta, remove_by_name),
        Modifier::None => {}
    }
    *slot = ConfigValue::Set(current);
}
