//! Config source preparation.
//!
//! Every input document (the merged target attributes, each library file,
//! the application file) is normalized into a [`ConfigSource`]: namespaced
//! settings, namespaced overrides, and whatever top-level keys remain.

use std::collections::BTreeSet;
use std::path::Path;

use indexmap::IndexMap;

use mbconf_core::error::CoreError;
use mbconf_core::naming::{check_name, NameKind};
use mbconf_core::{canonical_name, decode_json_file, ConfigValue, Diagnostics, Document, WarningKind};

use crate::error::{ConfigError, Result};
use crate::schema::{validate_app, validate_library};
use crate::setting::{split_modifier, ConfigSetting, Override};

/// Namespace of the merged target attributes.
pub const TARGET_NAMESPACE: &str = "target";
/// Default namespace of the application document.
pub const APP_NAMESPACE: &str = "app";
/// Wildcard `target_overrides` key that always applies.
pub const ANY_TARGET: &str = "*";

/// A prepared config source, ready to be absorbed into a [`crate::Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    /// File path or synthetic name the source came from.
    pub context: String,
    /// Namespace of the source's own settings.
    pub namespace: Option<String>,
    pub settings: Vec<ConfigSetting>,
    pub overrides: Vec<Override>,
    /// Every other top-level key, unchanged.
    pub attributes: Document,
    pub warnings: Diagnostics,
}

/// Normalize one decoded document.
///
/// The document's own `name` wins over `default_namespace`. Entries of
/// `target_overrides` apply when their key is `*` or one of
/// `target_filters`; later matching entries win.
///
/// A `default_namespace` of `app` marks the application document, which may
/// override settings in any namespace whatever `name` it declares.
pub fn prepare(
    context: &str,
    mut document: Document,
    default_namespace: Option<&str>,
    target_filters: &BTreeSet<String>,
) -> Result<ConfigSource> {
    let mut warnings = Diagnostics::new();
    let scope = if default_namespace == Some(APP_NAMESPACE) {
        OverrideScope::Any
    } else {
        OverrideScope::Own
    };

    let declared = match document.shift_remove("name") {
        Some(ConfigValue::String(name)) => Some(name),
        Some(other) => {
            warnings.warn(
                WarningKind::SchemaMismatch,
                format!("Ignoring non-string 'name' ({}) in {context}", other.type_name()),
            );
            None
        }
        None => None,
    };
    let namespace = declared.or_else(|| default_namespace.map(str::to_string)).map(|ns| {
        check_name(context, NameKind::Namespace, &ns, &mut warnings);
        canonical_name(&ns)
    });

    let settings = match document.shift_remove("config") {
        Some(config) => extract_settings(context, namespace.as_deref(), config, &mut warnings)?,
        None => Vec::new(),
    };

    let mut overrides = match document.shift_remove("overrides") {
        Some(ConfigValue::Map(map)) => {
            extract_overrides(context, namespace.as_deref(), scope, map, &mut warnings)?
        }
        Some(other) => {
            warn_not_mapping(context, "overrides", &other, &mut warnings);
            Vec::new()
        }
        None => Vec::new(),
    };

    if let Some(target_overrides) = document.shift_remove("target_overrides") {
        let selected = select_target_overrides(context, target_overrides, target_filters, &mut warnings);
        overrides.extend(extract_overrides(context, namespace.as_deref(), scope, selected, &mut warnings)?);
    }

    Ok(ConfigSource {
        context: context.to_string(),
        namespace,
        settings,
        overrides,
        attributes: document,
        warnings,
    })
}

/// Load, validate, and prepare a library document. Schema failures are fatal.
pub fn from_library_file(path: &Path, target_filters: &BTreeSet<String>) -> Result<ConfigSource> {
    let value = decode_json_file(path)?;
    validate_library(&value, path)?;
    let document = ConfigValue::document_from_json(value).ok_or_else(|| CoreError::NotAnObject {
        path: path.to_path_buf(),
    })?;
    prepare(&path.display().to_string(), document, None, target_filters)
}

/// Load and prepare the application document.
///
/// Historical application documents are loose, so a schema mismatch is
/// only a warning.
pub fn from_app_file(path: &Path, target_filters: &BTreeSet<String>) -> Result<ConfigSource> {
    let value = decode_json_file(path)?;
    let mut schema_warnings = Diagnostics::new();
    if let Err(detail) = validate_app(&value) {
        schema_warnings.warn(
            WarningKind::SchemaMismatch,
            format!(
                "{} failed to validate against the schema. This likely means it contains deprecated \
                 attributes, misspelled attributes, or overrides for things that should not be set in \
                 the application config. Error was: {detail}",
                path.display()
            ),
        );
    }
    let document = ConfigValue::document_from_json(value).ok_or_else(|| CoreError::NotAnObject {
        path: path.to_path_buf(),
    })?;
    let mut source = prepare(
        &path.display().to_string(),
        document,
        Some(APP_NAMESPACE),
        target_filters,
    )?;
    schema_warnings.extend(source.warnings);
    source.warnings = schema_warnings;
    Ok(source)
}

fn extract_settings(
    context: &str,
    namespace: Option<&str>,
    config: ConfigValue,
    warnings: &mut Diagnostics,
) -> Result<Vec<ConfigSetting>> {
    let entries = match config {
        ConfigValue::Map(entries) => entries,
        other => {
            warn_not_mapping(context, "config", &other, warnings);
            return Ok(Vec::new());
        }
    };
    if entries.is_empty() {
        return Ok(Vec::new());
    }
    let namespace = namespace.ok_or_else(|| ConfigError::MissingNamespace {
        context: context.to_string(),
    })?;

    let mut settings = Vec::with_capacity(entries.len());
    for (raw_name, item) in entries {
        if raw_name == "present" {
            warnings.warn(
                WarningKind::LegacySetting,
                format!(
                    "Legacy 'present' entry in config file {context}. This was for the Mbed CLI 1 \
                     build system only and is now ignored."
                ),
            );
            continue;
        }
        check_name(context, NameKind::Setting, &raw_name, warnings);
        let name = canonical_name(&raw_name);
        tracing::debug!("Extracting config setting from '{namespace}': '{name}'='{item}'");

        let setting = match item {
            ConfigValue::Map(mut details) => ConfigSetting {
                namespace: namespace.to_string(),
                name,
                value: details.shift_remove("value").unwrap_or(ConfigValue::Null),
                help: details.get("help").and_then(ConfigValue::as_str).map(str::to_string),
                macro_name: details
                    .get("macro_name")
                    .and_then(ConfigValue::as_str)
                    .map(str::to_string),
                accepted_values: details.get("accepted_values").and_then(ConfigValue::to_set),
                value_min: details.get("value_min").and_then(ConfigValue::as_f64),
                value_max: details.get("value_max").and_then(ConfigValue::as_f64),
            },
            bare => ConfigSetting::new(namespace, name, bare),
        };
        setting.check_value(warnings);
        settings.push(setting);
    }
    Ok(settings)
}

/// Which namespaces a document's overrides may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverrideScope {
    /// Its own namespace and `target`.
    Own,
    /// Anything; only the application document.
    Any,
}

fn extract_overrides(
    context: &str,
    namespace: Option<&str>,
    scope: OverrideScope,
    entries: IndexMap<String, ConfigValue>,
    warnings: &mut Diagnostics,
) -> Result<Vec<Override>> {
    let mut overrides = Vec::with_capacity(entries.len());
    for (raw, value) in entries {
        let (override_namespace, raw_name) = match raw.split_once('.') {
            Some((ns, name)) => (canonical_name(ns), name),
            None => match namespace {
                Some(ns) => (ns.to_string(), raw.as_str()),
                None => {
                    return Err(ConfigError::MissingNamespace {
                        context: context.to_string(),
                    })
                }
            },
        };

        // Target attributes are spelled with underscores by convention.
        if override_namespace != TARGET_NAMESPACE {
            let (base, _) = split_modifier(raw_name);
            check_name(context, NameKind::Setting, base, warnings);
        }
        let ov = Override::parse(override_namespace, raw_name, value);

        if let (Some(own), OverrideScope::Own) = (namespace, scope) {
            if ov.namespace != own && ov.namespace != TARGET_NAMESPACE {
                return Err(ConfigError::InvalidOverride {
                    context: context.to_string(),
                    namespace: own.to_string(),
                    override_namespace: ov.namespace,
                    name: ov.name,
                });
            }
        }
        tracing::debug!("Extracted override {}={} from {context}", ov.qualified_name(), ov.value);
        overrides.push(ov);
    }
    Ok(overrides)
}

fn select_target_overrides(
    context: &str,
    target_overrides: ConfigValue,
    target_filters: &BTreeSet<String>,
    warnings: &mut Diagnostics,
) -> IndexMap<String, ConfigValue> {
    let mut selected = IndexMap::new();
    let by_label = match target_overrides {
        ConfigValue::Map(by_label) => by_label,
        other => {
            warn_not_mapping(context, "target_overrides", &other, warnings);
            return selected;
        }
    };
    for (label, entries) in by_label {
        if label != ANY_TARGET && !target_filters.contains(&label) {
            continue;
        }
        match entries {
            ConfigValue::Map(entries) => selected.extend(entries),
            other => warn_not_mapping(context, &format!("target_overrides.{label}"), &other, warnings),
        }
    }
    selected
}

fn warn_not_mapping(context: &str, key: &str, value: &ConfigValue, warnings: &mut Diagnostics) {
    warnings.warn(
        WarningKind::SchemaMismatch,
        format!("'{key}' in {context} is a {}, expected a mapping; ignoring it", value.type_name()),
    );
}
