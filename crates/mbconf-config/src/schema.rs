//! Document schemas.
//!
//! Library documents must match [`LibraryDocument`] exactly; any mismatch is
//! fatal. Application documents are checked against [`AppDocument`] but a
//! mismatch only produces a warning.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ConfigError, Result};

/// A config entry: either a bare value or a details object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SettingEntry {
    Details(SettingDetails),
    Bare(Value),
}

/// The long form of a config entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingDetails {
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub macro_name: Option<String>,
    #[serde(default)]
    pub accepted_values: Option<Vec<Value>>,
    #[serde(default)]
    pub value_min: Option<f64>,
    #[serde(default)]
    pub value_max: Option<f64>,
}

/// Schema of an `mbed_lib.json(5)` document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryDocument {
    pub name: String,
    #[serde(default)]
    pub config: IndexMap<String, SettingEntry>,
    #[serde(default)]
    pub macros: Vec<String>,
    #[serde(default)]
    pub overrides: IndexMap<String, Value>,
    #[serde(default)]
    pub target_overrides: IndexMap<String, IndexMap<String, Value>>,
    #[serde(default)]
    pub requires: Vec<String>,
}

/// Schema of an `mbed_app.json(5)` document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artifact_name: Option<String>,
    #[serde(default)]
    pub config: IndexMap<String, SettingEntry>,
    #[serde(default)]
    pub macros: Vec<String>,
    #[serde(default)]
    pub overrides: IndexMap<String, Value>,
    #[serde(default)]
    pub target_overrides: IndexMap<String, IndexMap<String, Value>>,
    #[serde(default)]
    pub requires: Vec<String>,
}

/// Validate a decoded library document.
pub fn validate_library(value: &Value, path: &Path) -> Result<LibraryDocument> {
    let schema_error = |detail: String| ConfigError::Schema {
        path: path.to_path_buf(),
        detail,
    };
    let doc: LibraryDocument =
        serde_json::from_value(value.clone()).map_err(|e| schema_error(e.to_string()))?;
    check_entries(&doc.config).map_err(schema_error)?;
    Ok(doc)
}

/// Validate a decoded application document, returning the mismatch text.
pub fn validate_app(value: &Value) -> std::result::Result<AppDocument, String> {
    let doc: AppDocument = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
    check_entries(&doc.config)?;
    Ok(doc)
}

// An object that fails the details schema falls through to `Bare`; reject it.
fn check_entries(config: &IndexMap<String, SettingEntry>) -> std::result::Result<(), String> {
    for (name, entry) in config {
        if let SettingEntry::Bare(Value::Object(_)) = entry {
            return Err(format!(
                "config entry '{name}' is an object but not a valid setting description"
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn library_document_accepts_both_entry_forms() {
        let doc = validate_library(
            &json!({
                "name": "events",
                "config": {
                    "shared-stacksize": {"help": "Stack size", "value": 2048, "value_min": 0},
                    "use-lowpower-timer-ticker": false
                },
                "target_overrides": {"*": {"shared-stacksize": 1024}}
            }),
            Path::new("mbed_lib.json"),
        )
        .unwrap();
        assert_eq!(doc.name, "events");
        assert!(matches!(doc.config["shared-stacksize"], SettingEntry::Details(_)));
        assert!(matches!(doc.config["use-lowpower-timer-ticker"], SettingEntry::Bare(_)));
    }

    #[test]
    fn library_requires_name() {
        let err = validate_library(&json!({"config": {}}), Path::new("lib/mbed_lib.json")).unwrap_err();
        assert!(err.to_string().contains("lib/mbed_lib.json"));
    }

    #[test]
    fn library_rejects_unknown_keys() {
        assert!(validate_library(&json!({"name": "x", "flags": []}), Path::new("l.json")).is_err());
    }

    #[test]
    fn library_rejects_misspelled_detail() {
        let err = validate_library(
            &json!({"name": "x", "config": {"a": {"valeu": 1}}}),
            Path::new("l.json"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("'a'"));
    }

    #[test]
    fn app_document_is_looser_but_still_checked() {
        assert!(validate_app(&json!({"artifact_name": "blinky", "target_overrides": {}})).is_ok());
        assert!(validate_app(&json!({"target.c_lib": "small"})).is_err());
    }
}
