//! Config settings and overrides.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use mbconf_core::{canonical_name, ConfigValue, Diagnostics, WarningKind};
use mbconf_targets::classify::{ADD_SUFFIX, REMOVE_SUFFIX};

/// A namespaced configuration setting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSetting {
    pub namespace: String,
    pub name: String,
    pub value: ConfigValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// Overrides the generated macro name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub macro_name: Option<String>,
    /// Values considered valid, compared by their text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_values: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_max: Option<f64>,
}

impl ConfigSetting {
    /// A setting with a bare value and no constraints.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, value: ConfigValue) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            value,
            help: None,
            macro_name: None,
            accepted_values: None,
            value_min: None,
            value_max: None,
        }
    }

    /// `namespace.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// Warn if the value violates a declared constraint.
    ///
    /// Constraints are advisory: the value is kept either way. Bounds only
    /// apply to numeric values.
    pub fn check_value(&self, warnings: &mut Diagnostics) {
        let qualified = self.qualified_name();
        let value = &self.value;

        if let Some(accepted) = &self.accepted_values {
            if !accepted.contains(&value.to_string()) {
                let valid: Vec<&str> = accepted.iter().map(String::as_str).collect();
                warnings.warn(
                    WarningKind::InvalidValue,
                    format!(
                        "Value set for {qualified} ({value}) does not appear to be valid. Valid values are {valid:?}"
                    ),
                );
            }
        }

        let Some(number) = value.as_f64() else {
            return;
        };
        if let Some(max) = self.value_max {
            if number > max {
                warnings.warn(
                    WarningKind::InvalidValue,
                    format!(
                        "Value set for {qualified} ({value}) does not appear to be valid. Cannot be greater than {max}"
                    ),
                );
            }
        }
        if let Some(min) = self.value_min {
            if number < min {
                warnings.warn(
                    WarningKind::InvalidValue,
                    format!(
                        "Value set for {qualified} ({value}) does not appear to be valid. Cannot be less than {min}"
                    ),
                );
            }
        }
    }
}

/// How an override combines with the existing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    /// Replace the value.
    None,
    /// Union into a set value.
    Add,
    /// Remove from a set value.
    Remove,
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::None => Ok(()),
            Modifier::Add => write!(f, "{ADD_SUFFIX}"),
            Modifier::Remove => write!(f, "{REMOVE_SUFFIX}"),
        }
    }
}

/// A namespaced override of a setting or target attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Override {
    pub namespace: String,
    pub name: String,
    pub value: ConfigValue,
    pub modifier: Modifier,
}

impl Override {
    /// Build an override from its raw (un-namespaced) name.
    ///
    /// An `_add`/`_remove` suffix becomes the modifier and the remaining name
    /// is canonicalized.
    pub fn parse(namespace: impl Into<String>, raw_name: &str, value: ConfigValue) -> Self {
        let (base, modifier) = split_modifier(raw_name);
        Self {
            namespace: namespace.into(),
            name: canonical_name(base),
            value,
            modifier,
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}{}", self.namespace, self.name, self.modifier)
    }
}

/// Split an `_add`/`_remove` suffix off `raw_name`.
pub fn split_modifier(raw_name: &str) -> (&str, Modifier) {
    if let Some(base) = raw_name.strip_suffix(ADD_SUFFIX) {
        (base, Modifier::Add)
    } else if let Some(base) = raw_name.strip_suffix(REMOVE_SUFFIX) {
        (base, Modifier::Remove)
    } else {
        (raw_name, Modifier::None)
    }
}
