//! Advisory diagnostics.
//!
//! Historically permissive input must stay buildable, so a large class of
//! problems is reported but never fatal. Each warning is logged through
//! `tracing` when it is recorded and kept so callers can inspect it later.

use std::fmt;

use serde::Serialize;

/// Category of an advisory warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// A setting or namespace name is not in canonical skewer-case.
    NonCanonicalName,
    /// The application document does not match its schema.
    SchemaMismatch,
    /// An override names a setting that is not defined anywhere.
    UndefinedOverride,
    /// A value falls outside its declared constraints.
    InvalidValue,
    /// A legacy `present` setting was dropped.
    LegacySetting,
    /// A deprecated top-level property was found and ignored.
    DeprecatedProperty,
    /// No ROM or no RAM banks are known for the device.
    MissingMemoryBanks,
}

/// A single advisory warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// Warning category.
    pub kind: WarningKind,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning: {}", self.message)
    }
}

/// An ordered collection of warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and record a warning.
    pub fn warn(&mut self, kind: WarningKind, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(kind = ?kind, "{message}");
        self.warnings.push(Warning { kind, message });
    }

    /// Append already-logged warnings from another collection.
    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    /// Whether any warning of the given kind was recorded.
    pub fn contains(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    /// Iterate over recorded warnings in order.
    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Warning;
    type IntoIter = std::slice::Iter<'a, Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.warnings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let mut diags = Diagnostics::new();
        diags.warn(WarningKind::InvalidValue, "first");
        diags.warn(WarningKind::LegacySetting, "second");
        let messages: Vec<_> = diags.iter().map(|w| w.message.as_str()).collect();
        assert_eq!(messages, ["first", "second"]);
        assert!(diags.contains(WarningKind::LegacySetting));
        assert!(!diags.contains(WarningKind::SchemaMismatch));
    }

    #[test]
    fn extend_appends() {
        let mut a = Diagnostics::new();
        a.warn(WarningKind::InvalidValue, "a");
        let mut b = Diagnostics::new();
        b.warn(WarningKind::UndefinedOverride, "b");
        a.extend(b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn display_is_prefixed() {
        let w = Warning {
            kind: WarningKind::DeprecatedProperty,
            message: "old property".into(),
        };
        assert_eq!(w.to_string(), "warning: old property");
    }
}
