//! Canonical spelling of setting and namespace names.
//!
//! Names are lower-case skewer-case: `MY_Setting` becomes `my-setting`.
//! Periods are left alone but flagged, since they collide with the
//! `namespace.name` separator.

use std::fmt;

use crate::diagnostics::{Diagnostics, WarningKind};

/// Canonicalize a setting or namespace name.
pub fn canonical_name(name: &str) -> String {
    name.to_lowercase().replace('_', "-")
}

/// Which kind of name is being checked, for warning text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Setting,
    Namespace,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameKind::Setting => write!(f, "Config setting"),
            NameKind::Namespace => write!(f, "Config namespace"),
        }
    }
}

/// Warn about every way `name` deviates from the recommended style.
///
/// `context` names the file (or synthetic source) the name came from.
pub fn check_name(context: &str, kind: NameKind, name: &str, diags: &mut Diagnostics) {
    if name.to_lowercase() != name {
        diags.warn(
            WarningKind::NonCanonicalName,
            format!(
                "{kind} '{name}' in {context} contains uppercase letters. This style is not recommended."
            ),
        );
    }
    if name.contains('.') {
        diags.warn(
            WarningKind::NonCanonicalName,
            format!(
                "{kind} '{name}' in {context} contains a period. This style is not recommended as it may cause confusion with the config namespace name."
            ),
        );
    }
    if name.contains('_') {
        diags.warn(
            WarningKind::NonCanonicalName,
            format!(
                "{kind} '{name}' in {context} contains an underscore. Names should be in skewer-case; underscores are replaced by hyphens."
            ),
        );
    }
}
