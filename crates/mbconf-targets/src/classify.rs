//! Attribute classification.
//!
//! Every target attribute name falls into exactly one class. The table is
//! fixed and built once; a value's shape never changes its class.

use std::collections::HashSet;
use std::sync::OnceLock;

/// Suffix marking an accumulating delta that adds elements.
pub const ADD_SUFFIX: &str = "_add";
/// Suffix marking an accumulating delta that removes elements.
pub const REMOVE_SUFFIX: &str = "_remove";

/// Attributes whose value is a set built across the whole ancestor chain.
pub const ACCUMULATING_ATTRIBUTES: [&str; 5] =
    ["extra_labels", "macros", "device_has", "features", "components"];

/// Dictionary-valued attributes unioned key-wise, nearest ancestor first.
pub const MERGING_ATTRIBUTES: [&str; 2] = ["config", "overrides"];

/// Attributes taken from the requested target only.
pub const NON_INHERITED_ATTRIBUTES: [&str; 3] = ["inherits", "public", "device_name"];

/// Accumulating attributes whose elements may carry a `NAME=value` payload;
/// removal matches on `NAME`.
pub const NAME_VALUE_ATTRIBUTES: [&str; 1] = ["macros"];

/// How an attribute is resolved across ancestors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeClass {
    /// Closest ancestor wins.
    Overriding,
    /// Base set plus cumulative `_add`/`_remove` deltas.
    Accumulating(Delta),
    /// Dictionary union, nearest ancestor wins per key.
    Merging,
    /// Only the requested target's own value is used.
    NonInherited,
}

/// Which part of an accumulating attribute a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    Base,
    Add,
    Remove,
}

/// The attribute classification table.
#[derive(Debug, Clone)]
pub struct Classification {
    accumulating: Vec<&'static str>,
    merging: HashSet<&'static str>,
    non_inherited: HashSet<&'static str>,
    name_value: HashSet<&'static str>,
}

impl Classification {
    /// The standard table, built on first use.
    pub fn standard() -> &'static Classification {
        static TABLE: OnceLock<Classification> = OnceLock::new();
        TABLE.get_or_init(|| Classification {
            accumulating: ACCUMULATING_ATTRIBUTES.to_vec(),
            merging: MERGING_ATTRIBUTES.into_iter().collect(),
            non_inherited: NON_INHERITED_ATTRIBUTES.into_iter().collect(),
            name_value: NAME_VALUE_ATTRIBUTES.into_iter().collect(),
        })
    }

    /// Classify an attribute name.
    pub fn classify(&self, name: &str) -> AttributeClass {
        if self.non_inherited.contains(name) {
            return AttributeClass::NonInherited;
        }
        if self.merging.contains(name) {
            return AttributeClass::Merging;
        }
        match self.accumulating_base(name) {
            Some((_, delta)) => AttributeClass::Accumulating(delta),
            None => AttributeClass::Overriding,
        }
    }

    /// Split an accumulating attribute name into its base name and delta kind.
    pub fn accumulating_base<'n>(&self, name: &'n str) -> Option<(&'n str, Delta)> {
        let known = |candidate: &str| self.accumulating.iter().any(|a| *a == candidate);
        if known(name) {
            return Some((name, Delta::Base));
        }
        if let Some(base) = name.strip_suffix(ADD_SUFFIX).filter(|b| known(b)) {
            return Some((base, Delta::Add));
        }
        if let Some(base) = name.strip_suffix(REMOVE_SUFFIX).filter(|b| known(b)) {
            return Some((base, Delta::Remove));
        }
        None
    }

    /// Base names of all accumulating attributes, in table order.
    pub fn accumulating(&self) -> &[&'static str] {
        &self.accumulating
    }

    /// Whether removal from this attribute matches on the `NAME` in `NAME=value`.
    pub fn removes_by_name(&self, name: &str) -> bool {
        self.name_value.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_are_disjoint() {
        let table = Classification::standard();
        assert_eq!(table.classify("macros"), AttributeClass::Accumulating(Delta::Base));
        assert_eq!(table.classify("macros_add"), AttributeClass::Accumulating(Delta::Add));
        assert_eq!(
            table.classify("device_has_remove"),
            AttributeClass::Accumulating(Delta::Remove)
        );
        assert_eq!(table.classify("config"), AttributeClass::Merging);
        assert_eq!(table.classify("overrides"), AttributeClass::Merging);
        assert_eq!(table.classify("public"), AttributeClass::NonInherited);
        assert_eq!(table.classify("inherits"), AttributeClass::NonInherited);
        assert_eq!(table.classify("device_name"), AttributeClass::NonInherited);
        assert_eq!(table.classify("core"), AttributeClass::Overriding);
    }

    #[test]
    fn unknown_suffix_is_overriding() {
        let table = Classification::standard();
        assert_eq!(table.classify("core_add"), AttributeClass::Overriding);
        assert_eq!(table.classify("release_versions"), AttributeClass::Overriding);
    }

    #[test]
    fn accumulating_order_is_stable() {
        assert_eq!(
            Classification::standard().accumulating(),
            ["extra_labels", "macros", "device_has", "features", "components"]
        );
    }

    #[test]
    fn only_macros_remove_by_name() {
        let table = Classification::standard();
        assert!(table.removes_by_name("macros"));
        assert!(!table.removes_by_name("features"));
    }
}
