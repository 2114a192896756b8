//! Attribute merging across an ancestor chain.
//!
//! Both functions take the chain closest-first, as produced by
//! [`crate::hierarchy::ancestor_definitions`].

use std::collections::BTreeSet;

use indexmap::IndexMap;

use mbconf_core::value::remove_items;
use mbconf_core::{ConfigValue, Diagnostics, Document, WarningKind};

use crate::classify::{AttributeClass, Classification, Delta};
use crate::definition::TargetDefinition;

/// Resolve overriding and merging attributes.
///
/// For an overriding attribute the first ancestor defining it wins. Merging
/// attributes are unioned key-wise with the closest ancestor winning per key.
/// Accumulating and non-inherited attributes are skipped.
pub fn resolve_overriding(chain: &[&TargetDefinition], table: &Classification) -> Document {
    let mut resolved: Document = IndexMap::new();

    for def in chain {
        for (name, value) in &def.attributes {
            match table.classify(name) {
                AttributeClass::Overriding => {
                    resolved.entry(name.clone()).or_insert_with(|| value.clone());
                }
                AttributeClass::Merging => match (resolved.get_mut(name), value) {
                    (None, _) => {
                        resolved.insert(name.clone(), value.clone());
                    }
                    (Some(ConfigValue::Map(closer)), ConfigValue::Map(farther)) => {
                        for (key, v) in farther {
                            closer.entry(key.clone()).or_insert_with(|| v.clone());
                        }
                    }
                    // A closer non-mapping value shadows the farther one entirely.
                    (Some(_), _) => {}
                },
                AttributeClass::Accumulating(_) | AttributeClass::NonInherited => {}
            }
        }
    }

    resolved
}

/// Resolve every accumulating attribute.
///
/// The base set comes from the closest ancestor with a bare value. Every
/// ancestor's `_add` and `_remove` deltas apply regardless of distance:
/// the result is `(base ∪ adds) − removes`. Attributes not mentioned
/// anywhere in the chain are absent from the result. A non-list value is
/// recorded in `warnings` and contributes nothing.
pub fn resolve_accumulating(
    chain: &[&TargetDefinition],
    table: &Classification,
    warnings: &mut Diagnostics,
) -> Document {
    let mut resolved: Document = IndexMap::new();

    for &attribute in table.accumulating() {
        let mut base: Option<BTreeSet<String>> = None;
        let mut adds = BTreeSet::new();
        let mut removes = BTreeSet::new();
        let mut mentioned = false;

        for def in chain {
            for (name, value) in &def.attributes {
                let Some((base_name, delta)) = table.accumulating_base(name) else {
                    continue;
                };
                if base_name != attribute {
                    continue;
                }
                mentioned = true;
                let items = value.to_set().unwrap_or_else(|| {
                    warnings.warn(
                        WarningKind::SchemaMismatch,
                        format!(
                            "Target {} attribute '{name}' is a {}, expected a list; ignoring it",
                            def.name,
                            value.type_name()
                        ),
                    );
                    BTreeSet::new()
                });
                match delta {
                    Delta::Base => {
                        if base.is_none() {
                            base = Some(items);
                        }
                    }
                    Delta::Add => adds.extend(items),
                    Delta::Remove => removes.extend(items),
                }
            }
        }

        if !mentioned {
            continue;
        }
        let mut set = base.unwrap_or_default();
        set.extend(adds);
        remove_items(&mut set, &removes, table.removes_by_name(attribute));
        resolved.insert(attribute.to_string(), ConfigValue::Set(set));
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn table() -> &'static Classification {
        Classification::standard()
    }

    #[test]
    fn closest_overriding_value_wins() {
        let a = TargetDefinition::new("A").with_attribute("x", "a");
        let b = TargetDefinition::new("B").with_attribute("x", "b").with_attribute("y", "b");
        let c = TargetDefinition::new("C").with_attribute("x", "c").with_attribute("z", "c");
        let resolved = resolve_overriding(&[&a, &b, &c], table());
        assert_eq!(resolved["x"], ConfigValue::from("a"));
        assert_eq!(resolved["y"], ConfigValue::from("b"));
        assert_eq!(resolved["z"], ConfigValue::from("c"));
    }

    #[test]
    fn overriding_skips_other_classes() {
        let a = TargetDefinition::new("A")
            .with_attribute("macros", ConfigValue::set(["M"]))
            .with_attribute("public", false)
            .with_attribute("attribute", "kept");
        let resolved = resolve_overriding(&[&a], table());
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved["attribute"], ConfigValue::from("kept"));
    }

    #[test]
    fn merging_attributes_union_keys() {
        let map = |pairs: &[(&str, &str)]| {
            ConfigValue::Map(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), ConfigValue::from(*v)))
                    .collect(),
            )
        };
        let a = TargetDefinition::new("A").with_attribute("config", map(&[("FOO", "closest")]));
        let b = TargetDefinition::new("B").with_attribute("config", map(&[("FOO", "farther")]));
        let c = TargetDefinition::new("C").with_attribute("config", map(&[("BAR", "kept")]));
        let resolved = resolve_overriding(&[&a, &b, &c], table());
        assert_eq!(resolved["config"], map(&[("FOO", "closest"), ("BAR", "kept")]));
    }

    #[test]
    fn basic_add() {
        let a = TargetDefinition::new("A").with_attribute("other", "something");
        let b = TargetDefinition::new("B").with_attribute("extra_labels_add", ConfigValue::set(["2", "3"]));
        let c = TargetDefinition::new("C").with_attribute("extra_labels", ConfigValue::set(["1"]));
        let resolved = resolve_accumulating(&[&a, &b, &c], table(), &mut Diagnostics::new());
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved["extra_labels"], ConfigValue::set(["1", "2", "3"]));
    }

    #[test]
    fn basic_remove() {
        let b = TargetDefinition::new("B").with_attribute("extra_labels_remove", ConfigValue::set(["2", "3"]));
        let c = TargetDefinition::new("C").with_attribute("extra_labels", ConfigValue::set(["1", "2", "3"]));
        let resolved = resolve_accumulating(&[&b, &c], table(), &mut Diagnostics::new());
        assert_eq!(resolved["extra_labels"], ConfigValue::set(["1"]));
    }

    #[test]
    fn farther_base_does_not_replace_closer_base() {
        let a = TargetDefinition::new("A").with_attribute("extra_labels_add", ConfigValue::set(["2", "3"]));
        let b = TargetDefinition::new("B").with_attribute("macros_remove", ConfigValue::set(["B", "C"]));
        let c = TargetDefinition::new("C").with_attribute("extra_labels", ConfigValue::set(["1"]));
        let d = TargetDefinition::new("D").with_attribute("macros", ConfigValue::set(["A", "B", "C"]));
        let e = TargetDefinition::new("E").with_attribute("macros", ConfigValue::set(Vec::<String>::new()));
        let resolved = resolve_accumulating(&[&a, &b, &c, &d, &e], table(), &mut Diagnostics::new());
        assert_eq!(resolved["extra_labels"], ConfigValue::set(["1", "2", "3"]));
        assert_eq!(resolved["macros"], ConfigValue::set(["A"]));
    }

    #[test]
    fn macro_removal_ignores_payload() {
        let a = TargetDefinition::new("A").with_attribute("macros_remove", ConfigValue::set(["TWO"]));
        let b = TargetDefinition::new("B").with_attribute("macros", ConfigValue::set(["ONE", "TWO=2", "THREE"]));
        let resolved = resolve_accumulating(&[&a, &b], table(), &mut Diagnostics::new());
        assert_eq!(resolved["macros"], ConfigValue::set(["ONE", "THREE"]));
    }

    #[test]
    fn feature_removal_is_exact() {
        let a = TargetDefinition::new("A").with_attribute("features_remove", ConfigValue::set(["TWO"]));
        let b = TargetDefinition::new("B").with_attribute("features", ConfigValue::set(["ONE", "TWO=2"]));
        let resolved = resolve_accumulating(&[&a, &b], table(), &mut Diagnostics::new());
        assert_eq!(resolved["features"], ConfigValue::set(["ONE", "TWO=2"]));
    }

    #[test]
    fn adds_without_base() {
        let a = TargetDefinition::new("A").with_attribute("device_has_add", ConfigValue::set(["SERIAL"]));
        let resolved = resolve_accumulating(&[&a], table(), &mut Diagnostics::new());
        assert_eq!(resolved["device_has"], ConfigValue::set(["SERIAL"]));
    }

    #[test]
    fn same_value_added_twice_appears_once() {
        let a = TargetDefinition::new("A").with_attribute("components_add", ConfigValue::set(["SD"]));
        let b = TargetDefinition::new("B").with_attribute("components_add", ConfigValue::set(["SD"]));
        let resolved = resolve_accumulating(&[&a, &b], table(), &mut Diagnostics::new());
        assert_eq!(resolved["components"], ConfigValue::set(["SD"]));
    }

    #[test]
    fn inputs_are_not_modified() {
        let a = TargetDefinition::new("A").with_attribute("macros_add", ConfigValue::set(["2"]));
        let b = TargetDefinition::new("B").with_attribute("macros", ConfigValue::set(["1"]));
        let before = (a.clone(), b.clone());
        let _ = resolve_accumulating(&[&a, &b], table(), &mut Diagnostics::new());
        assert_eq!((a, b), before);
    }

    #[test]
    fn non_list_value_is_recorded() {
        let a = TargetDefinition::new("A").with_attribute("macros_add", true);
        let b = TargetDefinition::new("B").with_attribute("macros", ConfigValue::set(["1"]));
        let mut warnings = Diagnostics::new();
        let resolved = resolve_accumulating(&[&a, &b], table(), &mut warnings);
        assert_eq!(resolved["macros"], ConfigValue::set(["1"]));
        assert_eq!(warnings.len(), 1);
        assert!(warnings.contains(WarningKind::SchemaMismatch));
    }

    proptest! {
        #[test]
        fn add_remove_independent_of_discovery_order(
            base in proptest::collection::btree_set("B[a-z]{3}", 0..6),
            adds in proptest::collection::btree_set("A[a-z]{3}", 0..6),
            removes in proptest::collection::btree_set("R[a-z]{3}", 0..6),
            split in 0usize..4,
            swap in any::<bool>(),
        ) {
            let mut removes_with_base = removes.clone();
            removes_with_base.extend(base.iter().take(split).cloned());

            let add_def = TargetDefinition::new("ADD")
                .with_attribute("features_add", ConfigValue::Set(adds.clone()));
            let remove_def = TargetDefinition::new("REMOVE")
                .with_attribute("features_remove", ConfigValue::Set(removes_with_base.clone()));
            let base_def = TargetDefinition::new("BASE")
                .with_attribute("features", ConfigValue::Set(base.clone()));

            let chain = if swap {
                vec![&add_def, &remove_def, &base_def]
            } else {
                vec![&remove_def, &add_def, &base_def]
            };
            let resolved = resolve_accumulating(&chain, Classification::standard(), &mut Diagnostics::new());

            let expected: BTreeSet<String> = base
                .union(&adds)
                .filter(|item| !removes_with_base.contains(*item))
                .cloned()
                .collect();
            prop_assert_eq!(&resolved["features"], &ConfigValue::Set(expected));
        }
    }
}
