//! Target definitions and the target database.
//!
//! The target hierarchy document maps target names to definitions. Each
//! definition may declare parents through an ordered `inherits` list; the
//! rest of its attributes are kept as loosely-typed values. The database
//! stores definitions in document order and addresses them by [`TargetId`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;

use mbconf_core::{decode_json_file, ConfigValue, Document};

use crate::error::{Result, TargetError};

/// Stable identifier of a target within a [`TargetDatabase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub usize);

/// A single named target definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDefinition {
    /// Target name; also the label it contributes.
    pub name: String,
    /// Parent target names, in declaration order.
    pub inherits: Vec<String>,
    /// Every other attribute, with lists collapsed into sets.
    pub attributes: Document,
}

impl TargetDefinition {
    /// Create a definition with no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inherits: Vec::new(),
            attributes: IndexMap::new(),
        }
    }

    /// Builder: set the parent list.
    pub fn with_inherits<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inherits = parents.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set one attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Targets are public unless they explicitly say `"public": false`.
    pub fn is_public(&self) -> bool {
        self.attributes
            .get("public")
            .and_then(ConfigValue::as_bool)
            .unwrap_or(true)
    }

    /// Parse one definition from its JSON object.
    pub fn from_json(name: &str, value: Value, path: &Path) -> Result<Self> {
        let invalid = |detail: String| TargetError::InvalidDefinition {
            name: name.to_string(),
            path: path.to_path_buf(),
            detail,
        };

        let Value::Object(mut map) = value else {
            return Err(invalid("definition must be an object".into()));
        };

        // `inherits` keeps its declaration order, so it is extracted before the
        // remaining attributes are collapsed into sets.
        let inherits = match map.shift_remove("inherits") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(invalid(format!("'inherits' entries must be strings, got {other}"))),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(Value::String(s)) => vec![s],
            Some(other) => return Err(invalid(format!("'inherits' must be a list, got {other}"))),
        };

        if let Some(public) = map.get("public") {
            if !public.is_boolean() {
                return Err(invalid("'public' must be a boolean".into()));
            }
        }

        let attributes = map
            .into_iter()
            .map(|(k, v)| (k, ConfigValue::from_json(v)))
            .collect();

        Ok(Self {
            name: name.to_string(),
            inherits,
            attributes,
        })
    }
}

/// All known target definitions, addressable by name or [`TargetId`].
#[derive(Debug, Clone, Default)]
pub struct TargetDatabase {
    targets: Vec<TargetDefinition>,
    index: HashMap<String, TargetId>,
    sources: Vec<PathBuf>,
}

impl TargetDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a database from definitions. Later duplicates replace earlier ones.
    pub fn from_definitions<I: IntoIterator<Item = TargetDefinition>>(defs: I) -> Self {
        let mut db = Self::new();
        for def in defs {
            db.insert(def);
        }
        db
    }

    /// Parse a target hierarchy document.
    pub fn from_json(value: Value, path: &Path) -> Result<Self> {
        let mut db = Self::new();
        db.merge_json(value, path)?;
        Ok(db)
    }

    /// Load a target hierarchy document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let mut db = Self::new();
        db.merge_file(path)?;
        Ok(db)
    }

    /// Merge another hierarchy document from disk (e.g. program-specific
    /// custom targets). Definitions with an existing name replace it.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let value = decode_json_file(path)?;
        self.merge_json(value, path)?;
        self.sources.push(path.to_path_buf());
        Ok(())
    }

    fn merge_json(&mut self, value: Value, path: &Path) -> Result<()> {
        let Value::Object(map) = value else {
            return Err(TargetError::InvalidDefinition {
                name: "<root>".into(),
                path: path.to_path_buf(),
                detail: "target hierarchy must be an object keyed by target name".into(),
            });
        };
        for (name, def) in map {
            let def = TargetDefinition::from_json(&name, def, path)?;
            if self.index.contains_key(&name) {
                tracing::debug!("Target {name} redefined by {}", path.display());
            }
            self.insert(def);
        }
        Ok(())
    }

    /// Insert a definition, replacing any existing one with the same name.
    pub fn insert(&mut self, def: TargetDefinition) -> TargetId {
        if let Some(&id) = self.index.get(&def.name) {
            self.targets[id.0] = def;
            return id;
        }
        let id = TargetId(self.targets.len());
        self.index.insert(def.name.clone(), id);
        self.targets.push(def);
        id
    }

    /// Look up a target's identifier by name.
    pub fn id(&self, name: &str) -> Option<TargetId> {
        self.index.get(name).copied()
    }

    /// Look up a definition by name.
    pub fn get(&self, name: &str) -> Option<&TargetDefinition> {
        self.id(name).map(|id| &self.targets[id.0])
    }

    /// Look up a definition by identifier.
    pub fn definition(&self, id: TargetId) -> &TargetDefinition {
        &self.targets[id.0]
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterate over definitions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TargetDefinition> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Files this database was loaded from, in load order.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}
