//! Target hierarchy traversal.
//!
//! The `inherits` links form a directed graph that may contain diamonds.
//! Ancestors are visited breadth-first, parents in declaration order, and
//! each target is taken from the first path that reaches it.

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::definition::{TargetDatabase, TargetDefinition, TargetId};
use crate::error::{Result, TargetError};

/// Compute the ordered ancestor list for `target_name`, closest first.
///
/// Index 0 is the target itself. Same-distance ancestors are ordered by the
/// declaration order of the `inherits` list that reached them. A target is
/// never revisited, so the walk terminates even on a cyclic graph.
pub fn ancestors(
    db: &TargetDatabase,
    target_name: &str,
    allow_non_public: bool,
) -> Result<Vec<TargetId>> {
    let start = db.id(target_name).ok_or_else(|| TargetError::NotFound {
        name: target_name.to_string(),
    })?;
    if !allow_non_public && !db.definition(start).is_public() {
        return Err(TargetError::NonPublic {
            name: target_name.to_string(),
        });
    }

    let mut order = Vec::new();
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(id) = queue.pop_front() {
        order.push(id);
        let def = db.definition(id);
        for parent in &def.inherits {
            let parent_id = db.id(parent).ok_or_else(|| TargetError::UnknownParent {
                target: def.name.clone(),
                parent: parent.clone(),
            })?;
            if seen.insert(parent_id) {
                queue.push_back(parent_id);
            }
        }
    }

    Ok(order)
}

/// Ancestor definitions for `target_name`, closest first.
pub fn ancestor_definitions<'a>(
    db: &'a TargetDatabase,
    target_name: &str,
    allow_non_public: bool,
) -> Result<Vec<&'a TargetDefinition>> {
    Ok(ancestors(db, target_name, allow_non_public)?
        .into_iter()
        .map(|id| db.definition(id))
        .collect())
}

/// Every ancestor's own name, used as filter labels.
pub fn labels_for_target(db: &TargetDatabase, target_name: &str) -> Result<BTreeSet<String>> {
    Ok(ancestor_definitions(db, target_name, true)?
        .into_iter()
        .map(|def| def.name.clone())
        .collect())
}
