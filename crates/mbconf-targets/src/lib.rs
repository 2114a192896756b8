//! Target definitions and inheritance resolution for mbconf.
//!
//! Loads the target hierarchy document, walks a target's ancestors, and
//! flattens their attributes into one resolved set.
//!
//! # Resolution
//!
//! Each attribute name belongs to exactly one class:
//! - **Overriding**: the closest ancestor's value wins
//! - **Accumulating**: a base set plus every ancestor's `_add`/`_remove` delta
//! - **Merging**: mappings unioned key-wise, closest ancestor wins per key
//! - **Non-inherited**: taken from the requested target only

pub mod attributes;
pub mod classify;
pub mod core_labels;
pub mod definition;
pub mod error;
pub mod hierarchy;
pub mod merge;

// Re-exports for convenience.
pub use attributes::{apply_config_overrides, resolve_target, ResolveOptions, TargetAttributes};
pub use classify::{AttributeClass, Classification, Delta};
pub use core_labels::CoreLabels;
pub use definition::{TargetDatabase, TargetDefinition, TargetId};
pub use error::{Result, TargetError};
pub use hierarchy::{ancestor_definitions, ancestors, labels_for_target};
pub use merge::{resolve_accumulating, resolve_overriding};
