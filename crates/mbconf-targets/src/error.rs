//! Error types for target resolution.

use std::path::PathBuf;

use mbconf_core::CoreError;

/// Errors that can occur while loading or resolving target definitions.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// Source loading error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The requested target is not defined.
    #[error("target attributes for {name} not found")]
    NotFound {
        /// The missing target name.
        name: String,
    },

    /// The requested target is marked non-public.
    #[error(
        "cannot get attributes for {name} because it is marked non-public in targets JSON. \
         This likely means the MCU name was given instead of the board name"
    )]
    NonPublic {
        /// The non-public target name.
        name: String,
    },

    /// A target inherits from a target that does not exist.
    #[error("target {target} inherits from undefined target {parent}")]
    UnknownParent {
        /// The inheriting target.
        target: String,
        /// The undefined parent.
        parent: String,
    },

    /// A target definition has the wrong shape.
    #[error("invalid definition for target {name} in {}: {detail}", path.display())]
    InvalidDefinition {
        /// Target name.
        name: String,
        /// File the definition came from.
        path: PathBuf,
        /// Description of the problem.
        detail: String,
    },

    /// The core-label metadata has the wrong shape.
    #[error("invalid core label metadata in {}: {detail}", path.display())]
    InvalidMetadata {
        /// The metadata file.
        path: PathBuf,
        /// Description of the problem.
        detail: String,
    },
}

/// Result type for target operations.
pub type Result<T> = std::result::Result<T, TargetError>;
