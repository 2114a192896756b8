//! Config assembly error types.

use std::path::PathBuf;

use mbconf_core::CoreError;
use mbconf_targets::TargetError;

/// Errors that abort configuration assembly.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Source loading error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Target resolution error.
    #[error(transparent)]
    Target(#[from] TargetError),

    /// A library document does not match its schema.
    #[error("{} did not validate against the schema for mbed_lib.json5: {detail}", path.display())]
    Schema { path: PathBuf, detail: String },

    /// A library overrides a setting outside its own namespace.
    #[error(
        "it is only possible to override config settings defined in an mbed_lib.json from mbed_app.json. \
         An override was defined by the lib `{namespace}` in {context} that attempts to override \
         `{override_namespace}.{name}`"
    )]
    InvalidOverride {
        /// File or synthetic source declaring the override.
        context: String,
        /// Namespace of the declaring source.
        namespace: String,
        /// Namespace the override tried to reach.
        override_namespace: String,
        /// Setting name.
        name: String,
    },

    /// A source declares settings but has no namespace to put them in.
    #[error("{context} declares config settings but has no 'name' to namespace them")]
    MissingNamespace { context: String },

    /// The same setting is defined twice.
    #[error("config setting {namespace}.{name} in {context} is already defined")]
    DuplicateSetting {
        namespace: String,
        name: String,
        context: String,
    },

    /// The target names a device the MCU database does not describe.
    #[error(
        "target specifies device_name {device} but this device is not listed in {}",
        path.display()
    )]
    UnknownDevice { device: String, path: PathBuf },

    /// The MCU description database has the wrong shape.
    #[error("invalid MCU description database {}: {detail}", path.display())]
    InvalidMcuDescriptions { path: PathBuf, detail: String },

    /// A memory bank description is incomplete or mistyped.
    #[error("memory bank '{bank}': {detail}")]
    InvalidMemoryBank { bank: String, detail: String },

    /// `memory_bank_config` names a bank the device does not have.
    #[error("attempt to configure memory bank {bank} which does not exist for this device")]
    UnknownMemoryBank { bank: String },

    /// Library discovery failed.
    #[error("failed to scan {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Writing an output artifact failed.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
