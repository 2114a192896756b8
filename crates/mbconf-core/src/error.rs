//! Error types for source loading.

use std::path::PathBuf;

/// Errors that can occur while reading and decoding configuration sources.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// I/O error reading a source file.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed strict JSON.
    #[error("failed to decode JSON data in {}: {source}", path.display())]
    Json {
        /// The offending file.
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Malformed JSON5.
    #[error("failed to decode JSON5 data in {}: {source}", path.display())]
    Json5 {
        /// The offending file.
        path: PathBuf,
        #[source]
        source: json5::Error,
    },

    /// The file extension selects no known dialect.
    #[error("unknown JSON file extension for {}", path.display())]
    UnknownExtension {
        /// The file with the unrecognized extension.
        path: PathBuf,
    },

    /// The top level of a document was not an object.
    #[error("{} must contain a JSON object at the top level", path.display())]
    NotAnObject {
        /// The offending file.
        path: PathBuf,
    },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
