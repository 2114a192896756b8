//! JSON source loader.
//!
//! Two dialects are recognized by file extension: strict `.json` and the
//! comment/trailing-comma tolerant `.json5`. Any other extension is a usage
//! error. The file handle never outlives the decode call.

use std::path::Path;

use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::value::{ConfigValue, Document};

/// Dialect of a configuration source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Strict JSON.
    Json,
    /// JSON5: comments, trailing commas, unquoted keys.
    Json5,
}

impl SourceFormat {
    /// Select the dialect from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(SourceFormat::Json),
            Some("json5") => Ok(SourceFormat::Json5),
            _ => Err(CoreError::UnknownExtension {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Decode a configuration file into a generic JSON value.
pub fn decode_json_file(path: &Path) -> Result<Value> {
    let format = SourceFormat::from_path(path)?;
    tracing::debug!("Loading JSON file {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_str(&text, format, path)
}

/// Decode already-read text. `path` is used only for error context.
pub fn decode_str(text: &str, format: SourceFormat, path: &Path) -> Result<Value> {
    match format {
        SourceFormat::Json => serde_json::from_str(text).map_err(|source| CoreError::Json {
            path: path.to_path_buf(),
            source,
        }),
        SourceFormat::Json5 => json5::from_str(text).map_err(|source| CoreError::Json5 {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Decode a configuration file whose top level must be an object.
pub fn decode_document(path: &Path) -> Result<Document> {
    let value = decode_json_file(path)?;
    ConfigValue::document_from_json(value).ok_or_else(|| CoreError::NotAnObject {
        path: path.to_path_buf(),
    })
}
