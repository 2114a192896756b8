//! Core value model and source loading for the mbconf configuration engine.
//!
//! Every configuration document (target definitions, library configuration,
//! application configuration) is decoded into the same loosely-typed tree:
//!
//! - **Loader:** strict JSON and the comment-tolerant JSON5 dialect ([`json`])
//! - **Values:** a tagged variant over scalars, strings, string sets and
//!   mappings ([`value`]), where every list is collapsed into a set
//! - **Naming:** canonical skewer-case spelling of setting names ([`naming`])
//! - **Diagnostics:** advisory warnings that never abort a run ([`diagnostics`])

pub mod diagnostics;
pub mod error;
pub mod json;
pub mod naming;
pub mod value;

pub use diagnostics::{Diagnostics, Warning, WarningKind};
pub use error::{CoreError, Result};
pub use json::{decode_document, decode_json_file, SourceFormat};
pub use naming::canonical_name;
pub use value::{ConfigValue, Document};
