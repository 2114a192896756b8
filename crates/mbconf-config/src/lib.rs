//! Configuration assembly for mbconf.
//!
//! Turns a resolved target plus the program's library and application
//! documents into one [`Config`], then derives memory bank macros from it.
//!
//! # Pipeline
//!
//! 1. The resolved target seeds the config as the `target` namespace
//! 2. Library documents are discovered, gated by `TARGET_`/`FEATURE_`/
//!    `COMPONENT_` directories, and absorbed in path order
//! 3. The application document is absorbed last
//! 4. Memory banks are classified and turned into macros

pub mod assemble;
pub mod config;
pub mod discover;
pub mod error;
pub mod mcu;
pub mod memory_banks;
pub mod schema;
pub mod setting;
pub mod source;

// Re-exports for convenience.
pub use assemble::{assemble_config, generate_config, load_target_attributes, lookup, ProgramPaths};
pub use config::{Config, FilterData};
pub use discover::{filter_files, find_library_files, LibraryFile};
pub use error::{ConfigError, Result};
pub use mcu::{incorporate_memory_banks, McuDescription, McuDescriptions};
pub use memory_banks::{process_memory_banks, BankKind, BankTable, MemoryBank, MemoryBankReport};
pub use setting::{ConfigSetting, Modifier, Override};
pub use source::{from_app_file, from_library_file, prepare, ConfigSource};
