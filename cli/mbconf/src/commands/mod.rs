//! CLI command implementations.

pub mod config;
pub mod mcu;
pub mod memory_banks;
pub mod target;
