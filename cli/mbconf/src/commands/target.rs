//! `mbconf target`: resolve one target and print its attributes.

use anyhow::{Context, Result};

use mbconf_config::{load_target_attributes, ProgramPaths};
use mbconf_targets::ResolveOptions;

pub fn run(paths: &ProgramPaths, name: &str, allow_non_public: bool) -> Result<()> {
    let options = ResolveOptions { allow_non_public };
    let target = load_target_attributes(paths, name, options)
        .with_context(|| format!("resolving target {name}"))?;

    println!("{}", serde_json::to_string_pretty(&target.attributes)?);
    if !target.warnings.is_empty() {
        eprintln!("{} warning(s) while resolving {name}", target.warnings.len());
    }
    Ok(())
}
