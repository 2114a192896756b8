//! `mbconf memory-banks`: derive bank tables and macros for a target.

use std::path::Path;

use anyhow::{Context, Result};

use mbconf_config::{process_memory_banks, ProgramPaths};

pub fn run(paths: &ProgramPaths, target: &str, output: &Path) -> Result<()> {
    let mut config = super::config::assemble(paths, target)?;
    let report = process_memory_banks(&mut config)
        .with_context(|| format!("processing memory banks for {target}"))?;
    report
        .write_json(output)
        .with_context(|| format!("writing {}", output.display()))?;

    for m in &report.macros {
        println!("{m}");
    }
    eprintln!("Wrote {}", output.display());
    Ok(())
}
