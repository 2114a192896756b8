//! `mbconf mcu`: cross-check device descriptions against the targets.

use anyhow::{Context, Result};

use mbconf_config::{McuDescriptions, ProgramPaths};

fn load(paths: &ProgramPaths) -> Result<McuDescriptions> {
    McuDescriptions::load(&paths.mcu_descriptions_json)
        .with_context(|| format!("loading {}", paths.mcu_descriptions_json.display()))
}

/// Print described devices that no target names.
pub fn unused(paths: &ProgramPaths) -> Result<()> {
    let targets = paths.load_targets()?;
    let unused = load(paths)?.unused(&targets);
    for device in &unused {
        println!("{device}");
    }
    tracing::info!("{} unused MCU description(s)", unused.len());
    Ok(())
}

/// Print device names targets use but the database lacks.
pub fn missing(paths: &ProgramPaths) -> Result<()> {
    let targets = paths.load_targets()?;
    let missing = load(paths)?.missing(&targets);
    for device in &missing {
        println!("{device}");
    }
    tracing::info!("{} device name(s) missing from the MCU database", missing.len());
    Ok(())
}
