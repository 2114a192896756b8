//! `mbconf config`: assemble the full config for a target.

use anyhow::{bail, Context, Result};

use mbconf_config::{assemble_config, load_target_attributes, lookup, Config, ProgramPaths};
use mbconf_targets::ResolveOptions;

pub fn run(paths: &ProgramPaths, target: &str, json: bool, get: Option<&str>) -> Result<()> {
    let config = assemble(paths, target)?;

    if let Some(key) = get {
        match lookup(&config, key) {
            Some(value) => println!("{value}"),
            None => bail!("no setting or attribute named '{key}' in the config for {target}"),
        }
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print_summary(target, &config);
    }
    Ok(())
}

pub(crate) fn assemble(paths: &ProgramPaths, target: &str) -> Result<Config> {
    let attributes = load_target_attributes(paths, target, ResolveOptions::default())
        .with_context(|| format!("resolving target {target}"))?;
    assemble_config(&attributes, paths).with_context(|| format!("assembling config for {target}"))
}

fn print_summary(target: &str, config: &Config) {
    println!("=== Config: {target} ===");
    println!();

    println!("--- Settings ---");
    for setting in config.settings() {
        let name = setting.qualified_name();
        match &setting.macro_name {
            Some(macro_name) => println!("  {name:<45} = {} ({macro_name})", setting.value),
            None => println!("  {name:<45} = {}", setting.value),
        }
    }
    println!();

    println!("--- Macros ---");
    for m in config.macros() {
        println!("  {m}");
    }
    println!();

    println!("--- Sources ---");
    for source in config.json_sources() {
        println!("  {}", source.display());
    }

    let warnings = config.warnings();
    if !warnings.is_empty() {
        println!();
        println!("--- Warnings ({}) ---", warnings.len());
        for warning in warnings {
            println!("  {}", warning.message);
        }
    }
}
