//! mbconf CLI: target resolution and config assembly for Mbed OS programs.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use manifest::{Manifest, PathOverrides};

#[derive(Parser)]
#[command(name = "mbconf", version, about = "Mbed OS configuration assembly")]
struct Cli {
    /// Log at DEBUG instead of INFO
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    paths: PathArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Input locations; each overrides the corresponding `mbconf.toml` entry.
#[derive(Args)]
struct PathArgs {
    /// Program root (default: the directory holding mbconf.toml, or the current directory)
    #[arg(long, global = true)]
    program_root: Option<PathBuf>,
    /// OS source tree (default: <program-root>/mbed-os)
    #[arg(long, global = true)]
    os_root: Option<PathBuf>,
    /// Application config document
    #[arg(long, global = true)]
    app_config: Option<PathBuf>,
    /// Target hierarchy document
    #[arg(long, global = true)]
    targets_json: Option<PathBuf>,
    /// Program-specific target definitions
    #[arg(long, global = true)]
    custom_targets_json: Option<PathBuf>,
    /// MCU description database
    #[arg(long, global = true)]
    mcu_descriptions_json: Option<PathBuf>,
}

impl From<PathArgs> for PathOverrides {
    fn from(args: PathArgs) -> Self {
        PathOverrides {
            program_root: args.program_root,
            os_root: args.os_root,
            app_config: args.app_config,
            targets_json: args.targets_json,
            custom_targets_json: args.custom_targets_json,
            mcu_descriptions_json: args.mcu_descriptions_json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print a target's resolved attributes as JSON
    Target {
        /// Target name (e.g., K64F)
        name: String,
        /// Allow resolving targets marked non-public
        #[arg(long)]
        allow_non_public: bool,
    },
    /// Assemble and print the full config for a target
    Config {
        /// Target name
        target: String,
        /// Print the assembled config as JSON
        #[arg(long)]
        json: bool,
        /// Print only the value of one `namespace.name` setting or attribute
        #[arg(long)]
        get: Option<String>,
    },
    /// Derive memory bank tables and macros for a target
    MemoryBanks {
        /// Target name
        target: String,
        /// Output file (default: <output-dir>/memory_banks.json)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Cross-check the MCU description database against the targets
    Mcu {
        #[command(subcommand)]
        action: McuAction,
    },
}

#[derive(Subcommand)]
enum McuAction {
    /// List described devices no target uses
    Unused,
    /// List devices targets name but the database lacks
    Missing,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// Log to stderr; stdout carries command output.
fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let (manifest, base) = load_manifest_optional(&cwd)?;
    let manifest = manifest.unwrap_or_default();
    let base = base.unwrap_or(cwd);
    let paths = manifest.program_paths(&base, cli.paths.into());

    match cli.command {
        Commands::Target {
            name,
            allow_non_public,
        } => commands::target::run(&paths, &name, allow_non_public),

        Commands::Config { target, json, get } => {
            commands::config::run(&paths, &target, json, get.as_deref())
        }

        Commands::MemoryBanks { target, output } => {
            let output = output.unwrap_or_else(|| manifest.output_dir(&base).join("memory_banks.json"));
            commands::memory_banks::run(&paths, &target, &output)
        }

        Commands::Mcu { action } => match action {
            McuAction::Unused => commands::mcu::unused(&paths),
            McuAction::Missing => commands::mcu::missing(&paths),
        },
    }
}

/// Try to load a manifest from the current directory upward. Returns (None, None) if not found.
fn load_manifest_optional(cwd: &Path) -> anyhow::Result<(Option<Manifest>, Option<PathBuf>)> {
    match Manifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((Some(manifest), Some(dir))),
        None => Ok((None, None)),
    }
}
