//! Config assembly for one target and program.
//!
//! The merged target attributes seed the config. Library documents are then
//! selected with the label sets that seed produces and absorbed in path
//! order. The application document is absorbed last, prepared with the same
//! label sets so it cannot change which libraries were selected.

use std::path::{Path, PathBuf};

use mbconf_core::ConfigValue;
use mbconf_targets::{resolve_target, CoreLabels, ResolveOptions, TargetAttributes, TargetDatabase};

use crate::config::Config;
use crate::discover::{filter_files, find_library_files};
use crate::error::Result;
use crate::mcu::{incorporate_memory_banks, McuDescriptions};
use crate::memory_banks::{process_memory_banks, MemoryBankReport};
use crate::source::{from_app_file, from_library_file, prepare, TARGET_NAMESPACE};

/// Context name of the seeded target source.
pub const TARGET_CONTEXT: &str = "merged target JSON";

/// Locations of every input a configuration run reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramPaths {
    /// The application's root directory.
    pub program_root: PathBuf,
    /// The OS source tree.
    pub os_root: PathBuf,
    /// Application config document, if the program has one.
    pub app_config: Option<PathBuf>,
    /// Built-in target hierarchy document.
    pub targets_json: PathBuf,
    /// Program-specific target definitions, if any.
    pub custom_targets_json: Option<PathBuf>,
    /// MCU description database.
    pub mcu_descriptions_json: PathBuf,
    /// Replacement core-label metadata, if any.
    pub core_labels_json: Option<PathBuf>,
}

impl ProgramPaths {
    /// Conventional layout for a program with the OS checked out at `os_root`.
    pub fn conventional(program_root: impl Into<PathBuf>, os_root: impl Into<PathBuf>) -> Self {
        let program_root = program_root.into();
        let os_root = os_root.into();
        let app_config = ["mbed_app.json5", "mbed_app.json"]
            .into_iter()
            .map(|name| program_root.join(name))
            .find(|p| p.is_file());
        let custom_targets_json = ["custom_targets.json5", "custom_targets.json"]
            .into_iter()
            .map(|name| program_root.join(name))
            .find(|p| p.is_file());
        Self {
            app_config,
            custom_targets_json,
            targets_json: os_root.join("targets").join("targets.json5"),
            mcu_descriptions_json: os_root.join("targets").join("cmsis_mcu_descriptions.json5"),
            core_labels_json: None,
            program_root,
            os_root,
        }
    }

    /// Load the target database, merging program-specific targets.
    pub fn load_targets(&self) -> Result<TargetDatabase> {
        let mut db = TargetDatabase::load(&self.targets_json)?;
        if let Some(custom) = self.existing_custom_targets() {
            db.merge_file(custom)?;
        }
        Ok(db)
    }

    /// The core-label table, from the override file or the built-in copy.
    pub fn core_labels(&self) -> Result<CoreLabels> {
        Ok(match &self.core_labels_json {
            Some(path) => CoreLabels::from_file(path)?,
            None => CoreLabels::standard()?,
        })
    }

    fn existing_custom_targets(&self) -> Option<&Path> {
        self.custom_targets_json.as_deref().filter(|p| p.is_file())
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.program_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Resolve `target_name` and import its device's memory banks.
pub fn load_target_attributes(
    paths: &ProgramPaths,
    target_name: &str,
    options: ResolveOptions,
) -> Result<TargetAttributes> {
    let db = paths.load_targets()?;
    let mut target = resolve_target(&db, target_name, options, &paths.core_labels()?)?;
    if target.device_name().is_some() {
        let mcus = McuDescriptions::load(&paths.mcu_descriptions_json)?;
        incorporate_memory_banks(&mut target, &mcus)?;
    }
    Ok(target)
}

/// Assemble the full config for a resolved target.
pub fn assemble_config(target: &TargetAttributes, paths: &ProgramPaths) -> Result<Config> {
    let mut config = Config::new();
    config.warnings_mut().extend(target.warnings.clone());
    let seed = prepare(
        TARGET_CONTEXT,
        target.attributes.clone(),
        Some(TARGET_NAMESPACE),
        &Default::default(),
    )?;
    config.update(seed)?;

    let filter_data = config.filter_data();
    let target_filters = filter_data.target_filters();
    tracing::debug!(
        "Selecting library config with labels {:?}, features {:?}, components {:?}",
        filter_data.labels,
        filter_data.features,
        filter_data.components
    );

    let discovered = find_library_files(&[&paths.program_root, &paths.os_root])?;
    let selected = filter_files(discovered, &filter_data);
    for file in &selected {
        config.update(from_library_file(&file.path, &target_filters)?)?;
    }

    let app_config = paths.app_config.as_deref().filter(|p| p.is_file());
    if let Some(app) = app_config {
        config.update(from_app_file(app, &target_filters)?)?;
    }

    let mut sources: Vec<PathBuf> = selected.into_iter().map(|f| f.path).collect();
    sources.extend(app_config.map(Path::to_path_buf));
    sources.push(paths.targets_json.clone());
    sources.push(paths.mcu_descriptions_json.clone());
    sources.extend(paths.existing_custom_targets().map(Path::to_path_buf));
    let sources: Vec<PathBuf> = sources.iter().map(|p| paths.relative(p)).collect();
    config.json_sources_mut().extend(sources);

    tracing::info!(
        "Assembled config for {}: {} setting(s), {} macro(s), {} source file(s)",
        target.name,
        config.settings().len(),
        config.macros().len(),
        config.json_sources().len()
    );
    Ok(config)
}

/// Resolve, assemble, and derive memory banks in one go.
pub fn generate_config(
    paths: &ProgramPaths,
    target_name: &str,
    options: ResolveOptions,
) -> Result<(Config, MemoryBankReport)> {
    let target = load_target_attributes(paths, target_name, options)?;
    let mut config = assemble_config(&target, paths)?;
    let report = process_memory_banks(&mut config)?;
    Ok((config, report))
}

/// The value of a setting or attribute addressed as `namespace.name`.
///
/// A name without a namespace addresses a top-level attribute.
pub fn lookup<'a>(config: &'a Config, key: &str) -> Option<&'a ConfigValue> {
    match key.split_once('.') {
        Some((namespace, name)) => config.setting(namespace, name).map(|s| &s.value),
        None => config.get(key),
    }
}
