//! `mbconf.toml` program manifest.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mbconf_config::ProgramPaths;

pub const MANIFEST_FILE_NAME: &str = "mbconf.toml";

/// Where a program keeps its configuration inputs.
///
/// Every path is optional; missing ones fall back to the conventional
/// layout under the program and OS roots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// The OS source tree (default: `mbed-os`).
    #[serde(default)]
    pub os_root: Option<PathBuf>,
    /// Application config document.
    #[serde(default)]
    pub app_config: Option<PathBuf>,
    /// Target hierarchy document.
    #[serde(default)]
    pub targets_json: Option<PathBuf>,
    /// Program-specific target definitions.
    #[serde(default)]
    pub custom_targets_json: Option<PathBuf>,
    /// MCU description database.
    #[serde(default)]
    pub mcu_descriptions_json: Option<PathBuf>,
    /// Replacement core-label metadata.
    #[serde(default)]
    pub core_labels_json: Option<PathBuf>,
    /// Where generated artifacts go (default: `cmake_build`).
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// Path settings given on the command line; each wins over the manifest.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub program_root: Option<PathBuf>,
    pub os_root: Option<PathBuf>,
    pub app_config: Option<PathBuf>,
    pub targets_json: Option<PathBuf>,
    pub custom_targets_json: Option<PathBuf>,
    pub mcu_descriptions_json: Option<PathBuf>,
}

impl Manifest {
    /// Search upward from `start_dir` for `mbconf.toml`, parse it, and return
    /// it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE_NAME);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: Manifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                tracing::debug!("Using manifest {}", candidate.display());
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing mbconf.toml")
    }

    /// Combine the manifest found in `base` with command-line overrides.
    ///
    /// Relative manifest paths resolve against `base`; relative flag paths
    /// are taken as given.
    pub fn program_paths(&self, base: &Path, flags: PathOverrides) -> ProgramPaths {
        let from_manifest = |p: &Option<PathBuf>| p.as_ref().map(|p| base.join(p));

        let program_root = flags.program_root.unwrap_or_else(|| base.to_path_buf());
        let os_root = flags
            .os_root
            .or_else(|| from_manifest(&self.os_root))
            .unwrap_or_else(|| program_root.join("mbed-os"));

        let mut paths = ProgramPaths::conventional(program_root, os_root);
        if let Some(app) = flags.app_config.or_else(|| from_manifest(&self.app_config)) {
            paths.app_config = Some(app);
        }
        if let Some(targets) = flags.targets_json.or_else(|| from_manifest(&self.targets_json)) {
            paths.targets_json = targets;
        }
        if let Some(custom) = flags
            .custom_targets_json
            .or_else(|| from_manifest(&self.custom_targets_json))
        {
            paths.custom_targets_json = Some(custom);
        }
        if let Some(mcus) = flags
            .mcu_descriptions_json
            .or_else(|| from_manifest(&self.mcu_descriptions_json))
        {
            paths.mcu_descriptions_json = mcus;
        }
        paths.core_labels_json = from_manifest(&self.core_labels_json);
        paths
    }

    /// The artifact directory, resolved against `base`.
    pub fn output_dir(&self, base: &Path) -> PathBuf {
        base.join(self.output_dir.as_deref().unwrap_or(Path::new("cmake_build")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_manifest() {
        let toml_str = r#"
os_root = "../mbed-os"
app_config = "config/mbed_app.json5"
targets_json = "../mbed-os/targets/targets.json5"
custom_targets_json = "custom_targets.json"
mcu_descriptions_json = "../mbed-os/targets/cmsis_mcu_descriptions.json5"
core_labels_json = "targets_metadata.json"
output_dir = "build"
"#;
        let manifest = Manifest::from_str(toml_str).unwrap();
        assert_eq!(manifest.os_root.as_deref(), Some(Path::new("../mbed-os")));
        assert_eq!(manifest.output_dir.as_deref(), Some(Path::new("build")));
    }

    #[test]
    fn parse_empty_manifest() {
        let manifest = Manifest::from_str("").unwrap();
        assert!(manifest.os_root.is_none());
        assert_eq!(manifest.output_dir(Path::new("/p")), Path::new("/p/cmake_build"));
    }

    #[test]
    fn reject_unknown_keys() {
        assert!(Manifest::from_str("os-root = \"x\"").is_err());
        assert!(Manifest::from_str("this is not valid toml [[[").is_err());
    }

    #[test]
    fn paths_resolve_against_manifest_dir() {
        let manifest = Manifest::from_str("os_root = \"os\"\ntargets_json = \"t.json\"").unwrap();
        let paths = manifest.program_paths(Path::new("/prog"), PathOverrides::default());
        assert_eq!(paths.program_root, Path::new("/prog"));
        assert_eq!(paths.os_root, Path::new("/prog/os"));
        assert_eq!(paths.targets_json, Path::new("/prog/t.json"));
        assert_eq!(
            paths.mcu_descriptions_json,
            Path::new("/prog/os/targets/cmsis_mcu_descriptions.json5")
        );
    }

    #[test]
    fn flags_win_over_manifest() {
        let manifest = Manifest::from_str("os_root = \"os\"").unwrap();
        let flags = PathOverrides {
            os_root: Some(PathBuf::from("/elsewhere/os")),
            app_config: Some(PathBuf::from("/elsewhere/app.json")),
            ..Default::default()
        };
        let paths = manifest.program_paths(Path::new("/prog"), flags);
        assert_eq!(paths.os_root, Path::new("/elsewhere/os"));
        assert_eq!(paths.app_config.as_deref(), Some(Path::new("/elsewhere/app.json")));
    }

    #[test]
    fn find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE_NAME), "output_dir = \"out\"\n").unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let (manifest, found_dir) = Manifest::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(manifest.output_dir.as_deref(), Some(Path::new("out")));
        assert_eq!(found_dir, dir.path());
    }
}
