//! Library config discovery and label filtering.
//!
//! Library documents are found by name anywhere under the search roots,
//! honouring `.mbedignore` files. A directory named `TARGET_X`, `FEATURE_X`
//! or `COMPONENT_X` gates every file below it on `X` being active.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::config::FilterData;
use crate::error::{ConfigError, Result};

/// File names of library config documents.
pub const LIBRARY_FILE_NAMES: [&str; 2] = ["mbed_lib.json", "mbed_lib.json5"];

/// Per-directory ignore file.
pub const IGNORE_FILE_NAME: &str = ".mbedignore";

/// A discovered library document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LibraryFile {
    pub path: PathBuf,
    /// `path` relative to the root it was found under.
    pub relative: PathBuf,
}

struct IgnoreFile {
    dir: PathBuf,
    patterns: Vec<Pattern>,
}

impl IgnoreFile {
    fn load(dir: &Path) -> Option<Self> {
        let path = dir.join(IGNORE_FILE_NAME);
        let text = std::fs::read_to_string(&path).ok()?;
        let patterns = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| match Pattern::new(line.trim_end_matches('/')) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!("Ignoring invalid pattern '{line}' in {}: {e}", path.display());
                    None
                }
            })
            .collect();
        Some(Self {
            dir: dir.to_path_buf(),
            patterns,
        })
    }

    fn ignores(&self, path: &Path) -> bool {
        path.strip_prefix(&self.dir)
            .map(|rel| self.patterns.iter().any(|p| p.matches_path(rel)))
            .unwrap_or(false)
    }
}

/// Find every library document under `roots`, sorted and de-duplicated.
///
/// A root nested inside another root is covered by the outer walk, so the
/// outer root's ignore files also apply below it.
pub fn find_library_files(roots: &[&Path]) -> Result<Vec<LibraryFile>> {
    let mut found = BTreeMap::new();
    for root in outermost_roots(roots) {
        for file in find_under(root)? {
            found.entry(file.path.clone()).or_insert(file);
        }
    }
    Ok(found.into_values().collect())
}

fn outermost_roots<'a>(roots: &[&'a Path]) -> Vec<&'a Path> {
    let resolved: Vec<PathBuf> = roots
        .iter()
        .map(|root| root.canonicalize().unwrap_or_else(|_| root.to_path_buf()))
        .collect();
    roots
        .iter()
        .enumerate()
        .filter(|&(i, root)| {
            let covering = resolved.iter().enumerate().find(|&(j, other)| {
                j != i && resolved[i].starts_with(other) && (resolved[i] != *other || j < i)
            });
            match covering {
                Some((j, _)) => {
                    tracing::debug!("{} is searched as part of {}", root.display(), roots[j].display());
                    false
                }
                None => true,
            }
        })
        .map(|(_, root)| *root)
        .collect()
}

fn find_under(root: &Path) -> Result<Vec<LibraryFile>> {
    let mut files = Vec::new();
    let mut ignores: Vec<IgnoreFile> = Vec::new();
    let mut walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|source| ConfigError::Discovery {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        if ignores.iter().any(|ig| ig.ignores(path)) {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        if entry.file_type().is_dir() {
            ignores.extend(IgnoreFile::load(path));
            continue;
        }

        let is_library = entry
            .file_name()
            .to_str()
            .is_some_and(|name| LIBRARY_FILE_NAMES.iter().any(|n| *n == name));
        if is_library {
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            files.push(LibraryFile {
                path: path.to_path_buf(),
                relative,
            });
        }
    }

    tracing::debug!("Found {} library config file(s) under {}", files.len(), root.display());
    Ok(files)
}

/// A directory-prefix gate: `PREFIX_X` segments require `X` to be active.
#[derive(Debug, Clone)]
pub struct LabelFilter<'a> {
    prefix: &'static str,
    labels: &'a BTreeSet<String>,
}

impl<'a> LabelFilter<'a> {
    pub fn new(prefix: &'static str, labels: &'a BTreeSet<String>) -> Self {
        Self { prefix, labels }
    }

    /// Whether every gated segment of `path` names an active label.
    pub fn accepts(&self, path: &Path) -> bool {
        path.components().all(|component| {
            let Some(segment) = component.as_os_str().to_str() else {
                return true;
            };
            match segment
                .strip_prefix(self.prefix)
                .and_then(|rest| rest.strip_prefix('_'))
            {
                Some(label) => self.labels.contains(label),
                None => true,
            }
        })
    }
}

/// Keep only the files whose gated directories are all active.
pub fn filter_files(files: Vec<LibraryFile>, filter: &FilterData) -> Vec<LibraryFile> {
    let filters = [
        LabelFilter::new("TARGET", &filter.labels),
        LabelFilter::new("FEATURE", &filter.features),
        LabelFilter::new("COMPONENT", &filter.components),
    ];
    files
        .into_iter()
        .filter(|file| {
            let keep = filters.iter().all(|f| f.accepts(&file.relative));
            if !keep {
                tracing::debug!("Skipping {}: gated by inactive label", file.path.display());
            }
            keep
        })
        .collect()
}
