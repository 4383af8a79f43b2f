//! Gather files from the command line into uploads
//!
//! Explicit file arguments are always taken. Directories are walked in
//! name order, skipping vendored and build directories, and filtered by
//! the include globs.

use crate::UploadedFile;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

pub const SKIPPED_DIRS: [&str; 8] = [
    ".git",
    "node_modules",
    "target",
    "__pycache__",
    ".venv",
    "venv",
    "dist",
    "build",
];

/// Include globs. Empty means every file.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    patterns: Vec<glob::Pattern>,
}

impl FileFilter {
    pub fn new(include: &[String]) -> Result<Self, glob::PatternError> {
        let patterns = include
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Match against the path relative to the walked root, or the bare name
    pub fn matches(&self, relative: &Path) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let name = relative
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        self.patterns
            .iter()
            .any(|p| p.matches_path(relative) || p.matches(name))
    }
}

/// A file found on disk with the name it is reported under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundFile {
    pub path: PathBuf,
    pub display_name: String,
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| SKIPPED_DIRS.contains(&name))
            .unwrap_or(false)
}

pub fn collect_files(paths: &[PathBuf], filter: &FileFilter) -> Vec<FoundFile> {
    let mut found = Vec::new();

    for root in paths {
        if root.is_file() {
            found.push(FoundFile {
                path: root.clone(),
                display_name: root.to_string_lossy().to_string(),
            });
            continue;
        }
        if !root.is_dir() {
            warn!("Path not found: {}", root.display());
            continue;
        }

        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_skipped_dir(e))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
        {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if !filter.matches(relative) {
                continue;
            }
            found.push(FoundFile {
                path: entry.path().to_path_buf(),
                display_name: relative.to_string_lossy().replace('\\', "/"),
            });
        }
    }

    debug!("Collected {} files", found.len());
    found
}

/// Read every found file. Unreadable files are returned with the error text.
pub fn read_uploads(found: &[FoundFile]) -> (Vec<UploadedFile>, Vec<(String, String)>) {
    let mut uploads = Vec::with_capacity(found.len());
    let mut failures = Vec::new();

    for file in found {
        match std::fs::read(&file.path) {
            Ok(bytes) => uploads.push(UploadedFile::new(file.display_name.clone(), bytes)),
            Err(e) => {
                warn!("Cannot read {}: {}", file.path.display(), e);
                failures.push((file.display_name.clone(), e.to_string()));
            }
        }
    }

    (uploads, failures)
}
