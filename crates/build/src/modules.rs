//! Module discovery for per-language commands.

use std::path::{Path, PathBuf};
use toolsmith_core::{Error, Result};
use walkdir::{DirEntry, WalkDir};

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn walk(root: &Path) -> impl Iterator<Item = Result<DirEntry>> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry))
        .map(|entry| {
            entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                Error::io(e.into(), path, "walk")
            })
        })
}

/// Directories below `root` containing a file named `marker`, sorted.
///
/// Hidden directories are skipped.
///
/// # Errors
///
/// Returns an I/O error if a directory cannot be read.
pub fn find(root: &Path, marker: &str) -> Result<Vec<PathBuf>> {
    let mut modules = Vec::new();
    for entry in walk(root) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.file_name() == marker
            && let Some(dir) = entry.path().parent()
        {
            modules.push(dir.to_path_buf());
        }
    }
    Ok(modules)
}

/// Files below `root` with the given extension, sorted.
///
/// # Errors
///
/// Returns an I/O error if a directory cannot be read.
pub fn files_with_extension(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walk(root) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == extension)
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Whether any `.go` file exists below `dir`.
///
/// # Errors
///
/// Returns an I/O error if a directory cannot be read.
pub fn contains_go_code(dir: &Path) -> Result<bool> {
    for entry in walk(dir) {
        let entry = entry?;
        if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "go") {
            return Ok(true);
        }
    }
    Ok(false)
}
