//! Directory traversal, copying and JSON file helpers shared by all tools.

use crate::error::{ErrorCode, PrepError, PrepResult};
use multimer_protocol::to_pretty_json;
use serde::{Serialize, de::DeserializeOwned};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Outcome of [`ensure_dir`]. Both variants mean the directory is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirStatus {
    Created,
    AlreadyExisted,
}

pub fn ensure_dir(path: &Path) -> PrepResult<DirStatus> {
    if path.is_dir() {
        return Ok(DirStatus::AlreadyExisted);
    }
    if path.exists() {
        return Err(PrepError::new(
            ErrorCode::AlreadyExists,
            format!("'{}' exists and is not a directory", path.display()),
        ));
    }
    fs::create_dir_all(path).map_err(|e| {
        PrepError::io(format!(
            "Could not create directory '{}': {e}",
            path.display()
        ))
    })?;
    Ok(DirStatus::Created)
}

fn ensure_parent_dir(path: &Path) -> PrepResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent).map(|_| ()),
        _ => Ok(()),
    }
}

pub fn require_dir(path: &Path, what: &str) -> PrepResult<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(PrepError::missing_input(format!(
            "{what} '{}' is not an existing directory",
            path.display()
        )))
    }
}

pub fn require_file(path: &Path, what: &str) -> PrepResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PrepError::missing_input(format!(
            "{what} '{}' is not an existing file",
            path.display()
        )))
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn has_extension(path: &Path, ext: &str) -> bool {
    ext.is_empty()
        || path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == ext)
}

fn read_dir_entries(dir: &Path) -> PrepResult<Vec<fs::DirEntry>> {
    fs::read_dir(dir)
        .and_then(|entries| entries.collect::<Result<Vec<_>, _>>())
        .map_err(|e| PrepError::io(format!("Could not list directory '{}': {e}", dir.display())))
}

fn collect_files(dir: &Path, ext: &str, out: &mut Vec<PathBuf>) -> PrepResult<()> {
    for entry in read_dir_entries(dir)? {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| {
            PrepError::io(format!("Could not stat '{}': {e}", path.display()))
        })?;
        if file_type.is_dir() {
            collect_files(&path, ext, out)?;
            continue;
        }
        // symlinked directories are listed but not descended into
        if file_type.is_symlink() && path.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if is_hidden(&name.to_string_lossy()) || !has_extension(&path, ext) {
            continue;
        }
        out.push(path);
    }
    Ok(())
}

fn sort_by_path_text(paths: &mut [PathBuf]) {
    paths.sort_by_cached_key(|p| p.to_string_lossy().into_owned());
}

/// Lists all non-hidden files below `root` with extension `ext` (any
/// extension when empty), sorted by full path text.
pub fn traverse_dir_files(root: &Path, ext: &str) -> PrepResult<Vec<PathBuf>> {
    let mut out = vec![];
    collect_files(root, ext, &mut out)?;
    sort_by_path_text(&mut out);
    Ok(out)
}

/// Immediate subdirectories of `root`, sorted.
pub fn list_subdirs(root: &Path) -> PrepResult<Vec<PathBuf>> {
    let mut out = read_dir_entries(root)?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect::<Vec<_>>();
    sort_by_path_text(&mut out);
    Ok(out)
}

/// Copies the tree at `src` to `dst` and returns the number of files copied.
/// Existing files under `dst` are overwritten.
pub fn copy_tree(src: &Path, dst: &Path) -> PrepResult<usize> {
    ensure_dir(dst)?;
    let mut copied = 0;
    for entry in read_dir_entries(src)? {
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if from.is_dir() {
            copied += copy_tree(&from, &to)?;
        } else {
            copy_file(&from, &to)?;
            copied += 1;
        }
    }
    Ok(copied)
}

pub fn copy_file(from: &Path, to: &Path) -> PrepResult<()> {
    fs::copy(from, to).map_err(|e| {
        PrepError::io(format!(
            "Could not copy '{}' to '{}': {e}",
            from.display(),
            to.display()
        ))
    })?;
    Ok(())
}

pub fn remove_tree(path: &Path) -> PrepResult<()> {
    fs::remove_dir_all(path)
        .map_err(|e| PrepError::io(format!("Could not delete '{}': {e}", path.display())))
}

/// File name up to its first `.`, e.g. `7qrb.A.fasta` gives `7qrb`.
pub fn name_before_first_dot(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.split('.').next().map(str::to_string)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> PrepResult<T> {
    require_file(path, "JSON file")?;
    let text = fs::read_to_string(path)
        .map_err(|e| PrepError::io(format!("Could not read '{}': {e}", path.display())))?;
    serde_json::from_str(&text).map_err(|e| {
        PrepError::invalid_input(format!("Could not parse JSON '{}': {e}", path.display()))
    })
}

/// Writes `value` as four-space indented JSON, creating parent directories.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> PrepResult<()> {
    ensure_parent_dir(path)?;
    let text = to_pretty_json(value).map_err(|e| {
        PrepError::new(
            ErrorCode::InvalidInput,
            format!("Could not serialize JSON for '{}': {e}", path.display()),
        )
    })?;
    fs::write(path, text)
        .map_err(|e| PrepError::io(format!("Could not write '{}': {e}", path.display())))
}
