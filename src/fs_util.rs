use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::error::RetrieveError;

pub const DEFAULT_FILE_MODE: u32 = 0o775;

/// BaseMount bookkeeping entries (`.id.*`, dotfiles) are never sequencing data.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.contains(".id.")
}

/// Visible entries of `dir`, sorted by path. A missing directory yields none.
pub fn list_entries(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, RetrieveError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = dir
        .read_dir_utf8()
        .map_err(|err| RetrieveError::Filesystem(format!("read dir {dir}: {err}")))?;
    let mut items = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| RetrieveError::Filesystem(err.to_string()))?;
        if is_hidden(entry.file_name()) {
            continue;
        }
        items.push(entry.path().to_path_buf());
    }
    items.sort();
    Ok(items)
}

pub fn list_files(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, RetrieveError> {
    Ok(list_entries(dir)?
        .into_iter()
        .filter(|path| path.is_file())
        .collect())
}

pub fn list_dirs(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, RetrieveError> {
    Ok(list_entries(dir)?
        .into_iter()
        .filter(|path| path.is_dir())
        .collect())
}

/// True when `dir` exists and holds at least one entry, hidden or not.
pub fn dir_is_non_empty(dir: &Utf8Path) -> Result<bool, RetrieveError> {
    if !dir.exists() {
        return Ok(false);
    }
    let mut entries = dir
        .read_dir_utf8()
        .map_err(|err| RetrieveError::Filesystem(format!("read dir {dir}: {err}")))?;
    Ok(entries.next().is_some())
}

pub fn ensure_dir(dir: &Utf8Path) -> Result<(), RetrieveError> {
    fs::create_dir_all(dir.as_std_path())
        .map_err(|err| RetrieveError::Filesystem(format!("create dir {dir}: {err}")))
}

/// Byte-for-byte copy through a temporary file in the destination directory,
/// then `mode` is applied to the result. The source is never modified.
pub fn copy_file(source: &Utf8Path, dest: &Utf8Path, mode: u32) -> Result<u64, RetrieveError> {
    let parent = dest
        .parent()
        .ok_or_else(|| RetrieveError::Filesystem(format!("invalid destination path {dest}")))?;
    ensure_dir(parent)?;
    let temp = Builder::new()
        .prefix(".basemount-retrieve")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| RetrieveError::Filesystem(err.to_string()))?;
    let bytes = fs::copy(source.as_std_path(), temp.path())
        .map_err(|err| RetrieveError::Filesystem(format!("copy {source}: {err}")))?;
    temp.persist(dest.as_std_path())
        .map_err(|err| RetrieveError::Filesystem(format!("persist {dest}: {err}")))?;
    set_mode(dest, mode)?;
    Ok(bytes)
}

#[cfg(unix)]
pub fn set_mode(path: &Utf8Path, mode: u32) -> Result<(), RetrieveError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path.as_std_path(), fs::Permissions::from_mode(mode))
        .map_err(|err| RetrieveError::Filesystem(format!("chmod {path}: {err}")))
}

#[cfg(not(unix))]
pub fn set_mode(path: &Utf8Path, _mode: u32) -> Result<(), RetrieveError> {
    let mut permissions = fs::metadata(path.as_std_path())
        .map_err(|err| RetrieveError::Filesystem(err.to_string()))?
        .permissions();
    permissions.set_readonly(false);
    fs::set_permissions(path.as_std_path(), permissions)
        .map_err(|err| RetrieveError::Filesystem(format!("chmod {path}: {err}")))
}
