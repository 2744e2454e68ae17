use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const LOCK_SUFFIX: &str = ".lock";
pub const TABLE_EXTENSION: &str = "txt";

/// Lock file backing the interprocess lock: the full file name plus `.lock`.
#[must_use]
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}

/// Sibling file receiving the rendered table: same directory and stem, `.txt`.
#[must_use]
pub fn table_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default();
    let mut name = OsString::from(stem);
    name.push(".");
    name.push(TABLE_EXTENSION);
    match path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}
