//! Resolution of bare command names against the `PATH` search list.

use crate::env::Environment;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Find `command` in the directories listed in the environment's `PATH`.
///
/// `PATH` is read at call time, never cached. Returns `None` when `PATH` is
/// unset or no directory holds a stat-able `<dir>/<command>`.
pub fn search_path(env: &Environment, command: &str) -> Option<PathBuf> {
    let search_paths = env.get_var("PATH")?;
    find_in_path(&search_paths, OsStr::new(command))
}

/// Search each directory of a colon-separated list in order and return the
/// first `<dir>/<cmd>` that exists. Empty list entries are skipped.
pub fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_paths) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let path = dir.join(cmd);
        if let Some(path) = find_by_path(&path) {
            return Some(path.to_owned());
        }
    }
    None
}

/// Returns `path` back if `stat` succeeds on it (symlinks are followed).
pub fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}
