use std::collections::HashMap;
use std::env as stdenv;
use std::ffi::{CString, OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

/// Mutable, user-level view of the process environment used by the interpreter.
///
/// The environment contains:
/// - `vars`: shell-local overrides layered on top of the process environment.
/// - `should_exit`: a flag the read loop checks to know when to terminate.
///
/// Lookups never snapshot the process environment: a variable that is not
/// overridden is read from the process at call time, so `PATH` changes are
/// visible to the very next resolution.
///
/// No built-in sets variables. The override layer is for code embedding the
/// [`Interpreter`](crate::Interpreter) and for tests, which can change what
/// lookups and children see without touching the process-wide environment.
/// With no overrides, children receive exactly the inherited environment.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Overrides (e.g., PATH, HOME); `None` masks a variable as unset.
    pub vars: HashMap<String, Option<OsString>>,
    /// When set to true, indicates that the read loop should exit.
    pub should_exit: bool,
}

impl Environment {
    /// Create an environment with no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to the process
    /// environment as it is right now.
    pub fn get_var(&self, key: &str) -> Option<OsString> {
        match self.vars.get(key) {
            Some(value) => value.clone(),
            None => stdenv::var_os(key),
        }
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<OsString>) {
        self.vars.insert(key.into(), Some(val.into()));
    }

    /// Hide a variable from lookups and children, whatever the process has.
    pub fn unset_var(&mut self, key: impl Into<String>) {
        self.vars.insert(key.into(), None);
    }

    /// Build the `KEY=VALUE` block handed to `execve`.
    ///
    /// Entries containing an interior NUL byte cannot be passed to the kernel
    /// and are left out.
    pub fn envp(&self) -> Vec<CString> {
        let mut merged: HashMap<OsString, OsString> = stdenv::vars_os().collect();
        for (k, v) in &self.vars {
            match v {
                Some(v) => merged.insert(OsString::from(k), v.clone()),
                None => merged.remove(OsStr::new(k)),
            };
        }
        merged
            .into_iter()
            .filter_map(|(k, v)| {
                let mut entry = k.as_bytes().to_vec();
                entry.push(b'=');
                entry.extend_from_slice(v.as_bytes());
                CString::new(entry).ok()
            })
            .collect()
    }
}

/// Serializes tests that change the process working directory.
#[cfg(test)]
pub(crate) fn lock_current_dir() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
