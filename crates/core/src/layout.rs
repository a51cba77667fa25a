// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Naming conventions for the tug DVCS and the per-host state directory.
//!
//! All paths produced here are relative to a host's home directory and use
//! forward slashes; the host layer translates them into its own path
//! vocabulary.

/// Metadata directory of a tug repository, colocated with the sync path.
pub const DVCS_DIR: &str = ".tug";

/// Per-directory ignore-rules file.
pub const IGNORE_FILE: &str = ".tugignore";

/// Content seeded into the root ignore file on first init.
///
/// Globs cover files that are probably transient: editor lock files,
/// emacs autosave droppings, compiled python.
pub const DEFAULT_IGNORE: &str = "*.lock\n.#*\n*.pyc\n";

/// Path of the tug binary inside the state directory.
pub fn tug_exe_path(state_dir: &str, windows: bool) -> String {
    if windows {
        format!("{state_dir}/tug.exe")
    } else {
        format!("{state_dir}/tug")
    }
}

/// Directory the tug daemon serves as its `--base-path`.
///
/// Holds one symlink per tail hash pointing at the hosting sync path, so a
/// single daemon can serve every repo synced from this host.
pub fn repos_dir(state_dir: &str) -> String {
    format!("{state_dir}/repos")
}

/// PID file for a supervised process.
pub fn pidfile_path(state_dir: &str, process_name: &str) -> String {
    format!("{state_dir}/{process_name}.pid")
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
