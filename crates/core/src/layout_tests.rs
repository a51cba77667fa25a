// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn tug_exe_gets_exe_suffix_on_windows() {
    assert_eq!(tug_exe_path("/home/u/.lockstep", false), "/home/u/.lockstep/tug");
    assert_eq!(tug_exe_path("/home/u/.lockstep", true), "/home/u/.lockstep/tug.exe");
}

#[test]
fn pidfiles_live_directly_under_the_state_dir() {
    assert_eq!(pidfile_path("/home/u/.lockstep", "daemon"), "/home/u/.lockstep/daemon.pid");
    assert_eq!(
        pidfile_path("/home/u/.lockstep", "inotifywait"),
        "/home/u/.lockstep/inotifywait.pid"
    );
}

#[test]
fn repos_dir_is_a_state_dir_child() {
    assert_eq!(repos_dir("/home/u/.lockstep"), "/home/u/.lockstep/repos");
}

#[test]
fn default_ignore_covers_transient_files() {
    assert_eq!(DEFAULT_IGNORE, "*.lock\n.#*\n*.pyc\n");
}
