// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use lockstep_host::OsKind;
use yare::parameterized;

use super::{relative_to_root, watcher_argv};

#[test]
fn inotifywait_argv_covers_the_change_events() {
    let argv = watcher_argv("inotifywait", OsKind::Linux);
    let joined = argv.join(" ");
    assert!(joined.starts_with("inotifywait --quiet --monitor --recursive --format %w%f"));
    assert!(joined.contains("--exclude \\.tug/"));
    for event in ["modify", "attrib", "move", "create", "delete"] {
        assert!(joined.contains(&format!("--event {event}")), "missing {event}");
    }
    assert_eq!(argv.last().map(String::as_str), Some("./"));
}

#[test]
fn windows_inotifywait_uses_the_port_syntax() {
    let argv = watcher_argv("inotifywait", OsKind::Windows);
    let joined = argv.join(" ");
    assert!(joined.contains("--format %w\\%f"));
    assert!(joined.contains("--exclude \\.tug($|\\\\)"));
    // inotify-win takes one comma-separated event list.
    assert!(joined.contains("--event modify,attrib,move,create,delete"));
}

#[test]
fn fswatch_argv_is_just_the_root() {
    assert_eq!(watcher_argv("fswatch", OsKind::Darwin), vec!["fswatch", "./"]);
}

#[parameterized(
    dot_relative = { "./a/b", Some("a/b") },
    bare_relative = { "a/b", Some("a/b") },
    absolute_under_root = { "/home/u/sync/a/b", Some("a/b") },
    absolute_outside_root = { "/etc/passwd", None },
    the_root_itself = { "/home/u/sync", None },
    empty = { "", None },
    whitespace = { "   ", None },
)]
fn relative_paths(line: &str, expected: Option<&str>) {
    assert_eq!(relative_to_root(line, "/home/u/sync", '/').as_deref(), expected);
}

#[test]
fn windows_lines_resolve_against_a_windows_root() {
    assert_eq!(
        relative_to_root("C:\\u\\sync\\a\\b", "C:\\u\\sync", '\\').as_deref(),
        Some("a\\b")
    );
    assert_eq!(relative_to_root(".\\a", "C:\\u\\sync", '\\').as_deref(), Some("a"));
}

#[test]
fn trailing_carriage_returns_are_trimmed() {
    assert_eq!(relative_to_root("./a/b\r", "/home/u/sync", '/').as_deref(), Some("a/b"));
}
