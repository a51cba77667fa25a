// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn uname_maps_to_os_kind() {
    assert_eq!(OsKind::from_uname("Linux\n"), OsKind::Linux);
    assert_eq!(OsKind::from_uname("Darwin"), OsKind::Darwin);
    // No uname / anything else is assumed to be Windows.
    assert_eq!(OsKind::from_uname("MINGW64_NT-10.0"), OsKind::Windows);
}

#[test]
fn separator_follows_os() {
    assert_eq!(OsKind::Linux.separator(), '/');
    assert_eq!(OsKind::Darwin.separator(), '/');
    assert_eq!(OsKind::Windows.separator(), '\\');
}

#[test]
fn stdout_line_trims_and_rejects_empty() {
    let out = CmdOutput { exit_code: 0, stdout: "  abc123\n".to_string(), stderr: String::new() };
    assert_eq!(out.stdout_line().as_deref(), Some("abc123"));

    let empty = CmdOutput { exit_code: 0, stdout: "\n".to_string(), stderr: String::new() };
    assert_eq!(empty.stdout_line(), None);
}

#[tokio::test]
async fn first_available_prefers_earlier_candidates() {
    let host = LocalHost::new();
    // `sh` exists everywhere this test runs; the bogus name never does.
    let found = first_available(&host, &["definitely-not-a-real-tool-xyz", "sh"])
        .await
        .unwrap();
    assert_eq!(found.as_deref(), Some("sh"));

    let none = first_available(&host, &["definitely-not-a-real-tool-xyz"]).await.unwrap();
    assert_eq!(none, None);
}
