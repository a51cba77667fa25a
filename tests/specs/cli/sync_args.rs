// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Argument validation specs for `lockstep sync`.

use crate::prelude::*;

#[test]
fn sync_requires_both_paths() {
    cli().args(&["sync"]).fails().stderr_has("required");
    cli().args(&["sync", "./here"]).fails().stderr_has("required");
}

#[test]
fn sync_rejects_a_remote_without_a_colon() {
    cli()
        .args(&["sync", "./here", "devbox"])
        .fails()
        .stderr_has("remote must include both the hostname and path");
}

#[test]
fn sync_rejects_an_empty_remote_path() {
    cli()
        .args(&["sync", "./here", "devbox:"])
        .fails()
        .stderr_has("remote must include both the hostname and path");
}

#[test]
fn unknown_flags_are_rejected() {
    cli().args(&["sync", "--bogus"]).fails().stderr_has("unexpected argument");
}
