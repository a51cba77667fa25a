// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI help output specs.

use crate::prelude::*;

#[test]
fn lockstep_no_args_shows_usage() {
    cli().fails().stderr_has("Usage:");
}

#[test]
fn lockstep_help_shows_usage() {
    cli().args(&["--help"]).passes().stdout_has("Usage:").stdout_has("sync");
}

#[test]
fn lockstep_sync_help_shows_arguments_and_flags() {
    cli()
        .args(&["sync", "--help"])
        .passes()
        .stdout_has("LOCAL")
        .stdout_has("REMOTE")
        .stdout_has("--identity")
        .stdout_has("--install-deps")
        .stdout_has("--no-color");
}

#[test]
fn lockstep_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.2");
}
