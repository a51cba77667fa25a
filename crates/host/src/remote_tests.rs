// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::sh_quote;

#[test]
fn sh_quote_wraps_in_single_quotes() {
    assert_eq!(sh_quote("plain"), "'plain'");
    assert_eq!(sh_quote("with space"), "'with space'");
}

#[test]
fn sh_quote_escapes_embedded_quotes() {
    assert_eq!(sh_quote("it's"), r"'it'\''s'");
}

#[test]
fn sh_quote_keeps_shell_metacharacters_inert() {
    assert_eq!(sh_quote("$(rm -rf /)"), "'$(rm -rf /)'");
    assert_eq!(sh_quote("a;b&&c"), "'a;b&&c'");
}
