// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn render_with_color_emits_ansi() {
    assert_eq!(render("(@dim)x(@r)", true), "\x1b[2mx\x1b[0m");
    assert_eq!(render("(@error)boom(@r)", true), "\x1b[31mboom\x1b[0m");
}

#[test]
fn render_without_color_strips_markup() {
    assert_eq!(render("(@dim)x(@r) (@host)h(@r)", false), "x h");
}

#[test]
fn unknown_tokens_pass_through() {
    assert_eq!(render("(@nope)x", false), "(@nope)x");
}

#[test]
fn commit_truncates_to_display_width() {
    assert_eq!(commit(Some("0123456789abcdef")), "(@commit)0123456789(@r)");
    assert_eq!(commit(Some("abc")), "(@commit)abc(@r)");
    assert_eq!(commit(None), "(@commit)None(@r)");
}

#[parameterized(
    plain = { "hello", 5 },
    colored = { "\x1b[2mhello\x1b[0m", 5 },
    mixed = { "a\x1b[31mbc\x1b[0md", 4 },
    empty = { "", 0 },
)]
fn visible_len_ignores_escapes(s: &str, expected: usize) {
    assert_eq!(visible_len(s), expected);
}

#[test]
fn truncate_visible_counts_only_visible_chars() {
    let s = "\x1b[2mabcdef\x1b[0m";
    let t = truncate_visible(s, 3);
    assert_eq!(visible_len(&t), 3);
    assert!(t.starts_with("\x1b[2m"));
}

#[test]
fn truncate_visible_is_noop_when_short() {
    assert_eq!(truncate_visible("ab", 10), "ab");
}
