// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `(@token)` color markup.
//!
//! Writers never emit raw ANSI; they tag text with `(@token)…(@r)` and the
//! renderer resolves the tags when the line is flushed. With color disabled
//! the tags are stripped instead, so `--no-color` output is byte-clean.

/// Chars of a commit hash worth showing.
const HASH_DISPLAY_CHARS: usize = 10;

const TOKENS: &[(&str, &str)] = &[
    ("(@r)", "\x1b[0m"),
    ("(@dim)", "\x1b[2m"),
    ("(@bright)", "\x1b[1m"),
    ("(@path)", "\x1b[36m"),
    ("(@host)", "\x1b[33m"),
    ("(@error)", "\x1b[31m"),
    ("(@commit)", "\x1b[32m"),
];

/// Resolve markup into ANSI escapes (`color = true`) or strip it.
pub fn render(text: &str, color: bool) -> String {
    let mut out = text.to_string();
    for (token, ansi) in TOKENS {
        if color {
            out = out.replace(token, ansi);
        } else {
            out = out.replace(token, "");
        }
    }
    out
}

/// Tag a commit hash for display: green, truncated, `None` shown as such.
pub fn commit(hash: Option<&str>) -> String {
    let shown = hash.unwrap_or("None");
    let end = shown.len().min(HASH_DISPLAY_CHARS);
    format!("(@commit){}(@r)", &shown[..end])
}

/// Tag a host name for display.
pub fn host(name: &str) -> String {
    format!("(@host){name}(@r)")
}

/// Tag a path for display.
pub fn path(p: &str) -> String {
    format!("(@path){p}(@r)")
}

/// Visible length of a rendered string: chars outside ANSI escapes.
pub fn visible_len(s: &str) -> usize {
    let mut len = 0;
    let mut in_escape = false;
    for c in s.chars() {
        if in_escape {
            if c == 'm' {
                in_escape = false;
            }
        } else if c == '\x1b' {
            in_escape = true;
        } else {
            len += 1;
        }
    }
    len
}

/// Truncate a rendered string to at most `max` visible chars, keeping ANSI
/// escapes intact.
pub fn truncate_visible(s: &str, max: usize) -> String {
    let mut out = String::with_capacity(s.len());
    let mut len = 0;
    let mut in_escape = false;
    for c in s.chars() {
        if in_escape {
            out.push(c);
            if c == 'm' {
                in_escape = false;
            }
        } else if c == '\x1b' {
            out.push(c);
            in_escape = true;
        } else {
            if len == max {
                break;
            }
            out.push(c);
            len += 1;
        }
    }
    out
}

#[cfg(test)]
#[path = "markup_tests.rs"]
mod tests;
