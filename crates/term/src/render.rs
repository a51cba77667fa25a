// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared-terminal renderer.
//!
//! Many writers feed one terminal. Completed lines scroll; each writer's
//! in-flight partial line is shown in a single ephemeral tail line at the
//! cursor, rewritten in place as partials grow.

use crate::markup;

const ERASE_LINE: &str = "\r\x1b[K";

/// Hint matched against quoted subprocess output (inotify exhaustion shows
/// up as a watcher stderr line, not an exit code).
const INOTIFY_LIMIT_PHRASE: &str = "Please increase the amount of inotify watches";

struct WriterState {
    prefix: String,
    current: String,
}

/// Pure rendering state: consumes writer posts, produces terminal bytes.
///
/// Kept free of I/O so the flush protocol is testable; the console task
/// owns stdout and writes whatever this returns.
pub struct Renderer {
    writers: Vec<WriterState>,
    cols: usize,
    color: bool,
    /// Rendered tail as last drawn; `None` after a flush overwrote its row.
    last_tail: Option<String>,
}

impl Renderer {
    pub fn new(cols: usize, color: bool) -> Self {
        Self { writers: Vec::new(), cols, color, last_tail: Some(String::new()) }
    }

    /// Register a new source; returns its writer id.
    pub fn add_writer(&mut self, prefix: String) -> usize {
        self.writers.push(WriterState { prefix, current: String::new() });
        self.writers.len() - 1
    }

    /// Apply a text post from writer `id`, returning the bytes to emit.
    ///
    /// Text up to the last newline completes lines (flushed above the
    /// tail); the remainder becomes the writer's new partial line.
    pub fn post(&mut self, id: usize, text: &str) -> String {
        let Some(state) = self.writers.get_mut(id) else {
            return String::new();
        };

        let mut flushed: Vec<String> = Vec::new();
        let mut remaining = text;
        while let Some(pos) = remaining.find('\n') {
            let (segment, rest) = remaining.split_at(pos);
            state.current.push_str(segment);
            flushed.push(std::mem::take(&mut state.current));
            remaining = &rest[1..];
        }
        state.current.push_str(remaining);

        let prefix = state.prefix.clone();
        let mut out = String::new();
        for line in flushed {
            if markup::render(&line, false).trim().is_empty() {
                continue;
            }
            out.push_str(ERASE_LINE);
            out.push_str(&markup::render(&format!("{prefix}{line}"), self.color));
            out.push('\n');
            if line.contains(INOTIFY_LIMIT_PHRASE) {
                out.push_str(&markup::render(
                    "(@error)You've hit the inotify max_user_watches limit.(@r)",
                    self.color,
                ));
                out.push('\n');
            }
            self.last_tail = None;
        }

        out.push_str(&self.redraw_tail());
        out
    }

    /// Compose the ephemeral tail from all writers' partial lines and
    /// return the bytes to redraw it, or nothing when it is unchanged.
    fn redraw_tail(&mut self) -> String {
        let parts: Vec<String> = self
            .writers
            .iter()
            .filter(|w| !w.current.is_empty())
            .map(|w| format!("{}{}", w.prefix, w.current))
            .collect();

        let tail = markup::truncate_visible(
            &markup::render(&parts.join(" | "), self.color),
            self.cols.saturating_sub(1),
        );

        if self.last_tail.as_ref() == Some(&tail) {
            return String::new();
        }
        let bytes = if tail.is_empty() {
            ERASE_LINE.to_string()
        } else {
            format!("{ERASE_LINE}{tail}")
        };
        self.last_tail = Some(tail);
        bytes
    }
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
