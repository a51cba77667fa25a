// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lockstep-term: merged terminal output for many concurrent sources.
//!
//! Every subprocess stream and status source gets a [`Writer`]; a single
//! console task owns stdout and interleaves them, keeping one rewriteable
//! tail line for in-flight partial output.

pub mod markup;
mod render;

pub use render::Renderer;

use std::io::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

enum Msg {
    Post { id: usize, text: String },
}

/// Handle for creating writers and driving the shared terminal.
#[derive(Clone)]
pub struct Console {
    tx: mpsc::UnboundedSender<Msg>,
    registry: Arc<Mutex<Renderer>>,
}

impl Console {
    /// Spawn the console task that owns stdout.
    ///
    /// `color = false` strips all markup (the `--no-color` path).
    pub fn spawn(color: bool) -> Console {
        let cols = crossterm::terminal::size().map(|(w, _)| w as usize).unwrap_or(80);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let registry = Arc::new(Mutex::new(Renderer::new(cols, color)));
        let renderer = Arc::clone(&registry);

        tokio::spawn(async move {
            let mut stdout = std::io::stdout();
            while let Some(Msg::Post { id, text }) = rx.recv().await {
                let bytes = renderer.lock().post(id, &text);
                if !bytes.is_empty() {
                    let _ = stdout.write_all(bytes.as_bytes());
                    let _ = stdout.flush();
                }
            }
        });

        Console { tx, registry }
    }

    /// Create a writer for a new source.
    ///
    /// `host` and `name` compose the `[host:name]` prefix; `name` may be
    /// empty for a host's default channel.
    pub fn writer(&self, host: &str, name: &str) -> Writer {
        let nameish = if name.is_empty() {
            markup::host(host)
        } else {
            format!("{}:{name}", markup::host(host))
        };
        let prefix = format!("(@dim)[(@r){nameish}(@dim)](@r) ");
        let id = self.registry.lock().add_writer(prefix);
        Writer {
            id,
            tx: self.tx.clone(),
            muted: Arc::new(AtomicBool::new(false)),
            capture: Arc::new(Mutex::new(String::new())),
        }
    }
}

/// One logical output source.
///
/// Posts are totally ordered per writer; text without a trailing newline
/// stays in the ephemeral tail until completed.
#[derive(Clone)]
pub struct Writer {
    id: usize,
    tx: mpsc::UnboundedSender<Msg>,
    muted: Arc<AtomicBool>,
    capture: Arc<Mutex<String>>,
}

impl Writer {
    /// Post text (may contain `(@token)` markup and embedded newlines).
    pub fn out(&self, text: &str) {
        self.capture.lock().push_str(text);
        if !self.muted.load(Ordering::Relaxed) {
            let _ = self.tx.send(Msg::Post { id: self.id, text: text.to_string() });
        }
    }

    /// Post a full line.
    pub fn line(&self, text: &str) {
        self.out(&format!("{text}\n"));
    }

    /// Stop rendering this writer's output; capture continues.
    pub fn mute(&self) {
        self.muted.store(true, Ordering::Relaxed);
    }

    /// Everything ever posted, markup included.
    pub fn captured(&self) -> String {
        self.capture.lock().clone()
    }

    /// Pump a byte stream line-by-line through this writer until EOF.
    ///
    /// Used for subprocess stdout/stderr quoting; each line is completed
    /// so it scrolls rather than sitting in the tail.
    pub async fn quote_stream<R>(&self, reader: R)
    where
        R: AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            self.line(&line);
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
