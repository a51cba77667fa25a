// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The steady-state sync loop.
//!
//! One task drains the shared watcher-event channel, debouncing bursts
//! into per-side change sets. A quiet tick commits each side's accumulated
//! scope and pulls the result onto the peer. Commit rounds are serialized
//! per side by construction (there is only this task); the two sides race
//! freely, and the `theirs` merge strategy keeps racing rounds convergent.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use lockstep_core::{classify, commit_scope, ChangeEvent, EventClass, Side};
use lockstep_term::Writer;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::dvcs::TugRepo;
use crate::EngineError;

/// How long to wait for more events once a burst has started.
const DEBOUNCE: Duration = Duration::from_millis(100);
/// Idle poll interval with nothing accumulated.
const IDLE: Duration = Duration::from_secs(10);

/// The event-driven commit/pull loop.
pub struct SyncLoop {
    local: TugRepo,
    remote: TugRepo,
    events: mpsc::Receiver<ChangeEvent>,
    shutdown: CancellationToken,
    status: Writer,
    changed: BTreeMap<Side, BTreeSet<String>>,
    changed_ignore: BTreeSet<Side>,
}

impl SyncLoop {
    pub fn new(
        local: TugRepo,
        remote: TugRepo,
        events: mpsc::Receiver<ChangeEvent>,
        shutdown: CancellationToken,
        status: Writer,
    ) -> Self {
        Self {
            local,
            remote,
            events,
            shutdown,
            status,
            changed: BTreeMap::new(),
            changed_ignore: BTreeSet::new(),
        }
    }

    fn repo(&self, side: Side) -> &TugRepo {
        match side {
            Side::Local => &self.local,
            Side::Remote => &self.remote,
        }
    }

    /// Capture anything that changed while the orchestrator was down.
    ///
    /// Runs after the watchers are installed but before the loop, in a
    /// deterministic order: commit both sides (untracking enabled), then
    /// pull both, so each side sees the other's offline edits.
    pub async fn prime(&self) -> Result<(), EngineError> {
        let empty = BTreeSet::new();
        self.round(Side::Remote, &empty, true).await;
        self.round(Side::Local, &empty, true).await;
        self.remote.pull().await?;
        self.local.pull().await?;
        Ok(())
    }

    /// Drain events until shutdown.
    pub async fn run(mut self) -> Result<(), EngineError> {
        loop {
            let timeout = if self.changed.is_empty() { IDLE } else { DEBOUNCE };
            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                recv = tokio::time::timeout(timeout, self.events.recv()) => match recv {
                    // Quiet tick: flush everything accumulated.
                    Err(_elapsed) => self.flush().await,
                    Ok(Some(event)) => self.note(event),
                    // Every watcher is gone; nothing further can arrive.
                    Ok(None) => return Ok(()),
                },
            }
        }
    }

    /// Record one watcher event into the per-side change sets.
    fn note(&mut self, event: ChangeEvent) {
        let separator = self.repo(event.side).host().os().separator();
        match classify(&event.path, separator) {
            // The watchers exclude the metadata dir already; drop strays.
            EventClass::Metadata => {}
            EventClass::Changed => {
                self.changed.entry(event.side).or_default().insert(event.path);
            }
            EventClass::ChangedIgnoreRules => {
                self.changed.entry(event.side).or_default().insert(event.path);
                self.changed_ignore.insert(event.side);
            }
        }
    }

    /// Commit and propagate every side with accumulated changes.
    async fn flush(&mut self) {
        let changed = std::mem::take(&mut self.changed);
        for (side, paths) in &changed {
            let update_untracked = self.changed_ignore.contains(side);
            self.round(*side, paths, update_untracked).await;
        }
        self.changed_ignore.clear();
    }

    /// One commit-and-pull round, with failures contained to the round:
    /// the error is reported and the next event re-drives the cycle.
    async fn round(&self, src: Side, paths: &BTreeSet<String>, update_untracked: bool) {
        if let Err(e) = self.commit_and_update(src, paths, update_untracked).await {
            // A failure racing teardown is just the teardown.
            let e = if self.shutdown.is_cancelled() { EngineError::ShuttingDown } else { e };
            match e {
                EngineError::ShuttingDown => {}
                e => {
                    error!(side = %src, error = %e, "commit-and-pull round failed");
                    self.status.line(&format!("(@error)Error during commit-and-pull: {e}(@r)"));
                }
            }
        }
    }

    /// Commit `paths` on `src` and, if HEAD moved, pull on the peer.
    pub async fn commit_and_update(
        &self,
        src: Side,
        paths: &BTreeSet<String>,
        update_untracked: bool,
    ) -> Result<(), EngineError> {
        let src_repo = self.repo(src);
        let dst_repo = self.repo(src.other());

        let separator = src_repo.host().os().separator();
        let scope = commit_scope(paths.iter().map(String::as_str), separator);

        if src_repo.commit(&scope, update_untracked).await? {
            dst_repo.pull().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
