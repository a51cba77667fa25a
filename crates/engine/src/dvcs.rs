// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tug command layer.
//!
//! Everything the orchestrator needs from the DVCS, as one method per
//! operation. tug is an opaque binary living in each host's state
//! directory; only the invocations and exit contracts below are relied on.

use std::sync::Arc;

use lockstep_core::{repos_dir, tug_exe_path, DEFAULT_IGNORE, DVCS_DIR, IGNORE_FILE};
use lockstep_host::{CmdOutput, Host, HostError};
use lockstep_term::{markup, Console, Writer};
use tracing::warn;

use crate::state::state_dir;
use crate::supervisor::Supervisor;
use crate::EngineError;

/// Phrase tug prints when a merge would clobber uncommitted changes.
const MERGE_BLOCKED_PHRASE: &str = "Your local changes to the following files would be overwritten";

/// One side's repository plus the host it lives on.
pub struct TugRepo {
    host: Arc<dyn Host>,
    sync_path: String,
    exe: String,
    state_dir: String,
    commit_status: Writer,
    pull_status: Writer,
    console: Console,
}

/// Result of a merge attempt.
#[derive(Debug, PartialEq, Eq)]
enum MergeOutcome {
    Done,
    Blocked,
}

impl TugRepo {
    /// Bind to the repository colocated with `sync_path` (which need not
    /// exist yet).
    pub async fn open(
        host: Arc<dyn Host>,
        sync_path: String,
        console: Console,
    ) -> Result<Self, EngineError> {
        let state_dir = state_dir(host.as_ref()).await?;
        let exe = tug_exe_path(&state_dir, host.os().is_windows());
        let commit_status = console.writer(host.name(), "commit");
        let pull_status = console.writer(host.name(), "pull");
        Ok(Self { host, sync_path, exe, state_dir, commit_status, pull_status, console })
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    pub fn sync_path(&self) -> &str {
        &self.sync_path
    }

    /// Run a tug subcommand inside the sync path.
    async fn tug(&self, args: &[&str]) -> Result<CmdOutput, HostError> {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(self.exe.as_str());
        argv.extend_from_slice(args);
        self.host.run_in(Some(&self.sync_path), &argv).await
    }

    /// Like [`Self::tug`], but a non-zero exit becomes a `Subprocess` error.
    async fn tug_ok(&self, args: &[&str]) -> Result<CmdOutput, EngineError> {
        let out = self.tug(args).await?;
        if !out.success() {
            return Err(EngineError::subprocess(format!("tug {}", args[0]), &out.stderr));
        }
        Ok(out)
    }

    /// Check that the tug binary exists and runs.
    pub async fn check_binary(&self) -> Result<(), EngineError> {
        match self.host.run_in(None, &[self.exe.as_str(), "--version"]).await {
            Ok(out) if out.success() => Ok(()),
            Ok(_) | Err(HostError::CommandFailed { .. }) => {
                Err(EngineError::DependencyMissing("tug".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Current HEAD hash; `None` for an unborn branch or before init.
    pub async fn rev_parse_head(&self) -> Result<Option<String>, EngineError> {
        let out = self.tug(&["rev-parse", "HEAD"]).await?;
        Ok(out.stdout_line())
    }

    /// Hash of the root (parentless) commit, used as the compatibility token.
    pub async fn tail_hash(&self) -> Result<Option<String>, EngineError> {
        let dvcs_dir = format!("{}/{DVCS_DIR}", self.sync_path);
        if !self.host.exists(&dvcs_dir).await? {
            return Ok(None);
        }
        let out = self.tug(&["rev-list", "--max-parents=0", "HEAD"]).await?;
        Ok(out.stdout_line())
    }

    /// Create the sync path and an empty repository, if either is missing.
    pub async fn init(&self) -> Result<(), EngineError> {
        self.host.mkdirp(&self.sync_path).await?;
        let dvcs_dir = format!("{}/{DVCS_DIR}", self.sync_path);
        if !self.host.exists(&dvcs_dir).await? {
            self.tug_ok(&["init"]).await?;
        }
        Ok(())
    }

    /// Seed the first commit: the default ignore file, committed.
    ///
    /// `rev-parse HEAD` answers the literal string `HEAD` while the branch
    /// is unborn; that is the only state this touches.
    pub async fn ensure_initial_commit(&self) -> Result<(), EngineError> {
        if self.rev_parse_head().await?.as_deref() != Some("HEAD") {
            return Ok(());
        }
        let ignore_path = format!("{}/{IGNORE_FILE}", self.sync_path);
        self.host.write_file(&ignore_path, DEFAULT_IGNORE).await?;
        self.tug_ok(&["add", IGNORE_FILE]).await?;
        self.tug_ok(&["commit", "--allow-empty", "--message", "Initial commit"]).await?;
        Ok(())
    }

    /// Auto-commit everything changed under `scope`.
    ///
    /// With `update_untracked`, files that newly match an ignore rule are
    /// untracked first (the rule change itself is committed either way).
    /// Returns whether HEAD moved; `commit`'s own exit code is ignored
    /// because an empty commit is a perfectly fine no-op round.
    pub async fn commit(&self, scope: &str, update_untracked: bool) -> Result<bool, EngineError> {
        let status = &self.commit_status;

        if update_untracked {
            let out = self.tug_ok(&["ls-files", "-i", "--exclude-standard", "--", scope]).await?;
            for file in out.stdout.lines().filter(|l| !l.trim().is_empty()) {
                status.line(&format!("(@dim)Untracking newly-ignored (@r){file}"));
                let rm = self
                    .tug(&["rm", "--cached", "--ignore-unmatch", "--quiet", "--", file])
                    .await?;
                if !rm.success() {
                    warn!(file, stderr = %rm.stderr.trim(), "tug rm --cached failed");
                }
            }
        }

        status.out(&format!(
            "(@dim)Checking {} (@dim)for changes (scope=(@r){scope}(@dim))...(@r)",
            markup::host(self.host.name())
        ));

        let head_before = self.rev_parse_head().await?;
        let add = self.tug(&["add", "--all", "--", scope]).await?;
        if !add.success() {
            warn!(scope, stderr = %add.stderr.trim(), "tug add failed");
        }
        let commit = self.tug(&["commit", "--message", "autocommit"]).await?;
        if !commit.success() && !commit.stderr.trim().is_empty() {
            warn!(stderr = %commit.stderr.trim(), "tug commit reported failure");
        }
        let head_after = self.rev_parse_head().await?;

        let made_a_commit = head_before != head_after;
        if made_a_commit {
            status.line(&format!(" committed {}(@dim).(@r)", markup::commit(head_after.as_deref())));
        } else {
            status.line(" none(@dim).(@r)");
        }
        Ok(made_a_commit)
    }

    /// Fetch from the peer and merge, preferring the fetched side.
    ///
    /// The fetched branch is authoritative: any uncommitted local changes
    /// will be re-observed by this side's watcher and committed in the next
    /// round. A merge blocked by uncommitted changes gets a forced commit
    /// (whole tree, untracking enabled) and exactly one retry.
    pub async fn pull(&self) -> Result<(), EngineError> {
        let status = &self.pull_status;
        status.out(&format!(
            "(@dim)Downloading changes to {}(@dim)...(@r)",
            markup::host(self.host.name())
        ));
        self.tug_ok(&["fetch", "origin"]).await?;
        status.line("(@dim) done.(@r)");

        if self.merge().await? == MergeOutcome::Blocked {
            status.line("(@dim)Committing outstanding changes before retrying merge...(@r)");
            self.commit(".", true).await?;
            if self.merge().await? == MergeOutcome::Blocked {
                return Err(EngineError::MergeBlocked);
            }
        }
        Ok(())
    }

    async fn merge(&self) -> Result<MergeOutcome, EngineError> {
        let status = &self.pull_status;
        status.out(&format!(
            "(@dim)Merging changes to {}(@dim)...(@r)",
            markup::host(self.host.name())
        ));
        let out = self
            .tug(&[
                "merge",
                "origin/master",
                "--strategy=recursive",
                "--strategy-option=theirs",
                "--no-edit",
            ])
            .await?;
        if out.stderr.contains(MERGE_BLOCKED_PHRASE) {
            status.line("(@error) failed due to uncommitted changes.(@r)");
            return Ok(MergeOutcome::Blocked);
        }
        status.line("(@dim) done.(@r)");
        Ok(MergeOutcome::Done)
    }

    /// Point `origin` at the peer's daemon through the tunnel and set the
    /// committer identity to this host's hostname.
    pub async fn setup_origin(&self, tail_hash: &str, connect_port: u16) -> Result<(), EngineError> {
        // Removal fails harmlessly when no origin exists yet.
        let _ = self.tug(&["remote", "rm", "origin"]).await?;
        let url = format!("tug://localhost:{connect_port}/{tail_hash}/");
        self.tug_ok(&["remote", "add", "origin", &url]).await?;
        self.tug_ok(&["config", "color.ui", "always"]).await?;

        let hostname = self.host.hostname().await?;
        self.tug_ok(&["config", "user.name", &hostname]).await?;
        let email = format!("lockstep@{hostname}");
        self.tug_ok(&["config", "user.email", &email]).await?;
        Ok(())
    }

    /// Start this side's tug daemon, serving the state-dir `repos/` tree.
    ///
    /// The sync path is symlinked at `repos/<tail_hash>` so concurrent
    /// sessions from this host share one daemon namespace without
    /// colliding. The daemon maintains its own PID file.
    pub async fn start_daemon(
        &self,
        supervisor: &Supervisor,
        tail_hash: &str,
        bind_port: u16,
    ) -> Result<(), EngineError> {
        let repos = repos_dir(&self.state_dir);
        self.host.mkdirp(&repos).await?;
        let link = format!("{repos}/{tail_hash}");
        self.host.symlink(&self.sync_path, &link).await?;

        supervisor.kill_previous(&self.host, "daemon", "tug").await?;

        let pidfile = format!("{}/daemon.pid", self.state_dir);
        let pidfile_opt = format!("--pid-file={pidfile}");
        let base_path_opt = format!("--base-path={repos}");
        let port_opt = format!("--port={bind_port}");
        let mut child = self
            .host
            .spawn_in(
                None,
                &[
                    self.exe.as_str(),
                    "daemon",
                    "--export-all",
                    &base_path_opt,
                    &pidfile_opt,
                    "--reuseaddr",
                    "--listen=localhost",
                    &port_opt,
                    &repos,
                ],
            )
            .await?;

        supervisor.track(Arc::clone(&self.host), "daemon", "tug");

        let writer = self.console.writer(self.host.name(), "daemon");
        if let Some(stdout) = child.take_stdout() {
            let w = writer.clone();
            tokio::spawn(async move { w.quote_stream(stdout).await });
        }
        if let Some(stderr) = child.take_stderr() {
            let w = writer.clone();
            tokio::spawn(async move { w.quote_stream(stderr).await });
        }
        tokio::spawn(async move {
            match child.wait().await {
                Ok(code) => writer.line(&format!("(@dim)daemon exited with code {code}(@r)")),
                Err(e) => writer.line(&format!("(@error)daemon wait failed: {e}(@r)")),
            }
        });

        Ok(())
    }
}

#[cfg(test)]
#[path = "dvcs_tests.rs"]
mod tests;
