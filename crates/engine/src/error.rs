// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level errors.
//!
//! The sync loop catches and logs `Subprocess` failures per round and never
//! unwinds; everything else aborts startup (exit code 1 at the CLI).

use lockstep_host::HostError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A required external tool is absent and could not be installed.
    #[error("missing required dependency: {0}")]
    DependencyMissing(String),

    /// A subprocess ran but reported failure we cannot recover from.
    #[error("{command} failed: {stderr}")]
    Subprocess { command: String, stderr: String },

    /// A merge was refused because of uncommitted changes on the pulling
    /// side. Recovered internally by a forced commit plus one retry;
    /// surfacing this means the retry also failed.
    #[error("merge blocked by uncommitted local changes")]
    MergeBlocked,

    /// The two repositories have different root commits and can never be
    /// peered.
    #[error(
        "cannot sync incompatible repos: local initial commit [{local}], remote initial commit [{remote}]"
    )]
    IncompatibleRepos { local: String, remote: String },

    /// Refusing to seed into a directory that already has contents.
    #[error("refusing to initialize {path} on {host}: not an empty directory")]
    DirectoryNotEmpty { host: String, path: String },

    #[error("no unused ports found in {min}..={max} on both hosts")]
    NoPortsAvailable { min: u16, max: u16 },

    /// Sentinel for failures that race session teardown: the sync loop's
    /// rounds and the watcher relaunch path report this instead of the
    /// underlying error, so shutdown stays quiet.
    #[error("shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Host(#[from] HostError),
}

impl EngineError {
    /// Wrap a finished-but-failed command.
    pub(crate) fn subprocess(command: impl Into<String>, stderr: &str) -> Self {
        EngineError::Subprocess { command: command.into(), stderr: stderr.trim().to_string() }
    }

    /// Text a failure would print, used to pattern-match missing
    /// dependencies out of arbitrary errors.
    pub(crate) fn probe_text(&self) -> String {
        match self {
            EngineError::Subprocess { command, stderr } => format!("{command}: {stderr}"),
            EngineError::DependencyMissing(tool) => format!("missing {tool}"),
            EngineError::Host(HostError::CommandFailed { command, source }) => {
                format!("{command}: {source}")
            }
            other => other.to_string(),
        }
    }
}
