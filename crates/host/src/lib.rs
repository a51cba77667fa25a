// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lockstep-host: uniform command execution and file I/O against the local
//! machine or a remote machine reached over SSH.
//!
//! The sync engine never talks to `tokio::process` or `openssh` directly;
//! everything goes through the [`Host`] trait so a command round reads the
//! same whether it runs here or on the peer.

mod child;
mod error;
mod local;
mod remote;

pub use child::ChildProc;
pub use error::HostError;
pub use local::LocalHost;
pub use remote::RemoteHost;

use async_trait::async_trait;

/// Which side of the SSH connection a host lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Local,
    Remote,
}

/// Operating-system family, as reported by `uname -s` (or assumed Windows
/// when no `uname` is available).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKind {
    Linux,
    Darwin,
    Windows,
}

impl OsKind {
    pub fn from_uname(uname: &str) -> OsKind {
        match uname.trim() {
            "Linux" => OsKind::Linux,
            "Darwin" => OsKind::Darwin,
            _ => OsKind::Windows,
        }
    }

    /// Path separator in this OS's path vocabulary.
    pub fn separator(self) -> char {
        match self {
            OsKind::Windows => '\\',
            _ => '/',
        }
    }

    pub fn is_windows(self) -> bool {
        self == OsKind::Windows
    }
}

/// Buffered result of a finished command.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Trimmed stdout, or `None` when it is empty.
    pub fn stdout_line(&self) -> Option<String> {
        let line = self.stdout.trim();
        if line.is_empty() {
            None
        } else {
            Some(line.to_string())
        }
    }
}

/// A command-execution environment: the local machine or an SSH peer.
///
/// All operations are safe to call concurrently; the remote implementation
/// multiplexes over one OpenSSH ControlMaster connection.
#[async_trait]
pub trait Host: Send + Sync {
    /// Display name (`localhost` or the SSH host).
    fn name(&self) -> &str;

    fn kind(&self) -> HostKind;

    fn os(&self) -> OsKind;

    /// `user@host` for remote hosts, `None` locally.
    fn ssh_address(&self) -> Option<&str>;

    /// Run `argv` to completion, optionally in `cwd`, and buffer its output.
    ///
    /// A non-zero exit is not an error at this layer; callers inspect
    /// [`CmdOutput::exit_code`]. Errors mean the command could not run at
    /// all: the tool is absent locally ([`HostError::CommandFailed`]) or the
    /// SSH transport dropped ([`HostError::RemoteUnreachable`]).
    async fn run_in(&self, cwd: Option<&str>, argv: &[&str]) -> Result<CmdOutput, HostError>;

    /// Spawn `argv` as a long-running child with piped stdout/stderr.
    ///
    /// The PID is only knowable for local children; remote callers fall
    /// back to `pgrep` when they need one.
    async fn spawn_in(&self, cwd: Option<&str>, argv: &[&str]) -> Result<ChildProc, HostError>;

    /// Byte-exact copy of a local file to `dest` on this host.
    async fn upload(&self, local_src: &str, dest: &str) -> Result<(), HostError>;

    async fn read_file(&self, path: &str) -> Result<String, HostError>;

    async fn write_file(&self, path: &str, contents: &str) -> Result<(), HostError>;

    async fn exists(&self, path: &str) -> Result<bool, HostError>;

    async fn is_dir(&self, path: &str) -> Result<bool, HostError>;

    /// Number of entries in a directory (excluding `.` and `..`).
    async fn dir_entry_count(&self, path: &str) -> Result<usize, HostError>;

    async fn mkdirp(&self, path: &str) -> Result<(), HostError>;

    /// Create (or replace) a symlink at `link` pointing to `target`.
    async fn symlink(&self, target: &str, link: &str) -> Result<(), HostError>;

    async fn remove_file(&self, path: &str) -> Result<(), HostError>;

    /// Resolve `cmd` on the host's PATH.
    async fn which(&self, cmd: &str) -> Result<Option<String>, HostError>;

    /// Home directory; resolved at most once per host lifetime.
    async fn home(&self) -> Result<String, HostError>;

    /// The host's hostname, used as the committer identity.
    async fn hostname(&self) -> Result<String, HostError>;

    /// Expand a leading `~` into the host's home directory.
    async fn expand_path(&self, path: &str) -> Result<String, HostError>;
}

/// Pick the first of `cmds` that resolves on the host's PATH.
pub async fn first_available(host: &dyn Host, cmds: &[&str]) -> Result<Option<String>, HostError> {
    for cmd in cmds {
        if host.which(cmd).await?.is_some() {
            return Ok(Some((*cmd).to_string()));
        }
    }
    Ok(None)
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
