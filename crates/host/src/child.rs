// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A spawned long-running process, local or remote.

use std::future::Future;
use std::pin::Pin;

use tokio::io::AsyncRead;

use crate::HostError;

type WaitFuture = Pin<Box<dyn Future<Output = Result<i32, HostError>> + Send>>;

/// Handle to a spawned child with piped stdout/stderr.
///
/// Local children expose their PID; remote children do not (OpenSSH does
/// not report the far-side PID), so supervision falls back to PID files
/// and `pgrep`.
pub struct ChildProc {
    pid: Option<u32>,
    stdout: Option<Box<dyn AsyncRead + Send + Unpin>>,
    stderr: Option<Box<dyn AsyncRead + Send + Unpin>>,
    wait: WaitFuture,
}

impl ChildProc {
    /// Assemble a handle from its parts (exposed for host implementations
    /// and test doubles).
    pub fn new(
        pid: Option<u32>,
        stdout: Option<Box<dyn AsyncRead + Send + Unpin>>,
        stderr: Option<Box<dyn AsyncRead + Send + Unpin>>,
        wait: WaitFuture,
    ) -> Self {
        Self { pid, stdout, stderr, wait }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Take the stdout stream. Each stream can be taken once.
    pub fn take_stdout(&mut self) -> Option<Box<dyn AsyncRead + Send + Unpin>> {
        self.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<Box<dyn AsyncRead + Send + Unpin>> {
        self.stderr.take()
    }

    /// Wait for the child to exit and return its exit code (-1 when killed
    /// by a signal).
    pub async fn wait(self) -> Result<i32, HostError> {
        self.wait.await
    }
}

impl std::fmt::Debug for ChildProc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildProc").field("pid", &self.pid).finish_non_exhaustive()
    }
}
