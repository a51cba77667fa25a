// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host-layer errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    /// The command could not be started at all (typically: not installed).
    #[error("failed to run {command}: {source}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The SSH transport failed. Fatal; there is no automatic reconnection
    /// at this layer.
    #[error("lost connection to {host}: {reason}")]
    RemoteUnreachable { host: String, reason: String },

    /// Local filesystem errors.
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A remote file operation reported failure through its exit status.
    #[error("remote operation failed on {path}: {detail}")]
    RemoteOp { path: String, detail: String },

    #[error("could not determine home directory")]
    NoHome,
}

impl HostError {
    pub(crate) fn io(path: &str, source: std::io::Error) -> Self {
        HostError::Io { path: path.to_string(), source }
    }
}
