// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsing of the `[user@]host:path` remote argument.

/// A parsed remote destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSpec {
    pub user: Option<String>,
    pub host: String,
    pub path: String,
}

impl RemoteSpec {
    /// Parse `[user@]host:path`.
    ///
    /// The first colon separates the address from the path; the last `@`
    /// before it separates an optional user from the host.
    pub fn parse(spec: &str) -> Result<Self, String> {
        let Some((addr, path)) = spec.split_once(':') else {
            return Err(
                "remote must include both the hostname and path, separated by a colon"
                    .to_string(),
            );
        };
        if addr.is_empty() || path.is_empty() {
            return Err(
                "remote must include both the hostname and path, separated by a colon"
                    .to_string(),
            );
        }

        let (user, host) = match addr.rsplit_once('@') {
            Some((user, host)) => (Some(user.to_string()), host.to_string()),
            None => (None, addr.to_string()),
        };
        if host.is_empty() {
            return Err("remote hostname is empty".to_string());
        }

        Ok(RemoteSpec { user, host, path: path.to_string() })
    }
}

#[cfg(test)]
#[path = "remote_spec_tests.rs"]
mod tests;
