// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Port selection for the daemon/tunnel mesh.
//!
//! Three ports are drawn at random from a fixed range and checked against
//! `netstat` output from *both* hosts, so neither side can already be
//! listening (or connected) on them.

use lockstep_core::{MAX_RANDOM_PORT, MIN_RANDOM_PORT};
use lockstep_host::Host;
use rand::seq::SliceRandom;

use crate::EngineError;

/// The three ports a sync session needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortTriple {
    /// Each side's tug daemon listens here, on localhost only.
    pub bind: u16,
    /// Tunneled port that reaches the *other* side's daemon.
    pub connect: u16,
    /// autossh heartbeat port (used on Darwin).
    pub monitor: u16,
}

/// Pick three ports unused on both hosts.
pub async fn find_open_ports(
    local: &dyn Host,
    remote: &dyn Host,
) -> Result<PortTriple, EngineError> {
    let mut netstats = String::new();
    for host in [local, remote] {
        let flag = if host.os().is_windows() { "-an" } else { "-anl" };
        let out = host.run_in(None, &["netstat", flag]).await?;
        netstats.push_str(&out.stdout);
        netstats.push(' ');
    }

    let mut candidates: Vec<u16> = (MIN_RANDOM_PORT..=MAX_RANDOM_PORT).collect();
    candidates.shuffle(&mut rand::thread_rng());

    let picked = pick_unused(&netstats, &candidates, 3)?;
    Ok(PortTriple { bind: picked[0], connect: picked[1], monitor: picked[2] })
}

/// First `n` candidates whose decimal form does not appear in the netstat
/// dump. Textual matching is deliberately coarse (any occurrence counts as
/// taken): false positives just skip a candidate, and the range has a
/// thousand of them.
fn pick_unused(netstat: &str, candidates: &[u16], n: usize) -> Result<Vec<u16>, EngineError> {
    let mut found = Vec::with_capacity(n);
    for &port in candidates {
        if !netstat.contains(&port.to_string()) {
            found.push(port);
            if found.len() == n {
                return Ok(found);
            }
        }
    }
    Err(EngineError::NoPortsAvailable { min: MIN_RANDOM_PORT, max: MAX_RANDOM_PORT })
}

#[cfg(test)]
#[path = "ports_tests.rs"]
mod tests;
