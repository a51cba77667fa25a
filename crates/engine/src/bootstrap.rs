// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! First-run bootstrap: bring the two repositories into a peerable state.
//!
//! Peerability is decided entirely by the tail hashes (the root commits).
//! Matching hashes just need daemons; a one-sided repo seeds its peer over
//! the wire (cross-seed, never a raw copy); two fresh paths get a new
//! lineage starting from the default ignore file; two unrelated lineages
//! are a fatal misconfiguration.

use std::time::Duration;

use lockstep_term::{markup, Writer};
use tracing::info;

use crate::dvcs::TugRepo;
use crate::ports::PortTriple;
use crate::supervisor::Supervisor;
use crate::EngineError;

/// What bootstrap has to do, decided from `(tail(local), tail(remote))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapPlan {
    /// Hashes match: both repos exist and are compatible.
    StartDaemons,
    /// Local has history, remote is virgin territory.
    SeedRemoteFromLocal,
    /// Remote has history, local is virgin territory.
    SeedLocalFromRemote,
    /// Neither side has a repo yet.
    FreshInit,
}

/// Pure decision table over the two tail hashes.
pub fn plan(
    local_tail: Option<&str>,
    remote_tail: Option<&str>,
) -> Result<BootstrapPlan, EngineError> {
    match (local_tail, remote_tail) {
        (Some(l), Some(r)) if l == r => Ok(BootstrapPlan::StartDaemons),
        (Some(l), Some(r)) => Err(EngineError::IncompatibleRepos {
            local: l.to_string(),
            remote: r.to_string(),
        }),
        (Some(_), None) => Ok(BootstrapPlan::SeedRemoteFromLocal),
        (None, Some(_)) => Ok(BootstrapPlan::SeedLocalFromRemote),
        (None, None) => Ok(BootstrapPlan::FreshInit),
    }
}

/// Drive the plan to completion. Returns the shared tail hash.
///
/// In every branch both daemons are running and both repos carry the same
/// tail hash when this returns.
pub async fn bootstrap(
    local: &TugRepo,
    remote: &TugRepo,
    ports: PortTriple,
    supervisor: &Supervisor,
    status: &Writer,
) -> Result<String, EngineError> {
    let local_tail = local.tail_hash().await?;
    let remote_tail = remote.tail_hash().await?;

    let plan = plan(local_tail.as_deref(), remote_tail.as_deref())?;
    info!(?plan, "bootstrap");

    let tail = match plan {
        BootstrapPlan::StartDaemons => {
            let tail = local_tail.unwrap_or_default();
            local.start_daemon(supervisor, &tail, ports.bind).await?;
            remote.start_daemon(supervisor, &tail, ports.bind).await?;
            tail
        }
        BootstrapPlan::SeedRemoteFromLocal => {
            let tail = local_tail.unwrap_or_default();
            assert_folder_empty(remote).await?;
            status.line("(@dim)Initializing remote repo from local repo...(@r)");
            cross_init(local, remote, &tail, ports, supervisor).await?;
            tail
        }
        BootstrapPlan::SeedLocalFromRemote => {
            let tail = remote_tail.unwrap_or_default();
            assert_folder_empty(local).await?;
            status.line("(@dim)Initializing local folder from remote repo...(@r)");
            cross_init(remote, local, &tail, ports, supervisor).await?;
            tail
        }
        BootstrapPlan::FreshInit => {
            assert_folder_empty(remote).await?;
            assert_folder_empty(local).await?;
            status.line("(@dim)Initializing both local and remote repos...(@r)");
            status.line("(@dim)Initializing local repo first...(@r)");
            local.init().await?;
            local.ensure_initial_commit().await?;
            let tail = local.tail_hash().await?.ok_or_else(|| {
                EngineError::subprocess("tug rev-list", "no root commit after init")
            })?;
            status.line("(@dim)Initializing remote repo from local repo...(@r)");
            cross_init(local, remote, &tail, ports, supervisor).await?;
            tail
        }
    };

    status.line(&format!("(@dim)Repos share base commit [(@r){}(@dim)](@r)", markup::commit(Some(&tail))));
    Ok(tail)
}

/// Seed `dst` from `src` over the wire: daemon on the source, init and
/// pull on the destination, then the destination's own daemon.
async fn cross_init(
    src: &TugRepo,
    dst: &TugRepo,
    tail: &str,
    ports: PortTriple,
    supervisor: &Supervisor,
) -> Result<(), EngineError> {
    src.start_daemon(supervisor, tail, ports.bind).await?;
    dst.init().await?;
    dst.setup_origin(tail, ports.connect).await?;
    pull_with_patience(dst).await?;
    dst.start_daemon(supervisor, tail, ports.bind).await?;
    Ok(())
}

/// The freshly-launched daemon and tunnel may not be accepting yet; give
/// the seeding pull a few attempts before declaring bootstrap failed.
async fn pull_with_patience(repo: &TugRepo) -> Result<(), EngineError> {
    let mut attempts = 3;
    loop {
        match repo.pull().await {
            Ok(()) => return Ok(()),
            Err(e @ EngineError::Subprocess { .. }) => {
                attempts -= 1;
                if attempts == 0 {
                    return Err(e);
                }
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Refuse to seed into anything but a nonexistent path or an empty
/// directory.
async fn assert_folder_empty(repo: &TugRepo) -> Result<(), EngineError> {
    let host = repo.host();
    let path = repo.sync_path();
    if !host.exists(path).await? {
        return Ok(());
    }
    if host.is_dir(path).await? && host.dir_entry_count(path).await? == 0 {
        return Ok(());
    }
    Err(EngineError::DirectoryNotEmpty {
        host: host.name().to_string(),
        path: path.to_string(),
    })
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
