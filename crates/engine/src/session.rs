// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A full sync session: startup sequencing, the loop, and teardown.

use std::sync::Arc;
use std::time::Duration;

use lockstep_core::{ChangeEvent, Side};
use lockstep_host::Host;
use lockstep_term::{markup, Console};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::deps::DependencyResolver;
use crate::dvcs::TugRepo;
use crate::sync::SyncLoop;
use crate::watcher::{install_watcher, WatcherParams};
use crate::{bootstrap, ports, state, tunnel, EngineError, Supervisor};

/// Knobs carried in from the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Allow the dependency resolver to drive apt-get / brew.
    pub auto_install_deps: bool,
}

/// How long to poll for the tunnel listener before the first pull.
const TUNNEL_READY_LIMIT: Duration = Duration::from_secs(5);

/// Watcher bursts outrun commits; keep a generous event backlog.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Run one sync session to completion (shutdown or fatal error).
///
/// Startup errors propagate; once the loop is running, per-round errors
/// are contained inside it. Supervised children are torn down on every
/// exit path.
pub async fn run_sync(
    local_host: Arc<dyn Host>,
    remote_host: Arc<dyn Host>,
    local_path: &str,
    remote_path: &str,
    console: Console,
    options: SessionOptions,
    shutdown: CancellationToken,
) -> Result<(), EngineError> {
    let supervisor = Arc::new(Supervisor::new());
    let status = console.writer("lockstep", "");

    let result = run_inner(
        local_host,
        remote_host,
        local_path,
        remote_path,
        &console,
        options,
        &supervisor,
        shutdown,
    )
    .await;

    supervisor.shutdown_all(&status).await;
    result
}

#[allow(clippy::too_many_arguments)]
async fn run_inner(
    local_host: Arc<dyn Host>,
    remote_host: Arc<dyn Host>,
    local_path: &str,
    remote_path: &str,
    console: &Console,
    options: SessionOptions,
    supervisor: &Arc<Supervisor>,
    shutdown: CancellationToken,
) -> Result<(), EngineError> {
    let status = console.writer("lockstep", "");
    let resolver = DependencyResolver { auto_install: options.auto_install_deps };

    let local_path = local_host.expand_path(local_path).await?;
    let remote_path = remote_host.expand_path(remote_path).await?;

    state::ensure_state_dir(local_host.as_ref()).await?;
    state::ensure_state_dir(remote_host.as_ref()).await?;

    let local_repo =
        TugRepo::open(Arc::clone(&local_host), local_path.clone(), console.clone()).await?;
    let remote_repo =
        TugRepo::open(Arc::clone(&remote_host), remote_path.clone(), console.clone()).await?;
    local_repo.check_binary().await?;
    remote_repo.check_binary().await?;

    status.line(&format!(
        "(@dim)Syncing (@r){}(@dim) with (@r){}:{}",
        markup::path(&local_path),
        markup::host(remote_host.name()),
        markup::path(&remote_path)
    ));

    let ports = ports::find_open_ports(local_host.as_ref(), remote_host.as_ref()).await?;

    let ssh_address =
        remote_host.ssh_address().unwrap_or_else(|| remote_host.name()).to_string();
    tunnel::start_tunnel(&local_host, &ssh_address, ports, supervisor, console).await?;
    tunnel::wait_ready(ports.connect, TUNNEL_READY_LIMIT, &shutdown).await;
    if shutdown.is_cancelled() {
        return Ok(());
    }

    let tail = bootstrap::bootstrap(&local_repo, &remote_repo, ports, supervisor, &status).await?;
    local_repo.setup_origin(&tail, ports.connect).await?;
    remote_repo.setup_origin(&tail, ports.connect).await?;

    let (events_tx, events_rx) = mpsc::channel::<ChangeEvent>(EVENT_CHANNEL_CAPACITY);
    for (host, side, path) in [
        (&local_host, Side::Local, &local_path),
        (&remote_host, Side::Remote, &remote_path),
    ] {
        install_watcher(WatcherParams {
            host: Arc::clone(host),
            side,
            sync_path: path.clone(),
            supervisor: Arc::clone(supervisor),
            console: console.clone(),
            resolver,
            events: events_tx.clone(),
            shutdown: shutdown.clone(),
        })
        .await?;
    }
    // The loop must see channel closure only when the watchers are gone.
    drop(events_tx);

    let sync = SyncLoop::new(
        local_repo,
        remote_repo,
        events_rx,
        shutdown.clone(),
        console.writer("lockstep", "sync"),
    );
    sync.prime().await?;
    sync.run().await
}
