// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The SSH tunnel between the two tug daemons.
//!
//! A single connection forwards `connect_port` on each side to `bind_port`
//! on the other (`-L` one way, `-R` the other). `autossh` is preferred
//! because it re-establishes dropped tunnels; with plain `ssh` a drop
//! surfaces as failed fetches until the session is restarted.

use std::sync::Arc;
use std::time::Duration;

use lockstep_host::{first_available, Host};
use lockstep_term::Console;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ports::PortTriple;
use crate::supervisor::Supervisor;
use crate::EngineError;

/// Launch the tunnel from the local host toward `ssh_address`.
pub async fn start_tunnel(
    local: &Arc<dyn Host>,
    ssh_address: &str,
    ports: PortTriple,
    supervisor: &Supervisor,
    console: &Console,
) -> Result<(), EngineError> {
    let tool = first_available(local.as_ref(), &["autossh", "ssh"])
        .await?
        .ok_or_else(|| EngineError::DependencyMissing("ssh".to_string()))?;

    supervisor.kill_previous(local, &tool, &tool).await?;

    let forward = format!("{}:localhost:{}", ports.connect, ports.bind);
    let monitor = ports.monitor.to_string();
    let mut argv: Vec<&str> = vec![tool.as_str()];
    if tool == "autossh" && local.os() == lockstep_host::OsKind::Darwin {
        argv.extend(["-M", monitor.as_str()]);
    }
    argv.extend(["-N", "-L", forward.as_str(), "-R", forward.as_str(), ssh_address]);

    let mut child = local.spawn_in(None, &argv).await?;
    supervisor.register(Arc::clone(local), &tool, &tool, child.pid()).await?;

    let writer = console.writer(local.name(), &tool);
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
            Ok(code) => writer.line(&format!("(@dim)tunnel exited with code {code}(@r)")),
            Err(e) => writer.line(&format!("(@error)tunnel wait failed: {e}(@r)")),
        }
    });

    Ok(())
}

/// Wait for the tunnel's local listener to accept connections.
///
/// `-L` binds `localhost:connect_port` on this side as soon as the tunnel
/// is up, so polling it beats the fixed post-launch sleep the problem
/// otherwise calls for. Gives up quietly after `limit`; the first pull's
/// failure handling covers the remainder of the race.
pub async fn wait_ready(connect_port: u16, limit: Duration, shutdown: &CancellationToken) {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if shutdown.is_cancelled() || tokio::time::Instant::now() >= deadline {
            return;
        }
        match tokio::net::TcpStream::connect(("127.0.0.1", connect_port)).await {
            Ok(_) => return,
            Err(e) => debug!(port = connect_port, error = %e, "tunnel not ready"),
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}
