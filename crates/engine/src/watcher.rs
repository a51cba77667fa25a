// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem watchers.
//!
//! One watcher process per side streams changed paths into the shared
//! event channel. Linux (and the Windows port) use `inotifywait`; macOS
//! uses `fswatch`. A watcher that dies is relaunched through the
//! dependency-resolution retry, under the same PID file.

use std::sync::Arc;

use lockstep_core::{ChangeEvent, Side, DVCS_DIR};
use lockstep_host::{first_available, ChildProc, Host, OsKind};
use lockstep_term::{Console, Writer};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::deps::{retry_with_dependency_resolution, DependencyResolver};
use crate::supervisor::Supervisor;
use crate::EngineError;

/// Everything a watcher needs to run and re-run.
#[derive(Clone)]
pub struct WatcherParams {
    pub host: Arc<dyn Host>,
    pub side: Side,
    /// Absolute sync path (watched root).
    pub sync_path: String,
    pub supervisor: Arc<Supervisor>,
    pub console: Console,
    pub resolver: DependencyResolver,
    pub events: mpsc::Sender<ChangeEvent>,
    pub shutdown: CancellationToken,
}

/// Launch the watcher and keep it running until shutdown.
///
/// The first launch happens inline so a missing tool aborts startup; after
/// that a monitor task relaunches on every exit.
pub async fn install_watcher(params: WatcherParams) -> Result<(), EngineError> {
    let status = params.console.writer(params.host.name(), "watch");
    let child = retry_with_dependency_resolution(
        &params.host,
        params.resolver,
        &status,
        || launch(&params, &status),
    )
    .await?;

    tokio::spawn(monitor(params, status, child));
    Ok(())
}

/// Probe for a watcher tool, kill any previous instance, spawn, register.
async fn launch(params: &WatcherParams, status: &Writer) -> Result<ChildProc, EngineError> {
    let host = &params.host;
    let tool = first_available(host.as_ref(), &["inotifywait", "fswatch"])
        .await?
        .ok_or_else(|| {
            // Name the tool this OS is expected to have so the dependency
            // table can resolve it.
            let wanted =
                if host.os() == OsKind::Darwin { "fswatch" } else { "inotifywait" };
            EngineError::subprocess("watcher probe", &format!("missing {wanted}"))
        })?;

    status.line(&format!(
        "(@dim)Using (@r){tool} (@dim)to listen for changes in (@r)(@path){}(@r)",
        params.sync_path
    ));

    let argv = watcher_argv(&tool, host.os());
    let argv_refs: Vec<&str> = argv.iter().map(String::as_str).collect();

    params.supervisor.kill_previous(host, &tool, &tool).await?;
    let child = host.spawn_in(Some(&params.sync_path), &argv_refs).await?;
    params.supervisor.register(Arc::clone(host), &tool, &tool, child.pid()).await?;
    Ok(child)
}

/// Pump one child until it exits, then relaunch, forever.
async fn monitor(params: WatcherParams, status: Writer, mut child: ChildProc) {
    loop {
        if let Some(stderr) = child.take_stderr() {
            let w = status.clone();
            tokio::spawn(async move { w.quote_stream(stderr).await });
        }

        let stdout = child.take_stdout();
        let pump = async {
            let Some(stdout) = stdout else { return };
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let Some(rel) =
                    relative_to_root(&line, &params.sync_path, params.host.os().separator())
                else {
                    continue;
                };
                debug!(side = %params.side, path = %rel, "change");
                if params.events.send(ChangeEvent::new(params.side, rel)).await.is_err() {
                    break;
                }
            }
        };

        tokio::select! {
            _ = params.shutdown.cancelled() => return,
            _ = pump => {}
        }
        let _ = child.wait().await;

        match relaunch(&params, &status).await {
            Ok(next) => child = next,
            Err(EngineError::ShuttingDown) => return,
            Err(e) => {
                status.line(&format!("(@error)could not restart watcher: {e}(@r)"));
                params.shutdown.cancel();
                return;
            }
        }
    }
}

/// Relaunch after an exit, unless the exit is the session tearing the
/// watcher down.
async fn relaunch(params: &WatcherParams, status: &Writer) -> Result<ChildProc, EngineError> {
    if params.shutdown.is_cancelled() {
        return Err(EngineError::ShuttingDown);
    }
    status.line("(@error)watcher exited(@r)(@dim); restarting...(@r)");
    retry_with_dependency_resolution(&params.host, params.resolver, status, || {
        launch(params, status)
    })
    .await
}

/// Build the watcher command line for this OS.
fn watcher_argv(tool: &str, os: OsKind) -> Vec<String> {
    let mut argv: Vec<String> = vec![tool.to_string()];
    if tool == "fswatch" {
        argv.push("./".to_string());
        return argv;
    }

    argv.extend(["--quiet", "--monitor", "--recursive", "--format"].map(String::from));
    if os.is_windows() {
        // inotify-win: different format placeholder and a different regex
        // engine for --exclude.
        argv.push("%w\\%f".to_string());
        argv.extend(["--exclude".to_string(), format!("\\{DVCS_DIR}($|\\\\)")]);
        argv.extend(["--event".to_string(), "modify,attrib,move,create,delete".to_string()]);
    } else {
        argv.push("%w%f".to_string());
        argv.extend(["--exclude".to_string(), format!("\\{DVCS_DIR}/")]);
        for event in ["modify", "attrib", "move", "create", "delete"] {
            argv.extend(["--event".to_string(), event.to_string()]);
        }
    }
    argv.push("./".to_string());
    argv
}

/// Turn a watcher output line into a path relative to the watched root.
///
/// `inotifywait ./` emits `./a/b`; `fswatch` emits absolute paths.
fn relative_to_root(line: &str, root: &str, separator: char) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let root_prefix = format!("{}{separator}", root.trim_end_matches(separator));
    if let Some(rel) = trimmed.strip_prefix(&root_prefix) {
        if rel.is_empty() {
            return None;
        }
        return Some(rel.to_string());
    }
    if trimmed == root {
        return None;
    }

    let dot_prefix = format!(".{separator}");
    let rel = trimmed.strip_prefix(&dot_prefix).unwrap_or(trimmed);
    if rel.is_empty() || rel.starts_with(separator) {
        return None;
    }
    Some(rel.to_string())
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
