// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervised-process registry.
//!
//! Long-running children (tug daemons, watchers, the tunnel) are tracked by
//! `(host, name)` with a PID file under the host's state directory. This is
//! a flat registry, not a process tree: half of these children live on the
//! other end of an SSH connection. At most one live process exists per
//! `(host, name)`: every registration is preceded by a kill of the previous
//! PID-file owner.

use std::sync::Arc;
use std::time::Duration;

use lockstep_core::pidfile_path;
use lockstep_host::{Host, HostError};
use lockstep_term::Writer;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::state::state_dir;
use crate::EngineError;

struct Entry {
    host: Arc<dyn Host>,
    name: String,
    /// Process-image pattern handed to `pkill` (the daemon's PID file is
    /// named `daemon.pid` but its image is `tug`).
    pattern: String,
}

/// Registry of supervised processes, ordered by registration.
#[derive(Default)]
pub struct Supervisor {
    entries: Mutex<Vec<Entry>>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill whatever process the `(host, name)` PID file still names, then
    /// remove the file. Quiet when the file is absent or the process has
    /// already exited.
    pub async fn kill_previous(
        &self,
        host: &Arc<dyn Host>,
        name: &str,
        pattern: &str,
    ) -> Result<(), EngineError> {
        let pidfile = pidfile_path(&state_dir(host.as_ref()).await?, name);
        if !host.exists(&pidfile).await? {
            return Ok(());
        }

        if host.os().is_windows() {
            kill_windows(host.as_ref(), &pidfile, pattern).await?;
        } else {
            // pkill matches the PID file against the live process image, so
            // a recycled PID belonging to someone else is left alone.
            match host.run_in(None, &["pkill", "-F", &pidfile, pattern]).await {
                Ok(out) => debug!(name, exit = out.exit_code, "pkill -F"),
                Err(HostError::CommandFailed { .. }) => {
                    return Err(EngineError::DependencyMissing("pkill".to_string()));
                }
                Err(e) => return Err(e.into()),
            }
        }

        host.remove_file(&pidfile).await?;
        Ok(())
    }

    /// Persist a child's PID and start tracking it.
    ///
    /// When the spawning API cannot report a PID (remote children), the
    /// newest process matching `pattern` is looked up via `pgrep -n`.
    pub async fn register(
        &self,
        host: Arc<dyn Host>,
        name: &str,
        pattern: &str,
        pid: Option<u32>,
    ) -> Result<(), EngineError> {
        let pidfile = pidfile_path(&state_dir(host.as_ref()).await?, name);

        let pid = match pid {
            Some(pid) => Some(pid.to_string()),
            None => {
                let out = host.run_in(None, &["pgrep", "-n", pattern]).await?;
                out.stdout_line()
            }
        };

        match pid {
            Some(pid) => {
                host.write_file(&pidfile, &pid).await?;
                self.track(host, name, pattern);
            }
            None => {
                warn!(name, host = host.name(), "could not determine PID; not tracking");
            }
        }
        Ok(())
    }

    /// Track a process that maintains its own PID file (the tug daemon
    /// writes one via `--pid-file`).
    ///
    /// Idempotent per `(host, name)`: a restarted watcher re-registers
    /// under its existing entry rather than growing the table.
    pub fn track(&self, host: Arc<dyn Host>, name: &str, pattern: &str) {
        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.host.name() == host.name() && e.name == name) {
            return;
        }
        entries.push(Entry { host, name: name.to_string(), pattern: pattern.to_string() });
    }

    /// Number of tracked processes (diagnostics / tests).
    pub fn tracked(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .iter()
            .map(|e| (e.host.name().to_string(), e.name.clone()))
            .collect()
    }

    /// Terminate everything, in registration order.
    ///
    /// Each entry gets up to 3 attempts with a 1 s pause; failures are
    /// reported and skipped so one stuck child cannot block shutdown.
    pub async fn shutdown_all(&self, status: &Writer) {
        let entries: Vec<(Arc<dyn Host>, String, String)> = {
            let mut entries = self.entries.lock();
            entries.drain(..).map(|e| (e.host, e.name, e.pattern)).collect()
        };

        for (host, name, pattern) in entries {
            status.out(&format!(
                "(@dim)Shutting down (@r){name}(@dim) on (@r){}(@dim)...(@r)",
                host.name()
            ));
            let mut retries = 3;
            loop {
                match self.kill_previous(&host, &name, &pattern).await {
                    Ok(()) => {
                        status.line("(@dim) done.(@r)");
                        break;
                    }
                    Err(e) => {
                        retries -= 1;
                        if retries == 0 {
                            status.line(&format!("(@error) failed: {e}(@r)"));
                            break;
                        }
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }
}

/// Windows variant: verify via `tasklist` that the PID still belongs to the
/// expected image before killing it.
async fn kill_windows(host: &dyn Host, pidfile: &str, pattern: &str) -> Result<(), EngineError> {
    let pid = host.read_file(pidfile).await?.trim().to_string();
    if pid.is_empty() {
        return Ok(());
    }
    let pid_filter = format!("PID eq {pid}");
    let image_filter = format!("IMAGENAME eq {pattern}.exe");
    let out = host.run_in(None, &["tasklist", "/fi", &pid_filter, "/fi", &image_filter]).await?;

    let alive =
        out.stdout.contains(pattern) && out.stdout.contains(&pid) && !out.stdout.contains("No tasks");
    if alive {
        let _ = host.run_in(None, &["kill", "-f", &pid]).await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
