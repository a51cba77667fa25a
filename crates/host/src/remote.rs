// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The SSH command-execution environment.
//!
//! Built on the [`openssh`] crate, which shells out to the system OpenSSH
//! binary. That buys full `~/.ssh/config` support, agent forwarding, and
//! ControlMaster multiplexing, so every operation here shares one
//! authenticated connection.
//!
//! Commands run through `sh -c` with single-quote escaping; a working
//! directory becomes a `cd … &&` prefix and the final command is `exec`ed
//! so process names seen by `pkill`/`pgrep` match the real tool, not the
//! wrapping shell.

use std::sync::Arc;

use async_trait::async_trait;
use openssh::{KnownHosts, Session, SessionBuilder, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;

use crate::child::ChildProc;
use crate::{CmdOutput, Host, HostError, HostKind, OsKind};

/// A machine reached over SSH.
pub struct RemoteHost {
    session: Arc<Session>,
    name: String,
    ssh_address: String,
    os: OsKind,
    env_exports: String,
    home: OnceCell<String>,
    hostname: OnceCell<String>,
}

impl RemoteHost {
    /// Open the SSH connection and probe the remote OS.
    pub async fn connect(
        host: &str,
        user: Option<&str>,
        keyfile: Option<&str>,
    ) -> Result<Self, HostError> {
        let mut builder = SessionBuilder::default();
        builder.known_hosts_check(KnownHosts::Accept);
        if let Some(user) = user {
            builder.user(user.to_string());
        }
        if let Some(keyfile) = keyfile {
            builder.keyfile(keyfile);
        }

        let session = builder.connect(host).await.map_err(|e| HostError::RemoteUnreachable {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

        let ssh_address = match user {
            Some(user) => format!("{user}@{host}"),
            None => host.to_string(),
        };

        let mut remote = Self {
            session: Arc::new(session),
            name: host.to_string(),
            ssh_address,
            os: OsKind::Linux,
            env_exports: String::new(),
            home: OnceCell::new(),
            hostname: OnceCell::new(),
        };

        let uname = remote.run_script("uname -s").await?;
        remote.os = if uname.success() {
            OsKind::from_uname(&uname.stdout)
        } else {
            OsKind::Windows
        };
        if remote.os == OsKind::Darwin {
            remote.env_exports = "export PATH=\"$PATH:/usr/local/bin\"; ".to_string();
        }

        Ok(remote)
    }

    /// Run a raw shell snippet on the remote host.
    async fn run_script(&self, script: &str) -> Result<CmdOutput, HostError> {
        let full = format!("{}{script}", self.env_exports);
        let output = self
            .session
            .command("sh")
            .arg("-c")
            .arg(&full)
            .output()
            .await
            .map_err(|e| self.unreachable(e))?;

        Ok(CmdOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn script_for(&self, cwd: Option<&str>, argv: &[&str]) -> String {
        let command =
            argv.iter().map(|arg| sh_quote(arg)).collect::<Vec<_>>().join(" ");
        match cwd {
            Some(dir) => format!("cd {} && exec {command}", sh_quote(dir)),
            None => format!("exec {command}"),
        }
    }

    fn unreachable(&self, e: openssh::Error) -> HostError {
        HostError::RemoteUnreachable { host: self.name.clone(), reason: e.to_string() }
    }

    /// Stream `bytes` into `path` via `cat`, byte-exact.
    async fn write_bytes(&self, path: &str, bytes: &[u8]) -> Result<(), HostError> {
        let script = format!("{}cat > {}", self.env_exports, sh_quote(path));
        let mut cmd = self.session.clone().arc_command("sh");
        cmd.arg("-c").arg(&script);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().await.map_err(|e| self.unreachable(e))?;
        if let Some(mut stdin) = child.stdin().take() {
            stdin.write_all(bytes).await.map_err(|e| HostError::io(path, e))?;
            stdin.shutdown().await.map_err(|e| HostError::io(path, e))?;
        }
        let status = child.wait().await.map_err(|e| self.unreachable(e))?;
        if status.code() != Some(0) {
            return Err(HostError::RemoteOp {
                path: path.to_string(),
                detail: format!("cat exited with {:?}", status.code()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Host for RemoteHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> HostKind {
        HostKind::Remote
    }

    fn os(&self) -> OsKind {
        self.os
    }

    fn ssh_address(&self) -> Option<&str> {
        Some(&self.ssh_address)
    }

    async fn run_in(&self, cwd: Option<&str>, argv: &[&str]) -> Result<CmdOutput, HostError> {
        self.run_script(&self.script_for(cwd, argv)).await
    }

    async fn spawn_in(&self, cwd: Option<&str>, argv: &[&str]) -> Result<ChildProc, HostError> {
        let script = format!("{}{}", self.env_exports, self.script_for(cwd, argv));
        let mut cmd = self.session.clone().arc_command("sh");
        cmd.arg("-c").arg(&script);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().await.map_err(|e| self.unreachable(e))?;
        let stdout = child.stdout().take().map(boxed_read);
        let stderr = child.stderr().take().map(boxed_read);
        let host = self.name.clone();
        let wait = Box::pin(async move {
            let status = child.wait().await.map_err(|e| HostError::RemoteUnreachable {
                host,
                reason: e.to_string(),
            })?;
            Ok(status.code().unwrap_or(-1))
        });

        // OpenSSH cannot report the PID of the far-side process.
        Ok(ChildProc::new(None, stdout, stderr, wait))
    }

    async fn upload(&self, local_src: &str, dest: &str) -> Result<(), HostError> {
        let bytes = tokio::fs::read(local_src).await.map_err(|e| HostError::io(local_src, e))?;
        self.write_bytes(dest, &bytes).await
    }

    async fn read_file(&self, path: &str) -> Result<String, HostError> {
        let out = self.run_script(&format!("cat {}", sh_quote(path))).await?;
        if !out.success() {
            return Err(HostError::RemoteOp {
                path: path.to_string(),
                detail: out.stderr.trim().to_string(),
            });
        }
        Ok(out.stdout)
    }

    async fn write_file(&self, path: &str, contents: &str) -> Result<(), HostError> {
        self.write_bytes(path, contents.as_bytes()).await
    }

    async fn exists(&self, path: &str) -> Result<bool, HostError> {
        Ok(self.run_script(&format!("test -e {}", sh_quote(path))).await?.success())
    }

    async fn is_dir(&self, path: &str) -> Result<bool, HostError> {
        Ok(self.run_script(&format!("test -d {}", sh_quote(path))).await?.success())
    }

    async fn dir_entry_count(&self, path: &str) -> Result<usize, HostError> {
        let out = self.run_script(&format!("ls -A {} | wc -l", sh_quote(path))).await?;
        if !out.success() {
            return Err(HostError::RemoteOp {
                path: path.to_string(),
                detail: out.stderr.trim().to_string(),
            });
        }
        out.stdout.trim().parse().map_err(|_| HostError::RemoteOp {
            path: path.to_string(),
            detail: format!("unexpected wc output: {}", out.stdout.trim()),
        })
    }

    async fn mkdirp(&self, path: &str) -> Result<(), HostError> {
        let out = self.run_script(&format!("mkdir -p {}", sh_quote(path))).await?;
        if !out.success() {
            return Err(HostError::RemoteOp {
                path: path.to_string(),
                detail: out.stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    async fn symlink(&self, target: &str, link: &str) -> Result<(), HostError> {
        let script = format!("ln -sfn {} {}", sh_quote(target), sh_quote(link));
        let out = self.run_script(&script).await?;
        if !out.success() {
            return Err(HostError::RemoteOp {
                path: link.to_string(),
                detail: out.stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<(), HostError> {
        let out = self.run_script(&format!("rm -f {}", sh_quote(path))).await?;
        if !out.success() {
            return Err(HostError::RemoteOp {
                path: path.to_string(),
                detail: out.stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    async fn which(&self, cmd: &str) -> Result<Option<String>, HostError> {
        let out = self.run_script(&format!("command -v {}", sh_quote(cmd))).await?;
        if out.success() {
            Ok(out.stdout_line())
        } else {
            Ok(None)
        }
    }

    async fn home(&self) -> Result<String, HostError> {
        self.home
            .get_or_try_init(|| async {
                let out = self.run_script("printf '%s' \"$HOME\"").await?;
                if out.stdout.is_empty() {
                    Err(HostError::NoHome)
                } else {
                    Ok(out.stdout)
                }
            })
            .await
            .cloned()
    }

    async fn hostname(&self) -> Result<String, HostError> {
        self.hostname
            .get_or_try_init(|| async {
                let out = self.run_script("hostname").await?;
                Ok(out.stdout.trim().to_string())
            })
            .await
            .cloned()
    }

    async fn expand_path(&self, path: &str) -> Result<String, HostError> {
        if path == "~" {
            return self.home().await;
        }
        if let Some(rest) = path.strip_prefix("~/") {
            let home = self.home().await?;
            return Ok(format!("{home}/{rest}"));
        }
        Ok(path.to_string())
    }
}

fn boxed_read<R: tokio::io::AsyncRead + Send + Unpin + 'static>(
    reader: R,
) -> Box<dyn tokio::io::AsyncRead + Send + Unpin> {
    Box::new(reader)
}

/// Single-quote escaping for safe embedding in `sh -c '…'`.
fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
