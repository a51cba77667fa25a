// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The local command-execution environment.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::child::ChildProc;
use crate::{CmdOutput, Host, HostError, HostKind, OsKind};

/// The machine lockstep itself runs on.
pub struct LocalHost {
    os: OsKind,
    env: Vec<(String, String)>,
    home: OnceCell<String>,
    hostname: OnceCell<String>,
}

impl LocalHost {
    pub fn new() -> Self {
        let os = match std::env::consts::OS {
            "macos" => OsKind::Darwin,
            "windows" => OsKind::Windows,
            _ => OsKind::Linux,
        };
        Self { os, env: path_overrides(os), home: OnceCell::new(), hostname: OnceCell::new() }
    }

    fn command(&self, cwd: Option<&str>, argv: &[&str]) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(argv[0]);
        cmd.args(&argv[1..]);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }

    fn search_path(&self) -> String {
        self.env
            .iter()
            .find(|(key, _)| key == "PATH")
            .map(|(_, value)| value.clone())
            .or_else(|| std::env::var("PATH").ok())
            .unwrap_or_default()
    }
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Environment overrides applied to every command.
///
/// Homebrew installs into /usr/local/bin, which login-shell-less contexts
/// often miss on macOS. On Windows the watcher port lives in the state dir.
fn path_overrides(os: OsKind) -> Vec<(String, String)> {
    let path = std::env::var("PATH").unwrap_or_default();
    match os {
        OsKind::Darwin => vec![("PATH".to_string(), format!("{path}:/usr/local/bin"))],
        OsKind::Windows => match dirs::home_dir() {
            Some(home) => {
                let watcher_dir = home.join(".lockstep").join("inotify-win");
                vec![("PATH".to_string(), format!("{path};{}", watcher_dir.display()))]
            }
            None => vec![],
        },
        OsKind::Linux => vec![],
    }
}

#[async_trait]
impl Host for LocalHost {
    fn name(&self) -> &str {
        "localhost"
    }

    fn kind(&self) -> HostKind {
        HostKind::Local
    }

    fn os(&self) -> OsKind {
        self.os
    }

    fn ssh_address(&self) -> Option<&str> {
        None
    }

    async fn run_in(&self, cwd: Option<&str>, argv: &[&str]) -> Result<CmdOutput, HostError> {
        let output = self
            .command(cwd, argv)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| HostError::CommandFailed { command: argv[0].to_string(), source })?;

        Ok(CmdOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn spawn_in(&self, cwd: Option<&str>, argv: &[&str]) -> Result<ChildProc, HostError> {
        let mut child = self
            .command(cwd, argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| HostError::CommandFailed { command: argv[0].to_string(), source })?;

        let pid = child.id();
        let stdout = child.stdout.take().map(boxed_read);
        let stderr = child.stderr.take().map(boxed_read);
        let command = argv[0].to_string();
        let wait = Box::pin(async move {
            let status = child
                .wait()
                .await
                .map_err(|source| HostError::CommandFailed { command, source })?;
            Ok(status.code().unwrap_or(-1))
        });

        Ok(ChildProc::new(pid, stdout, stderr, wait))
    }

    async fn upload(&self, local_src: &str, dest: &str) -> Result<(), HostError> {
        tokio::fs::copy(local_src, dest).await.map_err(|e| HostError::io(dest, e))?;
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String, HostError> {
        tokio::fs::read_to_string(path).await.map_err(|e| HostError::io(path, e))
    }

    async fn write_file(&self, path: &str, contents: &str) -> Result<(), HostError> {
        tokio::fs::write(path, contents).await.map_err(|e| HostError::io(path, e))
    }

    async fn exists(&self, path: &str) -> Result<bool, HostError> {
        Ok(tokio::fs::try_exists(path).await.unwrap_or(false))
    }

    async fn is_dir(&self, path: &str) -> Result<bool, HostError> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(_) => Ok(false),
        }
    }

    async fn dir_entry_count(&self, path: &str) -> Result<usize, HostError> {
        let mut entries =
            tokio::fs::read_dir(path).await.map_err(|e| HostError::io(path, e))?;
        let mut count = 0;
        while let Some(_entry) =
            entries.next_entry().await.map_err(|e| HostError::io(path, e))?
        {
            count += 1;
        }
        Ok(count)
    }

    async fn mkdirp(&self, path: &str) -> Result<(), HostError> {
        tokio::fs::create_dir_all(path).await.map_err(|e| HostError::io(path, e))
    }

    async fn symlink(&self, target: &str, link: &str) -> Result<(), HostError> {
        if tokio::fs::symlink_metadata(link).await.is_ok() {
            tokio::fs::remove_file(link).await.map_err(|e| HostError::io(link, e))?;
        }
        #[cfg(unix)]
        {
            tokio::fs::symlink(target, link).await.map_err(|e| HostError::io(link, e))
        }
        #[cfg(windows)]
        {
            tokio::fs::symlink_dir(target, link).await.map_err(|e| HostError::io(link, e))
        }
    }

    async fn remove_file(&self, path: &str) -> Result<(), HostError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HostError::io(path, e)),
        }
    }

    async fn which(&self, cmd: &str) -> Result<Option<String>, HostError> {
        let path_var = self.search_path();
        for dir in std::env::split_paths(&path_var) {
            let candidate = dir.join(cmd);
            if is_executable(&candidate) {
                return Ok(Some(candidate.to_string_lossy().into_owned()));
            }
            if self.os.is_windows() {
                let exe = dir.join(format!("{cmd}.exe"));
                if exe.is_file() {
                    return Ok(Some(exe.to_string_lossy().into_owned()));
                }
            }
        }
        Ok(None)
    }

    async fn home(&self) -> Result<String, HostError> {
        self.home
            .get_or_try_init(|| async {
                dirs::home_dir()
                    .map(|p: PathBuf| p.to_string_lossy().into_owned())
                    .ok_or(HostError::NoHome)
            })
            .await
            .cloned()
    }

    async fn hostname(&self) -> Result<String, HostError> {
        self.hostname
            .get_or_try_init(|| async {
                let out = self.run_in(None, &["hostname"]).await?;
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

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata().map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0).unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
