// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted host double for engine tests.
//!
//! Commands are matched by substring against the joined argv and answered
//! from canned outputs; file operations run against an in-memory map. Every
//! call is recorded so tests can assert on invocation order.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use lockstep_host::{ChildProc, CmdOutput, Host, HostError, HostKind, OsKind};
use parking_lot::Mutex;

pub(crate) fn ok(stdout: &str) -> CmdOutput {
    CmdOutput { exit_code: 0, stdout: stdout.to_string(), stderr: String::new() }
}

pub(crate) fn fail(exit_code: i32, stderr: &str) -> CmdOutput {
    CmdOutput { exit_code, stdout: String::new(), stderr: stderr.to_string() }
}

struct Rule {
    pattern: String,
    responses: VecDeque<CmdOutput>,
    last: CmdOutput,
}

pub(crate) struct ScriptedHost {
    name: String,
    kind: HostKind,
    os: OsKind,
    calls: Mutex<Vec<String>>,
    rules: Mutex<Vec<Rule>>,
    files: Mutex<HashMap<String, String>>,
    dirs: Mutex<HashSet<String>>,
    entry_counts: Mutex<HashMap<String, usize>>,
    installed: Mutex<HashSet<String>>,
}

impl ScriptedHost {
    pub(crate) fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            kind: HostKind::Local,
            os: OsKind::Linux,
            calls: Mutex::new(Vec::new()),
            rules: Mutex::new(Vec::new()),
            files: Mutex::new(HashMap::new()),
            dirs: Mutex::new(HashSet::new()),
            entry_counts: Mutex::new(HashMap::new()),
            installed: Mutex::new(HashSet::new()),
        })
    }

    pub(crate) fn windows(name: &str) -> Arc<Self> {
        let mut host = Self::new(name);
        // Arc::new just happened; nobody else can hold a reference yet.
        if let Some(h) = Arc::get_mut(&mut host) {
            h.os = OsKind::Windows;
        }
        host
    }

    /// Answer every command containing `pattern` with `output`.
    pub(crate) fn on(&self, pattern: &str, output: CmdOutput) {
        self.on_seq(pattern, vec![output]);
    }

    /// Answer successive matching commands from `outputs`, repeating the
    /// final one once the sequence is exhausted.
    pub(crate) fn on_seq(&self, pattern: &str, outputs: Vec<CmdOutput>) {
        let last = outputs.last().cloned().unwrap_or_else(|| ok(""));
        self.rules.lock().push(Rule {
            pattern: pattern.to_string(),
            responses: outputs.into(),
            last,
        });
    }

    /// Mark a tool as present for `which`.
    pub(crate) fn install_tool(&self, tool: &str) {
        self.installed.lock().insert(tool.to_string());
    }

    pub(crate) fn add_dir(&self, path: &str) {
        self.dirs.lock().insert(path.to_string());
    }

    pub(crate) fn set_entry_count(&self, path: &str, count: usize) {
        self.entry_counts.lock().insert(path.to_string(), count);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub(crate) fn calls_matching(&self, pattern: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.contains(pattern)).count()
    }

    pub(crate) fn file(&self, path: &str) -> Option<String> {
        self.files.lock().get(path).cloned()
    }

    fn respond(&self, joined: &str) -> CmdOutput {
        let mut rules = self.rules.lock();
        for rule in rules.iter_mut() {
            if joined.contains(&rule.pattern) {
                return match rule.responses.pop_front() {
                    Some(out) => out,
                    None => rule.last.clone(),
                };
            }
        }
        ok("")
    }
}

#[async_trait]
impl Host for ScriptedHost {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> HostKind {
        self.kind
    }

    fn os(&self) -> OsKind {
        self.os
    }

    fn ssh_address(&self) -> Option<&str> {
        None
    }

    async fn run_in(&self, _cwd: Option<&str>, argv: &[&str]) -> Result<CmdOutput, HostError> {
        let joined = argv.join(" ");
        self.calls.lock().push(joined.clone());
        Ok(self.respond(&joined))
    }

    async fn spawn_in(&self, _cwd: Option<&str>, argv: &[&str]) -> Result<ChildProc, HostError> {
        let joined = format!("spawn {}", argv.join(" "));
        self.calls.lock().push(joined);
        // A child that never exits and produces no output; supervision
        // paths only need the spawn recorded.
        Ok(ChildProc::new(Some(4242), None, None, Box::pin(std::future::pending())))
    }

    async fn upload(&self, local_src: &str, dest: &str) -> Result<(), HostError> {
        self.calls.lock().push(format!("upload {local_src} {dest}"));
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String, HostError> {
        self.files.lock().get(path).cloned().ok_or_else(|| HostError::RemoteOp {
            path: path.to_string(),
            detail: "no such file".to_string(),
        })
    }

    async fn write_file(&self, path: &str, contents: &str) -> Result<(), HostError> {
        self.files.lock().insert(path.to_string(), contents.to_string());
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, HostError> {
        Ok(self.files.lock().contains_key(path) || self.dirs.lock().contains(path))
    }

    async fn is_dir(&self, path: &str) -> Result<bool, HostError> {
        Ok(self.dirs.lock().contains(path))
    }

    async fn dir_entry_count(&self, path: &str) -> Result<usize, HostError> {
        Ok(self.entry_counts.lock().get(path).copied().unwrap_or(0))
    }

    async fn mkdirp(&self, path: &str) -> Result<(), HostError> {
        self.dirs.lock().insert(path.to_string());
        Ok(())
    }

    async fn symlink(&self, target: &str, link: &str) -> Result<(), HostError> {
        self.calls.lock().push(format!("symlink {target} {link}"));
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<(), HostError> {
        self.files.lock().remove(path);
        Ok(())
    }

    async fn which(&self, cmd: &str) -> Result<Option<String>, HostError> {
        if self.installed.lock().contains(cmd) {
            Ok(Some(format!("/usr/bin/{cmd}")))
        } else {
            Ok(None)
        }
    }

    async fn home(&self) -> Result<String, HostError> {
        Ok("/home/test".to_string())
    }

    async fn hostname(&self) -> Result<String, HostError> {
        Ok(format!("{}-box", self.name))
    }

    async fn expand_path(&self, path: &str) -> Result<String, HostError> {
        if let Some(rest) = path.strip_prefix("~/") {
            return Ok(format!("/home/test/{rest}"));
        }
        Ok(path.to_string())
    }
}

/// State directory every scripted host reports.
pub(crate) const STATE_DIR: &str = "/home/test/.lockstep";
