// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helpers shared by all spec tests.

#![allow(dead_code)]

use assert_cmd::assert::Assert;
use assert_cmd::Command;

/// Start building a `lockstep` invocation.
#[allow(clippy::unwrap_used)]
pub fn cli() -> Cli {
    Cli { cmd: Command::cargo_bin("lockstep").unwrap() }
}

pub struct Cli {
    cmd: Command,
}

impl Cli {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    /// Run and require exit code 0.
    pub fn passes(mut self) -> Checked {
        Checked { assert: self.cmd.assert().success() }
    }

    /// Run and require a non-zero exit code.
    pub fn fails(mut self) -> Checked {
        Checked { assert: self.cmd.assert().failure() }
    }
}

pub struct Checked {
    assert: Assert,
}

impl Checked {
    pub fn stdout_has(self, needle: &str) -> Self {
        Checked { assert: self.assert.stdout(predicates::str::contains(needle)) }
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        Checked { assert: self.assert.stderr(predicates::str::contains(needle)) }
    }
}
