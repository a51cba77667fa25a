// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use lockstep_host::Host;
use lockstep_term::Console;
use yare::parameterized;

use super::*;
use crate::test_support::{fail, ok, ScriptedHost};

#[parameterized(
    autoconf = { "sh: autoconf: not found", Some("autoconf") },
    autoconf_bash_phrasing = { "autoconf: command not found", Some("autoconf") },
    gettext = { "make: msgfmt: not found", Some("gettext") },
    fswatch = { "watcher probe: missing fswatch", Some("fswatch") },
    inotify = { "missing inotifywait", Some("inotify-tools") },
    unrelated = { "fatal: repository not found", None },
)]
fn divination(text: &str, expected: Option<&str>) {
    assert_eq!(divine_missing_dependency(text), expected);
}

fn writer() -> lockstep_term::Writer {
    Console::spawn(false).writer("test", "")
}

#[tokio::test]
async fn retry_passes_through_success() {
    let host: Arc<dyn Host> = ScriptedHost::new("h");
    let resolver = DependencyResolver { auto_install: false };
    let result =
        retry_with_dependency_resolution(&host, resolver, &writer(), || async { Ok(7) }).await;
    assert_eq!(result.unwrap(), 7);
}

#[tokio::test]
async fn undivinable_errors_are_fatal_immediately() {
    let host: Arc<dyn Host> = ScriptedHost::new("h");
    let resolver = DependencyResolver { auto_install: true };
    let result: Result<(), _> =
        retry_with_dependency_resolution(&host, resolver, &writer(), || async {
            Err(EngineError::subprocess("tug fetch", "fatal: repository not found"))
        })
        .await;
    assert!(matches!(result, Err(EngineError::Subprocess { .. })));
}

#[tokio::test]
async fn missing_dep_without_auto_install_aborts_with_dependency_error() {
    let scripted = ScriptedHost::new("h");
    scripted.install_tool("apt-get");
    let host: Arc<dyn Host> = scripted;
    let resolver = DependencyResolver { auto_install: false };
    let result: Result<(), _> =
        retry_with_dependency_resolution(&host, resolver, &writer(), || async {
            Err(EngineError::subprocess("watcher probe", "missing fswatch"))
        })
        .await;
    assert!(matches!(result, Err(EngineError::DependencyMissing(name)) if name == "fswatch"));
}

#[tokio::test]
async fn auto_install_retries_the_operation_once() {
    let scripted = ScriptedHost::new("h");
    scripted.install_tool("apt-get");
    scripted.on("apt-get install -y fswatch", ok(""));
    let host: Arc<dyn Host> = scripted.clone();
    let resolver = DependencyResolver { auto_install: true };

    let attempts = Arc::new(parking_lot::Mutex::new(0));
    let counter = Arc::clone(&attempts);
    let result = retry_with_dependency_resolution(&host, resolver, &writer(), move || {
        let counter = Arc::clone(&counter);
        async move {
            let mut n = counter.lock();
            *n += 1;
            if *n == 1 {
                Err(EngineError::subprocess("watcher probe", "missing fswatch"))
            } else {
                Ok("launched")
            }
        }
    })
    .await;

    assert_eq!(result.unwrap(), "launched");
    assert_eq!(*attempts.lock(), 2);
    assert_eq!(scripted.calls_matching("apt-get install -y fswatch"), 1);
}

#[tokio::test]
async fn same_dependency_failing_twice_is_fatal() {
    let scripted = ScriptedHost::new("h");
    scripted.install_tool("brew");
    scripted.on("brew install fswatch", ok(""));
    let host: Arc<dyn Host> = scripted.clone();
    let resolver = DependencyResolver { auto_install: true };

    let result: Result<(), _> =
        retry_with_dependency_resolution(&host, resolver, &writer(), || async {
            Err(EngineError::subprocess("watcher probe", "missing fswatch"))
        })
        .await;

    // One install attempt, then the repeat failure surfaces unchanged.
    assert!(matches!(result, Err(EngineError::Subprocess { .. })));
    assert_eq!(scripted.calls_matching("brew install fswatch"), 1);
}

#[tokio::test]
async fn failed_install_is_a_dependency_error() {
    let scripted = ScriptedHost::new("h");
    scripted.install_tool("apt-get");
    scripted.on("apt-get install -y gettext", fail(100, "E: unable to locate package"));
    let host: Arc<dyn Host> = scripted;
    let resolver = DependencyResolver { auto_install: true };

    let result: Result<(), _> =
        retry_with_dependency_resolution(&host, resolver, &writer(), || async {
            Err(EngineError::subprocess("make", "msgfmt: not found"))
        })
        .await;
    assert!(matches!(result, Err(EngineError::DependencyMissing(name)) if name == "gettext"));
}
