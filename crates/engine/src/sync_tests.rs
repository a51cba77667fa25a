// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use lockstep_core::{ChangeEvent, Side};
use lockstep_host::Host;
use lockstep_term::{Console, Writer};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::dvcs::TugRepo;
use crate::test_support::{fail, ok, ScriptedHost};

const LOCAL_PATH: &str = "/home/test/sync";
const REMOTE_PATH: &str = "/home/test/rsync";

struct Fixture {
    local_host: Arc<ScriptedHost>,
    remote_host: Arc<ScriptedHost>,
    events: mpsc::Sender<ChangeEvent>,
    shutdown: CancellationToken,
    status: Writer,
    sync: SyncLoop,
}

async fn fixture() -> Fixture {
    let console = Console::spawn(false);
    let local_host = ScriptedHost::new("local");
    let remote_host = ScriptedHost::new("remote");
    let local = TugRepo::open(
        Arc::clone(&local_host) as Arc<dyn Host>,
        LOCAL_PATH.to_string(),
        console.clone(),
    )
    .await
    .unwrap();
    let remote = TugRepo::open(
        Arc::clone(&remote_host) as Arc<dyn Host>,
        REMOTE_PATH.to_string(),
        console.clone(),
    )
    .await
    .unwrap();

    let (events, rx) = mpsc::channel(64);
    let shutdown = CancellationToken::new();
    let status = console.writer("test", "sync");
    let sync = SyncLoop::new(local, remote, rx, shutdown.clone(), status.clone());
    Fixture { local_host, remote_host, events, shutdown, status, sync }
}

fn paths(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn commit_without_movement_skips_the_peer_pull() {
    let f = fixture().await;
    f.local_host.on("rev-parse HEAD", ok("aaa\n"));

    f.sync.commit_and_update(Side::Local, &paths(&["x"]), false).await.unwrap();

    assert_eq!(f.local_host.calls_matching("add --all"), 1);
    assert_eq!(f.remote_host.calls_matching("fetch"), 0);
}

#[tokio::test]
async fn a_real_commit_pulls_on_the_peer() {
    let f = fixture().await;
    f.local_host.on_seq("rev-parse HEAD", vec![ok("aaa\n"), ok("bbb\n")]);

    f.sync.commit_and_update(Side::Local, &paths(&["x"]), false).await.unwrap();

    assert_eq!(f.remote_host.calls_matching("fetch origin"), 1);
    assert_eq!(f.remote_host.calls_matching("merge origin/master"), 1);
    // The peer never commits in this round.
    assert_eq!(f.remote_host.calls_matching("add --all"), 0);
}

#[tokio::test]
async fn remote_rounds_flow_toward_local() {
    let f = fixture().await;
    f.remote_host.on_seq("rev-parse HEAD", vec![ok("aaa\n"), ok("bbb\n")]);

    f.sync.commit_and_update(Side::Remote, &paths(&["x"]), false).await.unwrap();

    assert_eq!(f.remote_host.calls_matching("add --all"), 1);
    assert_eq!(f.local_host.calls_matching("fetch origin"), 1);
}

#[tokio::test]
async fn scope_narrows_to_the_common_directory() {
    let f = fixture().await;
    f.local_host.on("rev-parse HEAD", ok("aaa\n"));

    f.sync
        .commit_and_update(Side::Local, &paths(&["a/b/x", "a/b/y"]), false)
        .await
        .unwrap();
    assert_eq!(f.local_host.calls_matching("add --all -- a/b/"), 1);

    f.sync
        .commit_and_update(Side::Local, &paths(&["a/b/x", "a/c/y"]), false)
        .await
        .unwrap();
    assert_eq!(f.local_host.calls_matching("add --all -- a/"), 1);

    f.sync.commit_and_update(Side::Local, &paths(&["x", "y"]), false).await.unwrap();
    assert_eq!(f.local_host.calls_matching("add --all -- ."), 1);
}

#[tokio::test]
async fn empty_path_set_scopes_to_the_whole_tree() {
    let f = fixture().await;
    f.local_host.on("rev-parse HEAD", ok("aaa\n"));

    f.sync.commit_and_update(Side::Local, &BTreeSet::new(), false).await.unwrap();
    assert_eq!(f.local_host.calls_matching("add --all -- ."), 1);
}

#[tokio::test]
async fn prime_commits_remote_first_then_pulls_both() {
    let f = fixture().await;

    f.sync.prime().await.unwrap();

    // Priming always untracks (offline edits may include ignore rules).
    assert_eq!(f.remote_host.calls_matching("ls-files -i --exclude-standard -- ."), 1);
    assert_eq!(f.local_host.calls_matching("ls-files -i --exclude-standard -- ."), 1);
    assert_eq!(f.remote_host.calls_matching("fetch origin"), 1);
    assert_eq!(f.local_host.calls_matching("fetch origin"), 1);

    // On each host the commit round precedes the pull.
    let remote_calls = f.remote_host.calls();
    let commit_idx = remote_calls.iter().position(|c| c.contains("add --all")).unwrap();
    let fetch_idx = remote_calls.iter().position(|c| c.contains("fetch origin")).unwrap();
    assert!(commit_idx < fetch_idx);
}

#[tokio::test(start_paused = true)]
async fn burst_of_events_coalesces_into_one_commit() {
    let f = fixture().await;
    f.local_host.on_seq("rev-parse HEAD", vec![ok("aaa\n"), ok("bbb\n")]);
    let local_host = Arc::clone(&f.local_host);
    let events = f.events.clone();
    let shutdown = f.shutdown.clone();

    let handle = tokio::spawn(f.sync.run());

    for i in 0..50 {
        events.send(ChangeEvent::new(Side::Local, format!("dir/f{i}"))).await.unwrap();
    }
    // Let the debounce window elapse with no further events.
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(local_host.calls_matching("commit --message autocommit"), 1);
    assert_eq!(local_host.calls_matching("add --all -- dir/"), 1);

    shutdown.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn events_in_the_metadata_dir_never_commit() {
    let f = fixture().await;
    let local_host = Arc::clone(&f.local_host);
    let events = f.events.clone();
    let shutdown = f.shutdown.clone();

    let handle = tokio::spawn(f.sync.run());

    events.send(ChangeEvent::new(Side::Local, ".tug/objects/ab/cd")).await.unwrap();
    events.send(ChangeEvent::new(Side::Local, "sub/.tug/HEAD")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(local_host.calls_matching("add --all"), 0);
    assert_eq!(local_host.calls_matching("commit"), 0);

    shutdown.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn ignore_rule_changes_trigger_untracking_on_that_side_only() {
    let f = fixture().await;
    f.local_host.on_seq("rev-parse HEAD", vec![ok("aaa\n"), ok("bbb\n")]);
    f.remote_host.on_seq("rev-parse HEAD", vec![ok("ccc\n"), ok("ddd\n")]);
    let local_host = Arc::clone(&f.local_host);
    let remote_host = Arc::clone(&f.remote_host);
    let events = f.events.clone();
    let shutdown = f.shutdown.clone();

    let handle = tokio::spawn(f.sync.run());

    events.send(ChangeEvent::new(Side::Local, ".tugignore")).await.unwrap();
    events.send(ChangeEvent::new(Side::Remote, "plain.txt")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(local_host.calls_matching("ls-files -i"), 1);
    assert_eq!(remote_host.calls_matching("ls-files -i"), 0);
    // Both sides still committed their changes.
    assert_eq!(local_host.calls_matching("commit --message autocommit"), 1);
    assert_eq!(remote_host.calls_matching("commit --message autocommit"), 1);

    shutdown.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn the_ignore_marker_clears_after_its_round() {
    let f = fixture().await;
    f.local_host.on_seq(
        "rev-parse HEAD",
        vec![ok("a1\n"), ok("a2\n"), ok("a3\n"), ok("a4\n")],
    );
    let local_host = Arc::clone(&f.local_host);
    let events = f.events.clone();
    let shutdown = f.shutdown.clone();

    let handle = tokio::spawn(f.sync.run());

    events.send(ChangeEvent::new(Side::Local, ".tugignore")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    events.send(ChangeEvent::new(Side::Local, "plain.txt")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    // Untracking ran for the first round only.
    assert_eq!(local_host.calls_matching("ls-files -i"), 1);
    assert_eq!(local_host.calls_matching("commit --message autocommit"), 2);

    shutdown.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn a_failed_round_does_not_stop_the_loop() {
    let f = fixture().await;
    f.local_host.on_seq("rev-parse HEAD", vec![ok("a1\n"), ok("a2\n"), ok("a3\n"), ok("a4\n")]);
    f.remote_host.on_seq("fetch origin", vec![fail(128, "fatal: unable to connect"), ok("")]);
    let remote_host = Arc::clone(&f.remote_host);
    let events = f.events.clone();
    let shutdown = f.shutdown.clone();

    let handle = tokio::spawn(f.sync.run());

    events.send(ChangeEvent::new(Side::Local, "one.txt")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    // The next event re-drives the cycle after the failed fetch.
    events.send(ChangeEvent::new(Side::Local, "two.txt")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(remote_host.calls_matching("fetch origin"), 2);
    assert_eq!(remote_host.calls_matching("merge origin/master"), 1);

    shutdown.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn a_failed_round_is_reported() {
    let f = fixture().await;
    f.local_host.on("ls-files", fail(1, "boom"));

    f.sync.round(Side::Local, &paths(&["x"]), true).await;

    assert!(f.status.captured().contains("Error during commit-and-pull"));
}

#[tokio::test]
async fn failures_racing_teardown_stay_quiet() {
    let f = fixture().await;
    f.local_host.on("ls-files", fail(1, "boom"));
    f.shutdown.cancel();

    f.sync.round(Side::Local, &paths(&["x"]), true).await;

    assert_eq!(f.status.captured(), "");
}

#[tokio::test(start_paused = true)]
async fn closing_the_event_channel_ends_the_loop() {
    let f = fixture().await;
    let Fixture { events, sync, .. } = f;
    let handle = tokio::spawn(sync.run());

    drop(events);
    handle.await.unwrap().unwrap();
}
