// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::RemoteSpec;
use yare::parameterized;

#[test]
fn host_and_path() {
    let spec = RemoteSpec::parse("devbox:/srv/project").unwrap();
    assert_eq!(spec, RemoteSpec { user: None, host: "devbox".into(), path: "/srv/project".into() });
}

#[test]
fn user_host_and_path() {
    let spec = RemoteSpec::parse("sarah@devbox:~/project").unwrap();
    assert_eq!(
        spec,
        RemoteSpec { user: Some("sarah".into()), host: "devbox".into(), path: "~/project".into() }
    );
}

#[test]
fn only_the_first_colon_splits_the_path() {
    let spec = RemoteSpec::parse("devbox:/odd:name").unwrap();
    assert_eq!(spec.path, "/odd:name");
}

#[test]
fn the_last_at_sign_splits_the_user() {
    let spec = RemoteSpec::parse("we@ird@devbox:/p").unwrap();
    assert_eq!(spec.user.as_deref(), Some("we@ird"));
    assert_eq!(spec.host, "devbox");
}

#[parameterized(
    no_colon = { "devbox" },
    empty_path = { "devbox:" },
    empty_addr = { ":/path" },
    empty_host = { "user@:/path" },
)]
fn malformed_specs_are_rejected(spec: &str) {
    assert!(RemoteSpec::parse(spec).is_err());
}
