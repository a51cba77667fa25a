// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn no_color_env_disables_styles() {
    // Env-var tests share process state; set and restore around the check.
    std::env::set_var("NO_COLOR", "1");
    assert!(!should_colorize());
    assert_eq!(
        format!("{:?}", styles()),
        format!("{:?}", clap::builder::styling::Styles::plain())
    );
    std::env::remove_var("NO_COLOR");
}
