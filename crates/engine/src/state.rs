// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-host state directory (`~/.lockstep`).

use lockstep_core::STATE_DIR_NAME;
use lockstep_host::{Host, HostError};

/// Absolute path of the state directory on `host`.
pub(crate) async fn state_dir(host: &dyn Host) -> Result<String, HostError> {
    let home = host.home().await?;
    Ok(format!("{home}/{STATE_DIR_NAME}"))
}

/// Resolve and create the state directory.
pub(crate) async fn ensure_state_dir(host: &dyn Host) -> Result<String, HostError> {
    let dir = state_dir(host).await?;
    host.mkdirp(&dir).await?;
    Ok(dir)
}
