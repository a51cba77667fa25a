// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lockstep: continuous bidirectional sync of a directory tree over SSH.

mod color;
mod remote_spec;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use lockstep_engine::{run_sync, SessionOptions};
use lockstep_host::{Host, LocalHost, RemoteHost};
use lockstep_term::Console;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::remote_spec::RemoteSpec;

#[derive(Parser)]
#[command(
    name = "lockstep",
    about = "Keep a local and a remote directory in continuous sync",
    version,
    styles = color::styles()
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync a local path with [user@]host:path until interrupted
    Sync {
        /// Local directory to sync
        local: String,
        /// Remote destination, e.g. sarah@devbox:~/project
        remote: String,
        /// SSH identity file
        #[arg(short = 'i', long)]
        identity: Option<String>,
        /// Install missing dependencies via apt-get/brew as needed
        #[arg(long)]
        install_deps: bool,
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Diagnostics go to stderr; the console owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let Command::Sync { local, remote, identity, install_deps, no_color } = cli.command;
    match sync(local, remote, identity, install_deps, no_color).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("lockstep: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn sync(
    local_path: String,
    remote: String,
    identity: Option<String>,
    install_deps: bool,
    no_color: bool,
) -> anyhow::Result<()> {
    let spec = RemoteSpec::parse(&remote).map_err(|e| anyhow!(e))?;

    let local_host: Arc<dyn Host> = Arc::new(LocalHost::new());
    let remote_host: Arc<dyn Host> = Arc::new(
        RemoteHost::connect(&spec.host, spec.user.as_deref(), identity.as_deref())
            .await
            .with_context(|| format!("connecting to {}", spec.host))?,
    );

    let console = Console::spawn(!no_color && color::should_colorize());

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("SIGINT received; shutting down");
            signal_token.cancel();
        }
    });

    run_sync(
        local_host,
        remote_host,
        &local_path,
        &spec.path,
        console,
        SessionOptions { auto_install_deps: install_deps },
        shutdown,
    )
    .await
    .context("sync session failed")?;
    Ok(())
}
