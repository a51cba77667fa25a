// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Missing-dependency detection and resolution.
//!
//! External tools fail in recognizable ways; the pattern table below maps
//! failure text back to the package that provides the tool. With
//! `--install-deps` the resolver drives the host's package manager and the
//! failed operation is retried once; a second failure of the same
//! dependency is fatal.

use std::future::Future;
use std::sync::Arc;

use lockstep_host::Host;
use lockstep_term::Writer;

use crate::EngineError;

/// Failure-text fragments and the package that fixes them.
///
/// Some systems phrase it "not found", others "command not found"; the
/// lookup tries both.
const DEPENDENCY_ERROR_MAP: &[(&str, &str)] = &[
    ("autoconf: not found", "autoconf"),
    ("msgfmt: not found", "gettext"),
    ("missing fswatch", "fswatch"),
    ("missing inotifywait", "inotify-tools"),
];

/// Map failure text to a known missing dependency.
pub fn divine_missing_dependency(text: &str) -> Option<&'static str> {
    for (pattern, name) in DEPENDENCY_ERROR_MAP {
        if text.contains(pattern) {
            return Some(name);
        }
        let alt = pattern.replace("not found", "command not found");
        if text.contains(&alt) {
            return Some(name);
        }
    }
    None
}

/// Policy knob for whether the resolver may run package managers.
#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver {
    pub auto_install: bool,
}

impl DependencyResolver {
    /// Try to install `name` on `host`, or tell the user how to.
    ///
    /// Returns `Ok(())` only when an install was actually attempted;
    /// everything else is `DependencyMissing`.
    pub async fn install(
        &self,
        host: &dyn Host,
        name: &str,
        status: &Writer,
    ) -> Result<(), EngineError> {
        let has_apt_get = host.which("apt-get").await?.is_some();
        let has_homebrew = host.which("brew").await?.is_some();

        if self.auto_install && (has_apt_get || has_homebrew) {
            status.line(&format!(
                "(@dim)Attempting to automatically install missing dependency (@r){name}(@dim)...(@r)"
            ));
            let out = if has_apt_get {
                status.line(&format!("(@dim)$ sudo apt-get install -y (@r){name}"));
                host.run_in(None, &["sudo", "apt-get", "install", "-y", name]).await?
            } else {
                status.line(&format!("(@dim)$ brew install (@r){name}"));
                host.run_in(None, &["brew", "install", name]).await?
            };
            if out.success() {
                return Ok(());
            }
            status.line(&format!("(@error)install of {name} failed(@r)"));
            return Err(EngineError::DependencyMissing(name.to_string()));
        }

        status.line(&format!(
            "(@error)You seem to be missing a required dependency, (@r){name}(@error), on {}(@r)",
            host.name()
        ));
        if has_apt_get {
            status.line(&format!("(@dim)To install it: $ sudo apt-get install (@r){name}"));
            status.line("(@dim)Or re-run with (@r)--install-deps(@dim) to do this automatically.(@r)");
        } else if has_homebrew {
            status.line(&format!("(@dim)To install it: $ brew install (@r){name}"));
            status.line("(@dim)Or re-run with (@r)--install-deps(@dim) to do this automatically.(@r)");
        }
        Err(EngineError::DependencyMissing(name.to_string()))
    }
}

/// Run `op`, resolving missing dependencies as they surface.
///
/// Each distinct dependency gets one install attempt followed by one retry
/// of `op`; the same dependency failing twice aborts with the original
/// error.
pub async fn retry_with_dependency_resolution<T, F, Fut>(
    host: &Arc<dyn Host>,
    resolver: DependencyResolver,
    status: &Writer,
    mut op: F,
) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let mut last_missing: Option<&'static str> = None;
    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let Some(name) = divine_missing_dependency(&err.probe_text()) else {
            return Err(err);
        };
        if last_missing == Some(name) {
            return Err(err);
        }

        status.line(&format!("(@error) failed (missing (@r){name}(@error))(@r)"));
        resolver.install(host.as_ref(), name, status).await?;
        status.line("(@dim)Retrying...(@r)");
        last_missing = Some(name);
    }
}

#[cfg(test)]
#[path = "deps_tests.rs"]
mod tests;
