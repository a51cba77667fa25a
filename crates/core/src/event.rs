// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change events emitted by the filesystem watchers.

use crate::layout::{DVCS_DIR, IGNORE_FILE};
use crate::side::Side;

/// A single changed path, relative to the sync root of `side`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub side: Side,
    pub path: String,
}

impl ChangeEvent {
    pub fn new(side: Side, path: impl Into<String>) -> Self {
        Self { side, path: path.into() }
    }
}

/// How the sync loop should treat an incoming event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    /// A regular tracked-tree change.
    Changed,
    /// The change touched an ignore-rules file; the next commit for this
    /// side must also untrack newly-ignored files.
    ChangedIgnoreRules,
    /// Inside the tug metadata directory. The watchers already exclude
    /// these, so this is defensive.
    Metadata,
}

/// Classify a relative path for the sync loop.
pub fn classify(path: &str, separator: char) -> EventClass {
    let mut last = "";
    for component in path.split(separator) {
        if component == DVCS_DIR {
            return EventClass::Metadata;
        }
        last = component;
    }
    if last == IGNORE_FILE {
        EventClass::ChangedIgnoreRules
    } else {
        EventClass::Changed
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
