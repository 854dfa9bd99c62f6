// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: MUSTER_STATE_DIR > XDG_STATE_HOME/muster >
/// ~/.local/state/muster
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("MUSTER_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("muster"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/muster"))
}

/// Log filter directive, e.g. "info" or "muster_fleet=debug".
pub fn log_filter() -> String {
    std::env::var("MUSTER_LOG").unwrap_or_else(|_| "info".to_string())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
