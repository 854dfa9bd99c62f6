// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Muster Contributors

//! Daemon lifecycle: configuration, exclusivity lock, errors.

use fs2::FileExt;
use muster_fleet::{ControllerConfig, FleetError};
use muster_radar::{RadarConfig, RadarError};
use serde::Deserialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/muster)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    pub controller: ControllerConfig,
    pub radar: RadarConfig,
}

/// On-disk overlay, all sections optional.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    controller: Option<ControllerConfig>,
    #[serde(default)]
    radar: Option<RadarConfig>,
}

impl Config {
    /// Load configuration for the user-level daemon.
    ///
    /// Resolves the state directory from the environment, overlays an
    /// optional `config.toml`, and validates everything before the service
    /// starts.
    pub fn load() -> Result<Self, LifecycleError> {
        Self::load_from(crate::env::state_dir()?)
    }

    pub fn load_from(state_dir: PathBuf) -> Result<Self, LifecycleError> {
        let config_path = state_dir.join("config.toml");
        let overlay = if config_path.exists() {
            let text = std::fs::read_to_string(&config_path)?;
            toml::from_str::<ConfigFile>(&text)
                .map_err(|e| LifecycleError::ConfigParse(config_path.clone(), e.to_string()))?
        } else {
            ConfigFile::default()
        };

        let config = Self {
            lock_path: state_dir.join("musterd.pid"),
            log_path: state_dir.join("musterd.log"),
            state_dir,
            controller: overlay.controller.unwrap_or_default(),
            radar: overlay.radar.unwrap_or_default(),
        };
        config.controller.validate()?;
        config.radar.validate()?;
        Ok(config)
    }

    /// Take the exclusive daemon lock and record our pid in it.
    ///
    /// The returned file must stay open for the daemon's lifetime; the lock
    /// releases on drop.
    pub fn acquire_lock(&self) -> Result<File, LifecycleError> {
        std::fs::create_dir_all(&self.state_dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        info!(path = %self.lock_path.display(), "daemon lock acquired");
        Ok(file)
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to parse {0}: {1}")]
    ConfigParse(PathBuf, String),

    #[error("Fleet error: {0}")]
    Fleet(#[from] FleetError),

    #[error("Radar error: {0}")]
    Radar(#[from] RadarError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
