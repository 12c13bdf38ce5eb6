//! Configuration loaded from ~/.config/termtris/config.toml
//!
//! Load-or-default: a missing or unparseable file just means defaults.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where player records, the leaderboard and logs live;
    /// defaults to the platform data directory.
    pub data_dir: Option<PathBuf>,
    /// Default tracing directive, overridable via RUST_LOG
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            log_filter: "termtris=info".to_string(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "termtris", "termtris")
}

impl Config {
    fn config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from file, or fall back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Resolve and create the data directory
    pub fn data_dir(&self) -> Result<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => project_dirs()
                .context("could not determine a data directory")?
                .data_local_dir()
                .to_path_buf(),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating data dir {}", dir.display()))?;
        Ok(dir)
    }

    pub fn players_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("players.json"))
    }

    pub fn leaderboard_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("leaderboard.json"))
    }
}
