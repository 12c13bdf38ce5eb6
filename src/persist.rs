//! JSON-file-backed stores
//!
//! Thin wrappers around the in-memory stores that reload nothing and
//! rewrite the whole blob after every mutation, in the spirit of
//! load-or-default settings files. A failed write is logged and the
//! in-memory state stays authoritative; sessions never see the error.

use crate::store::{
    LeaderboardEntry, LeaderboardStore, MemoryLeaderboard, MemoryPlayerStore, PlayerRecord,
    PlayerStore, ScoreEntry,
};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

fn load_json<T: serde::de::DeserializeOwned + Default>(path: &PathBuf) -> T {
    match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "corrupt store file, starting fresh");
            T::default()
        }),
        Err(_) => T::default(),
    }
}

fn save_json<T: serde::Serialize>(path: &PathBuf, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating store dir {}", dir.display()))?;
    }
    let contents = serde_json::to_string_pretty(value).context("serializing store")?;
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Player records persisted as one JSON object keyed by fingerprint
pub struct JsonPlayerStore {
    inner: MemoryPlayerStore,
    path: PathBuf,
}

impl JsonPlayerStore {
    pub fn open(path: PathBuf) -> Self {
        let players: HashMap<String, PlayerRecord> = load_json(&path);
        Self {
            inner: MemoryPlayerStore::with_players(players),
            path,
        }
    }

    fn flush(&self) {
        if let Err(e) = save_json(&self.path, &self.inner.snapshot()) {
            tracing::warn!(error = %e, "player store write failed");
        }
    }
}

impl PlayerStore for JsonPlayerStore {
    fn get(&self, id: &str) -> Result<Option<PlayerRecord>> {
        self.inner.get(id)
    }

    fn upsert(&self, id: &str, display_name: &str) -> Result<PlayerRecord> {
        let record = self.inner.upsert(id, display_name)?;
        self.flush();
        Ok(record)
    }

    fn append_score(&self, id: &str, entry: ScoreEntry) -> Result<()> {
        self.inner.append_score(id, entry)?;
        self.flush();
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.inner.delete(id)?;
        self.flush();
        Ok(())
    }
}

/// Leaderboard persisted as a JSON array, best first
pub struct JsonLeaderboard {
    inner: MemoryLeaderboard,
    path: PathBuf,
}

impl JsonLeaderboard {
    pub fn open(path: PathBuf) -> Self {
        let entries: Vec<LeaderboardEntry> = load_json(&path);
        Self {
            inner: MemoryLeaderboard::with_entries(entries),
            path,
        }
    }

    fn flush(&self) {
        if let Err(e) = save_json(&self.path, &self.inner.snapshot()) {
            tracing::warn!(error = %e, "leaderboard write failed");
        }
    }
}

impl LeaderboardStore for JsonLeaderboard {
    fn best_score_of(&self, id: &str) -> Result<u64> {
        self.inner.best_score_of(id)
    }

    fn upsert_if_better(&self, entry: LeaderboardEntry) -> Result<Option<usize>> {
        let rank = self.inner.upsert_if_better(entry)?;
        if rank.is_some() {
            self.flush();
        }
        Ok(rank)
    }

    fn top_n(&self, n: usize) -> Result<Vec<LeaderboardEntry>> {
        self.inner.top_n(n)
    }

    fn entries_for(&self, id: &str) -> Result<Vec<LeaderboardEntry>> {
        self.inner.entries_for(id)
    }

    fn remove_all_for(&self, id: &str) -> Result<()> {
        self.inner.remove_all_for(id)?;
        self.flush();
        Ok(())
    }
}
