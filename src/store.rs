//! Player records and the global leaderboard
//!
//! The session layer talks to these through trait objects; the in-memory
//! implementations here back both the tests and the JSON-file stores in
//! `persist`. Every operation is atomic behind a mutex, so arbitrarily
//! many sessions may share one store.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Score history entries kept per player, most recent first
pub const SCORE_HISTORY_CAP: usize = 5;

/// Leaderboard entries retained overall
pub const LEADERBOARD_CAP: usize = 100;

/// One finished run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntry {
    pub score: u64,
    pub level: u32,
    pub lines: u32,
    /// Date as ISO-ish string
    pub date: String,
}

/// A player's persistent record, keyed by credential fingerprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: String,
    pub display_name: String,
    pub first_seen: String,
    pub last_seen: String,
    /// Bounded, most-recent-first
    pub score_history: Vec<ScoreEntry>,
}

/// A personal best on the global leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub player_id: String,
    pub display_name: String,
    pub score: u64,
    pub level: u32,
    pub lines: u32,
    pub date: String,
}

/// Per-player persistence
pub trait PlayerStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<PlayerRecord>>;
    /// Create on first sight, otherwise refresh last_seen/display_name
    fn upsert(&self, id: &str, display_name: &str) -> Result<PlayerRecord>;
    /// Prepend to the bounded score history
    fn append_score(&self, id: &str, entry: ScoreEntry) -> Result<()>;
    /// The full stored record, for the account-export view
    fn export(&self, id: &str) -> Result<Option<PlayerRecord>> {
        self.get(id)
    }
    fn delete(&self, id: &str) -> Result<()>;
}

/// Global top-100 leaderboard, one personal-best entry per player
pub trait LeaderboardStore: Send + Sync {
    /// The player's current best, 0 if absent
    fn best_score_of(&self, id: &str) -> Result<u64>;
    /// Insert or replace the player's entry if the score is strictly
    /// better; returns the 1-based rank on change, None otherwise.
    fn upsert_if_better(&self, entry: LeaderboardEntry) -> Result<Option<usize>>;
    fn top_n(&self, n: usize) -> Result<Vec<LeaderboardEntry>>;
    fn entries_for(&self, id: &str) -> Result<Vec<LeaderboardEntry>>;
    fn remove_all_for(&self, id: &str) -> Result<()>;
}

/// Simple date string without an external crate
pub fn date_stamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    // Rough calendar math, good enough for display
    let days = secs / 86400;
    let years = 1970 + days / 365;
    let remaining_days = days % 365;
    let month = remaining_days / 30 + 1;
    let day = remaining_days % 30 + 1;
    format!("{:04}-{:02}-{:02}", years, month.min(12), day)
}

/// In-memory player store
#[derive(Default)]
pub struct MemoryPlayerStore {
    players: Mutex<HashMap<String, PlayerRecord>>,
}

impl MemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_players(players: HashMap<String, PlayerRecord>) -> Self {
        Self {
            players: Mutex::new(players),
        }
    }

    pub fn snapshot(&self) -> HashMap<String, PlayerRecord> {
        self.players.lock().expect("player store poisoned").clone()
    }
}

impl PlayerStore for MemoryPlayerStore {
    fn get(&self, id: &str) -> Result<Option<PlayerRecord>> {
        Ok(self
            .players
            .lock()
            .expect("player store poisoned")
            .get(id)
            .cloned())
    }

    fn upsert(&self, id: &str, display_name: &str) -> Result<PlayerRecord> {
        let mut players = self.players.lock().expect("player store poisoned");
        let now = date_stamp();
        let record = players
            .entry(id.to_string())
            .and_modify(|r| {
                r.display_name = display_name.to_string();
                r.last_seen = now.clone();
            })
            .or_insert_with(|| PlayerRecord {
                id: id.to_string(),
                display_name: display_name.to_string(),
                first_seen: now.clone(),
                last_seen: now,
                score_history: Vec::new(),
            });
        Ok(record.clone())
    }

    fn append_score(&self, id: &str, entry: ScoreEntry) -> Result<()> {
        let mut players = self.players.lock().expect("player store poisoned");
        if let Some(record) = players.get_mut(id) {
            record.score_history.insert(0, entry);
            record.score_history.truncate(SCORE_HISTORY_CAP);
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.players
            .lock()
            .expect("player store poisoned")
            .remove(id);
        Ok(())
    }
}

/// In-memory leaderboard
#[derive(Default)]
pub struct MemoryLeaderboard {
    entries: Mutex<Vec<LeaderboardEntry>>,
}

impl MemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<LeaderboardEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub fn snapshot(&self) -> Vec<LeaderboardEntry> {
        self.entries.lock().expect("leaderboard poisoned").clone()
    }
}

impl LeaderboardStore for MemoryLeaderboard {
    fn best_score_of(&self, id: &str) -> Result<u64> {
        Ok(self
            .entries
            .lock()
            .expect("leaderboard poisoned")
            .iter()
            .find(|e| e.player_id == id)
            .map(|e| e.score)
            .unwrap_or(0))
    }

    fn upsert_if_better(&self, entry: LeaderboardEntry) -> Result<Option<usize>> {
        let mut entries = self.entries.lock().expect("leaderboard poisoned");
        if let Some(existing) = entries.iter_mut().find(|e| e.player_id == entry.player_id) {
            if entry.score <= existing.score {
                return Ok(None);
            }
            *existing = entry.clone();
        } else {
            entries.push(entry.clone());
        }
        // Stable sort: ties keep their original insertion order.
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(LEADERBOARD_CAP);
        Ok(entries
            .iter()
            .position(|e| e.player_id == entry.player_id)
            .map(|i| i + 1))
    }

    fn top_n(&self, n: usize) -> Result<Vec<LeaderboardEntry>> {
        let entries = self.entries.lock().expect("leaderboard poisoned");
        Ok(entries.iter().take(n).cloned().collect())
    }

    fn entries_for(&self, id: &str) -> Result<Vec<LeaderboardEntry>> {
        let entries = self.entries.lock().expect("leaderboard poisoned");
        Ok(entries
            .iter()
            .filter(|e| e.player_id == id)
            .cloned()
            .collect())
    }

    fn remove_all_for(&self, id: &str) -> Result<()> {
        self.entries
            .lock()
            .expect("leaderboard poisoned")
            .retain(|e| e.player_id != id);
        Ok(())
    }
}
