//! Per-connection screen state machine
//!
//! One `Session` per connection: a dispatch table from (screen, key) to
//! screen transitions and game-engine side effects. The stores are the
//! only state shared with other sessions; a failed store call is logged
//! and the transition proceeds regardless.

use crate::game::GameEngine;
use crate::keys::Key;
use crate::store::{date_stamp, LeaderboardEntry, LeaderboardStore, PlayerStore, ScoreEntry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Rows shown on the leaderboard screen, padded with blanks if short
pub const LEADERBOARD_ROWS: usize = 10;

/// How long the farewell screen stays up after an account deletion
pub const DELETE_GRACE: Duration = Duration::from_secs(2);

/// Stable identity derived by the transport layer at auth time
#[derive(Debug, Clone)]
pub struct PlayerIdentity {
    /// Credential fingerprint
    pub id: String,
    pub display_name: String,
}

/// Screen-level states, one active per session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    Playing,
    Paused,
    GameOver,
    Leaderboard,
    AccountMenu,
    AccountExport,
    AccountDelete,
}

/// What the driving loop should do after a key was dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    /// Terminate the session now
    Quit,
    /// Render once more, then close after the delay
    CloseAfter(Duration),
}

/// Summary of a finished run, kept for the game-over screen
#[derive(Debug, Clone)]
pub struct GameResult {
    pub score: u64,
    pub level: u32,
    pub lines: u32,
    /// Final score strictly beat the player's pre-game best
    pub new_best: bool,
    /// 1-based leaderboard rank if the entry was placed
    pub rank: Option<usize>,
}

pub struct Session {
    identity: PlayerIdentity,
    players: Arc<dyn PlayerStore>,
    leaderboard: Arc<dyn LeaderboardStore>,
    screen: Screen,
    game: Option<GameEngine>,
    /// Player's leaderboard best when the current game started
    best_before: u64,
    last_result: Option<GameResult>,
    /// Snapshot taken when entering the leaderboard screen
    leaderboard_rows: Vec<LeaderboardEntry>,
    /// Serialized record, computed when entering the export screen
    export_text: String,
    /// Set once the account was deleted; only the farewell renders
    deleted: bool,
    /// Fixed seed for deterministic games (tests)
    seed: Option<u64>,
}

impl Session {
    pub fn new(
        identity: PlayerIdentity,
        players: Arc<dyn PlayerStore>,
        leaderboard: Arc<dyn LeaderboardStore>,
    ) -> Self {
        if let Err(e) = players.upsert(&identity.id, &identity.display_name) {
            warn!(player = %identity.id, error = %e, "player upsert failed");
        }
        info!(player = %identity.id, name = %identity.display_name, "session opened");
        Self {
            identity,
            players,
            leaderboard,
            screen: Screen::Welcome,
            game: None,
            best_before: 0,
            last_result: None,
            leaderboard_rows: Vec::new(),
            export_text: String::new(),
            deleted: false,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn identity(&self) -> &PlayerIdentity {
        &self.identity
    }

    pub fn game(&self) -> Option<&GameEngine> {
        self.game.as_ref()
    }

    pub fn last_result(&self) -> Option<&GameResult> {
        self.last_result.as_ref()
    }

    pub fn leaderboard_rows(&self) -> &[LeaderboardEntry] {
        &self.leaderboard_rows
    }

    pub fn export_text(&self) -> &str {
        &self.export_text
    }

    pub fn deleted(&self) -> bool {
        self.deleted
    }

    /// Dispatch one decoded key against the current screen
    pub fn handle_key(&mut self, key: Key) -> Control {
        if key == Key::CtrlC {
            info!(player = %self.identity.id, "quit requested");
            return Control::Quit;
        }

        match self.screen {
            Screen::Welcome => match key {
                Key::Char('h') => self.show_leaderboard(),
                Key::Char('a') => self.screen = Screen::AccountMenu,
                _ => self.start_game(),
            },
            Screen::Playing => self.dispatch_playing(key),
            Screen::Paused => {
                if key == Key::Char('p') {
                    self.screen = Screen::Playing;
                }
            }
            Screen::GameOver => match key {
                Key::Char('r') => self.start_game(),
                Key::Char('h') => self.show_leaderboard(),
                _ => self.screen = Screen::Welcome,
            },
            Screen::Leaderboard => {
                self.screen = if self.game.is_some() {
                    Screen::Playing
                } else {
                    Screen::Welcome
                };
            }
            Screen::AccountMenu => match key {
                Key::Char('e') => self.show_export(),
                Key::Char('d') => self.screen = Screen::AccountDelete,
                _ => self.screen = Screen::Welcome,
            },
            Screen::AccountExport => self.screen = Screen::Welcome,
            Screen::AccountDelete => {
                if key == Key::Char('y') {
                    self.delete_account();
                    return Control::CloseAfter(DELETE_GRACE);
                }
                self.screen = Screen::Welcome;
            }
        }
        Control::Continue
    }

    /// One gravity step; a no-op unless a game is actively playing
    pub fn gravity_tick(&mut self) {
        if self.screen != Screen::Playing {
            return;
        }
        if let Some(game) = self.game.as_mut() {
            game.soft_drop_tick();
            if game.topped_out() {
                self.finalize_game_over();
            }
        }
    }

    fn dispatch_playing(&mut self, key: Key) {
        match key {
            Key::Char('p') => {
                self.screen = Screen::Paused;
                return;
            }
            Key::Char('r') => {
                self.start_game();
                return;
            }
            Key::Char('h') => {
                self.show_leaderboard();
                return;
            }
            _ => {}
        }

        let Some(game) = self.game.as_mut() else {
            return;
        };
        match key {
            Key::Left | Key::Char('a') => {
                game.try_move(-1, 0);
            }
            Key::Right | Key::Char('d') => {
                game.try_move(1, 0);
            }
            Key::Up | Key::Char('w') => {
                game.rotate();
            }
            Key::Down | Key::Char('s') => {
                game.soft_drop_tick();
            }
            Key::Char(' ') => {
                game.hard_drop();
            }
            _ => return,
        }
        if game.topped_out() {
            self.finalize_game_over();
        }
    }

    fn start_game(&mut self) {
        self.best_before = self.leaderboard.best_score_of(&self.identity.id).unwrap_or_else(|e| {
            warn!(player = %self.identity.id, error = %e, "best score lookup failed");
            0
        });
        self.game = Some(match self.seed {
            Some(seed) => GameEngine::with_seed(seed),
            None => GameEngine::new(),
        });
        self.screen = Screen::Playing;
    }

    fn show_leaderboard(&mut self) {
        self.leaderboard_rows = self.leaderboard.top_n(LEADERBOARD_ROWS).unwrap_or_else(|e| {
            warn!(error = %e, "leaderboard read failed");
            Vec::new()
        });
        self.screen = Screen::Leaderboard;
    }

    fn show_export(&mut self) {
        self.export_text = self.build_export().unwrap_or_else(|e| {
            warn!(player = %self.identity.id, error = %e, "export failed");
            "export unavailable".to_string()
        });
        self.screen = Screen::AccountExport;
    }

    /// Full record as pretty JSON: profile plus the player's leaderboard
    /// entries. Display clipping happens in the renderer, never here.
    fn build_export(&self) -> anyhow::Result<String> {
        let profile = self.players.export(&self.identity.id)?;
        let entries = self.leaderboard.entries_for(&self.identity.id)?;
        let blob = serde_json::json!({
            "profile": profile,
            "leaderboard": entries,
        });
        Ok(serde_json::to_string_pretty(&blob)?)
    }

    fn delete_account(&mut self) {
        if let Err(e) = self.players.delete(&self.identity.id) {
            warn!(player = %self.identity.id, error = %e, "player delete failed");
        }
        if let Err(e) = self.leaderboard.remove_all_for(&self.identity.id) {
            warn!(player = %self.identity.id, error = %e, "leaderboard delete failed");
        }
        info!(player = %self.identity.id, "account deleted");
        self.deleted = true;
    }

    /// Spawn collision reached: push the run into both stores and switch
    /// to the game-over screen. Store failures never block the switch.
    fn finalize_game_over(&mut self) {
        let Some(game) = self.game.take() else {
            return;
        };
        let stats = *game.stats();
        let date = date_stamp();

        let rank = self
            .leaderboard
            .upsert_if_better(LeaderboardEntry {
                player_id: self.identity.id.clone(),
                display_name: self.identity.display_name.clone(),
                score: stats.score,
                level: stats.level,
                lines: stats.lines,
                date: date.clone(),
            })
            .unwrap_or_else(|e| {
                warn!(player = %self.identity.id, error = %e, "leaderboard upsert failed");
                None
            });

        if let Err(e) = self.players.append_score(
            &self.identity.id,
            ScoreEntry {
                score: stats.score,
                level: stats.level,
                lines: stats.lines,
                date,
            },
        ) {
            warn!(player = %self.identity.id, error = %e, "score append failed");
        }

        info!(
            player = %self.identity.id,
            score = stats.score,
            level = stats.level,
            lines = stats.lines,
            "game over"
        );
        self.last_result = Some(GameResult {
            score: stats.score,
            level: stats.level,
            lines: stats.lines,
            new_best: stats.score > self.best_before,
            rank,
        });
        self.screen = Screen::GameOver;
    }
}
