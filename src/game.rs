//! Core game engine: the falling piece, scoring and drop timing
//!
//! The engine owns one game. Spawn collision is reported through
//! [`GameEngine::topped_out`] rather than an error: the session layer
//! finalizes the score and switches screens.

use crate::board::{Board, BOARD_WIDTH};
use crate::tetromino::{Shape, TetrominoType};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Score for clearing 1..=4 lines in a single lock, before the level
/// multiplier.
const LINE_SCORES: [u64; 5] = [0, 100, 300, 500, 800];

/// Gravity floor: the drop interval never goes below this.
pub const MIN_DROP_INTERVAL: Duration = Duration::from_millis(100);

/// Source of upcoming tetromino types. Seedable so tests can script
/// exact sequences.
pub trait PieceSource {
    fn next_piece(&mut self) -> TetrominoType;
}

/// Uniform independent draws over the 7 types; no bag fairness.
pub struct UniformSource {
    rng: ChaCha8Rng,
}

impl UniformSource {
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Default for UniformSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PieceSource for UniformSource {
    fn next_piece(&mut self) -> TetrominoType {
        TetrominoType::all()[self.rng.gen_range(0..7)]
    }
}

/// The currently falling piece
#[derive(Debug, Clone, Copy)]
pub struct ActivePiece {
    pub kind: TetrominoType,
    pub rotation: usize,
    /// Column of the shape's top-left corner
    pub x: i32,
    /// Row of the shape's top-left corner (may be negative briefly)
    pub y: i32,
}

impl ActivePiece {
    /// Spawn at rotation 0, horizontally centered, top row at board row 0
    fn spawn(kind: TetrominoType) -> Self {
        let width = kind.shape(0).width() as i32;
        Self {
            kind,
            rotation: 0,
            x: (BOARD_WIDTH as i32 - width) / 2,
            y: 0,
        }
    }

    pub fn shape(&self) -> Shape {
        self.kind.shape(self.rotation)
    }
}

/// Score, level and derived gravity for one game
#[derive(Debug, Clone, Copy)]
pub struct GameStats {
    pub score: u64,
    pub level: u32,
    pub lines: u32,
    pub drop_interval: Duration,
}

impl Default for GameStats {
    fn default() -> Self {
        Self {
            score: 0,
            level: 1,
            lines: 0,
            drop_interval: drop_interval_for(1),
        }
    }
}

/// Gravity curve: 1000ms at level 1, 100ms faster per level, floored.
fn drop_interval_for(level: u32) -> Duration {
    let ms = 1000u64.saturating_sub((level.saturating_sub(1) as u64) * 100);
    Duration::from_millis(ms).max(MIN_DROP_INTERVAL)
}

/// What a downward tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Piece moved down one row
    Moved,
    /// Piece locked; carries the number of lines cleared
    Locked(usize),
}

/// The game engine
pub struct GameEngine {
    pub board: Board,
    current: ActivePiece,
    next: TetrominoType,
    stats: GameStats,
    pieces: Box<dyn PieceSource + Send>,
    topped_out: bool,
}

impl GameEngine {
    pub fn new() -> Self {
        Self::with_source(Box::new(UniformSource::new()))
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_source(Box::new(UniformSource::with_seed(seed)))
    }

    pub fn with_source(mut pieces: Box<dyn PieceSource + Send>) -> Self {
        let first = pieces.next_piece();
        let next = pieces.next_piece();
        Self {
            board: Board::new(),
            current: ActivePiece::spawn(first),
            next,
            stats: GameStats::default(),
            pieces,
            topped_out: false,
        }
    }

    pub fn current(&self) -> &ActivePiece {
        &self.current
    }

    pub fn next_kind(&self) -> TetrominoType {
        self.next
    }

    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    /// True once a spawn collided; the game is over and the engine
    /// accepts no further moves.
    pub fn topped_out(&self) -> bool {
        self.topped_out
    }

    /// Promote the queued piece and draw a new one. On spawn collision
    /// the board is left untouched and the engine marks itself topped
    /// out; the caller finalizes the run.
    pub fn spawn_next(&mut self) {
        let piece = ActivePiece::spawn(self.next);
        if self.board.collides(piece.x, piece.y, piece.shape()) {
            self.topped_out = true;
            return;
        }
        self.current = piece;
        self.next = self.pieces.next_piece();
    }

    /// Try to translate the active piece; mutates only on success
    pub fn try_move(&mut self, dx: i32, dy: i32) -> bool {
        if self.topped_out {
            return false;
        }
        let (x, y) = (self.current.x + dx, self.current.y + dy);
        if self.board.collides(x, y, self.current.shape()) {
            return false;
        }
        self.current.x = x;
        self.current.y = y;
        true
    }

    /// Advance the rotation index. No wall kicks: a rotation that would
    /// overlap simply fails and the piece stays as-is.
    pub fn rotate(&mut self) -> bool {
        if self.topped_out {
            return false;
        }
        let table_len = self.current.kind.rotations().len();
        let rotation = (self.current.rotation + 1) % table_len;
        let shape = self.current.kind.shape(rotation);
        if self.board.collides(self.current.x, self.current.y, shape) {
            return false;
        }
        self.current.rotation = rotation;
        true
    }

    /// Drop straight to the floor (+2 per row descended) and lock
    pub fn hard_drop(&mut self) -> usize {
        if self.topped_out {
            return 0;
        }
        while self.try_move(0, 1) {
            self.stats.score += 2;
        }
        self.lock()
    }

    /// One downward step, shared by manual soft drop and the gravity
    /// timer: +1 score on success, lock on failure.
    pub fn soft_drop_tick(&mut self) -> TickOutcome {
        if self.try_move(0, 1) {
            self.stats.score += 1;
            TickOutcome::Moved
        } else {
            TickOutcome::Locked(self.lock())
        }
    }

    /// Settle the active piece, clear lines, update score/level/gravity
    /// and spawn the next piece. Returns the number of lines cleared.
    fn lock(&mut self) -> usize {
        let piece = self.current;
        self.board.place(piece.x, piece.y, piece.shape(), piece.kind);
        let cleared = self.board.clear_full_lines();

        self.stats.score += LINE_SCORES[cleared.min(4)] * self.stats.level as u64;
        self.stats.lines += cleared as u32;
        self.stats.level = self.stats.lines / 10 + 1;
        self.stats.drop_interval = drop_interval_for(self.stats.level);

        if cleared > 0 {
            tracing::debug!(cleared, lines = self.stats.lines, level = self.stats.level, "lines cleared");
        }

        self.spawn_next();
        cleared
    }
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BOARD_HEIGHT;

    /// Deals a fixed sequence, then repeats the last entry forever
    struct Scripted {
        queue: Vec<TetrominoType>,
        at: usize,
    }

    impl Scripted {
        fn new(kinds: &[TetrominoType]) -> Box<Self> {
            Box::new(Self {
                queue: kinds.to_vec(),
                at: 0,
            })
        }
    }

    impl PieceSource for Scripted {
        fn next_piece(&mut self) -> TetrominoType {
            let kind = self.queue[self.at.min(self.queue.len() - 1)];
            self.at += 1;
            kind
        }
    }

    fn engine_with(kinds: &[TetrominoType]) -> GameEngine {
        GameEngine::with_source(Scripted::new(kinds))
    }

    #[test]
    fn test_seeded_engines_deal_identically() {
        let mut a = GameEngine::with_seed(42);
        let mut b = GameEngine::with_seed(42);
        for _ in 0..20 {
            assert_eq!(a.current().kind, b.current().kind);
            a.hard_drop();
            b.hard_drop();
        }
    }

    #[test]
    fn test_spawn_is_centered_at_top() {
        let engine = engine_with(&[TetrominoType::I]);
        assert_eq!(engine.current().y, 0);
        assert_eq!(engine.current().x, 3);
        let engine = engine_with(&[TetrominoType::O]);
        assert_eq!(engine.current().x, 4);
    }

    #[test]
    fn test_failed_down_move_locks_via_tick() {
        let mut engine = engine_with(&[TetrominoType::O]);
        // Walk the O piece to the floor, then one more tick locks it.
        for _ in 0..BOARD_HEIGHT - 2 {
            assert_eq!(engine.soft_drop_tick(), TickOutcome::Moved);
        }
        assert_eq!(engine.soft_drop_tick(), TickOutcome::Locked(0));
        assert!(!engine.board.is_empty());
    }

    #[test]
    fn test_soft_drop_scores_one_per_row() {
        let mut engine = engine_with(&[TetrominoType::O]);
        engine.soft_drop_tick();
        engine.soft_drop_tick();
        assert_eq!(engine.stats().score, 2);
    }

    #[test]
    fn test_hard_drop_scores_two_per_row() {
        let mut engine = engine_with(&[TetrominoType::O]);
        // O is 2 tall on an empty 20-row board: 18 rows of descent.
        engine.hard_drop();
        assert_eq!(engine.stats().score, 36);
    }

    #[test]
    fn test_rotation_fails_against_wall_without_kick() {
        let mut engine = engine_with(&[TetrominoType::I]);
        assert!(engine.rotate()); // horizontal -> vertical
        // Push the 1-wide bar against the right wall; rotating back to
        // the 4-wide shape would leave the board, so it must fail.
        while engine.try_move(1, 0) {}
        assert_eq!(engine.current().x, 9);
        assert!(!engine.rotate());
        assert_eq!(engine.current().rotation, 1);
    }

    #[test]
    fn test_single_line_clear_scoring() {
        // Two horizontal I pieces fill 8 columns of the bottom row; an O
        // piece fills the last two, clearing exactly one line.
        let mut engine = engine_with(&[
            TetrominoType::I,
            TetrominoType::I,
            TetrominoType::O,
            TetrominoType::T,
        ]);
        engine.try_move(-3, 0);
        let drop_score = {
            let before = engine.stats().score;
            engine.hard_drop();
            engine.stats().score - before
        };
        while engine.try_move(1, 0) {}
        engine.hard_drop();
        // O spawns at x=4 and drops straight into the two-column gap.
        let before = engine.stats().score;
        engine.hard_drop();

        assert_eq!(engine.stats().lines, 1);
        assert_eq!(engine.stats().level, 1);
        // 100 * level(1) for the clear, on top of this piece's drop.
        assert_eq!(engine.stats().score - before, drop_score + 100 - 2);
    }

    #[test]
    fn test_level_formula_and_gravity_floor() {
        let mut engine = engine_with(&[TetrominoType::O]);
        let mut last = engine.stats().drop_interval;
        for lines in 0u32..=200 {
            engine.stats.lines = lines;
            engine.stats.level = lines / 10 + 1;
            engine.stats.drop_interval = drop_interval_for(engine.stats.level);
            assert_eq!(engine.stats().level, lines / 10 + 1);
            assert!(engine.stats().drop_interval <= last);
            assert!(engine.stats().drop_interval >= MIN_DROP_INTERVAL);
            last = engine.stats().drop_interval;
        }
        assert_eq!(drop_interval_for(21), MIN_DROP_INTERVAL);
        assert_eq!(drop_interval_for(10), Duration::from_millis(100));
        assert_eq!(drop_interval_for(9), Duration::from_millis(200));
    }

    #[test]
    fn test_quad_clear_scores_800_times_level() {
        // Fill the bottom four rows except the last column, then drop a
        // vertical I into the gap.
        let mut engine = engine_with(&[TetrominoType::I, TetrominoType::T]);
        for row in BOARD_HEIGHT - 4..BOARD_HEIGHT {
            for col in 0..BOARD_WIDTH - 2 {
                engine
                    .board
                    .place(col as i32, row as i32, TetrominoType::O.shape(0), TetrominoType::O);
            }
        }
        assert!(engine.rotate());
        while engine.try_move(1, 0) {}
        let before = engine.stats().score;
        engine.hard_drop();
        assert_eq!(engine.stats().lines, 4);
        // 16 rows descended at 2 points each, then 800 * level(1).
        assert_eq!(engine.stats().score - before, 32 + 800);
        assert!(engine.board.is_empty());
    }

    #[test]
    fn test_spawn_collision_tops_out_without_board_mutation() {
        let mut engine = engine_with(&[TetrominoType::O, TetrominoType::O]);
        for row in 0..2 {
            for col in 0..BOARD_WIDTH {
                engine.board.place(
                    col as i32,
                    row,
                    TetrominoType::O.shape(0),
                    TetrominoType::O,
                );
            }
        }
        let before: Vec<Vec<bool>> = engine
            .board
            .rows()
            .map(|r| r.iter().map(|c| c.is_filled()).collect())
            .collect();
        engine.spawn_next();
        assert!(engine.topped_out());
        let after: Vec<Vec<bool>> = engine
            .board
            .rows()
            .map(|r| r.iter().map(|c| c.is_filled()).collect())
            .collect();
        assert_eq!(before, after);
    }
}
