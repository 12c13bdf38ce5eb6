//! Game board representation, collision detection and line clearing

use crate::tetromino::{Shape, TetrominoType};

/// Standard Tetris board dimensions
pub const BOARD_WIDTH: usize = 10;
pub const BOARD_HEIGHT: usize = 20;

/// A cell on the board - either empty or settled with a tetromino tag
/// (the tag drives color lookup at render time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Filled(TetrominoType),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, Cell::Filled(_))
    }
}

/// The game board
#[derive(Debug, Clone)]
pub struct Board {
    /// Grid stored as [row][col], row 0 is the top, rows increase downward
    cells: [[Cell; BOARD_WIDTH]; BOARD_HEIGHT],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Empty; BOARD_WIDTH]; BOARD_HEIGHT],
        }
    }

    /// Get the cell at (row, col); None if out of bounds
    pub fn get(&self, row: i32, col: i32) -> Option<Cell> {
        if row < 0 || col < 0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= BOARD_HEIGHT || col >= BOARD_WIDTH {
            return None;
        }
        Some(self.cells[row][col])
    }

    /// Test a shape anchored at (x, y) against walls, floor and settled
    /// cells. Rows above the board (y + dy < 0) only have their columns
    /// checked: a spawning piece may poke above the visible area.
    pub fn collides(&self, x: i32, y: i32, shape: Shape) -> bool {
        shape.cells().any(|(dx, dy)| {
            let col = x + dx;
            let row = y + dy;
            if col < 0 || col >= BOARD_WIDTH as i32 {
                return true;
            }
            if row >= BOARD_HEIGHT as i32 {
                return true;
            }
            row >= 0 && self.cells[row as usize][col as usize].is_filled()
        })
    }

    /// Settle a shape onto the board. Cells that would land above row 0
    /// are silently discarded; spawn collision is caught before placement
    /// is ever attempted there.
    pub fn place(&mut self, x: i32, y: i32, shape: Shape, kind: TetrominoType) {
        for (dx, dy) in shape.cells() {
            let col = x + dx;
            let row = y + dy;
            if row >= 0 && row < BOARD_HEIGHT as i32 && col >= 0 && col < BOARD_WIDTH as i32 {
                self.cells[row as usize][col as usize] = Cell::Filled(kind);
            }
        }
    }

    /// Clear completed lines and return the number cleared (0-4).
    ///
    /// Scans bottom-to-top; removing a row shifts everything above it
    /// down by one and inserts a fresh empty row at the top, then the
    /// same index is examined again since a new row just arrived there.
    pub fn clear_full_lines(&mut self) -> usize {
        let mut cleared = 0;
        let mut row = BOARD_HEIGHT;
        while row > 0 {
            if self.is_line_full(row - 1) {
                for r in (1..row).rev() {
                    self.cells[r] = self.cells[r - 1];
                }
                self.cells[0] = [Cell::Empty; BOARD_WIDTH];
                cleared += 1;
            } else {
                row -= 1;
            }
        }
        cleared
    }

    /// Check if a line is completely filled
    fn is_line_full(&self, row: usize) -> bool {
        self.cells[row].iter().all(|cell| cell.is_filled())
    }

    /// Check if the board is completely empty
    pub fn is_empty(&self) -> bool {
        self.cells
            .iter()
            .all(|row| row.iter().all(|cell| cell.is_empty()))
    }

    /// Iterate rows top to bottom for rendering
    pub fn rows(&self) -> impl Iterator<Item = &[Cell; BOARD_WIDTH]> {
        self.cells.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_row(board: &mut Board, row: usize, kind: TetrominoType) {
        for col in 0..BOARD_WIDTH {
            board.cells[row][col] = Cell::Filled(kind);
        }
    }

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new();
        assert!(board.is_empty());
    }

    #[test]
    fn test_collides_walls_and_floor() {
        let board = Board::new();
        let bar = TetrominoType::I.shape(0); // 1x4 horizontal
        assert!(!board.collides(0, 0, bar));
        assert!(board.collides(-1, 0, bar));
        assert!(board.collides(7, 0, bar));
        assert!(!board.collides(6, 19, bar));
        assert!(board.collides(0, 20, bar));
    }

    #[test]
    fn test_collides_ignores_content_above_board() {
        let mut board = Board::new();
        fill_row(&mut board, 0, TetrominoType::J);
        let vertical = TetrominoType::I.shape(1); // 4x1 vertical
        // Bounding box partially above the board, columns in range,
        // nothing settled below row 0 in this column after clearing it.
        board.cells[0][4] = Cell::Empty;
        assert!(!board.collides(4, -3, vertical));
        // Same origin over a settled cell collides.
        assert!(board.collides(5, -3, vertical));
    }

    #[test]
    fn test_place_discards_rows_above_board() {
        let mut board = Board::new();
        let vertical = TetrominoType::I.shape(1);
        board.place(0, -2, vertical, TetrominoType::I);
        assert_eq!(board.get(0, 0), Some(Cell::Filled(TetrominoType::I)));
        assert_eq!(board.get(1, 0), Some(Cell::Filled(TetrominoType::I)));
        assert!(board.get(2, 0).unwrap().is_empty());
    }

    #[test]
    fn test_clear_single_line() {
        let mut board = Board::new();
        fill_row(&mut board, BOARD_HEIGHT - 1, TetrominoType::I);
        board.cells[BOARD_HEIGHT - 2][0] = Cell::Filled(TetrominoType::Z);

        assert_eq!(board.clear_full_lines(), 1);
        // The lone block above the cleared line lands on the bottom row.
        assert_eq!(
            board.get(BOARD_HEIGHT as i32 - 1, 0),
            Some(Cell::Filled(TetrominoType::Z))
        );
        assert!(board.get(BOARD_HEIGHT as i32 - 2, 0).unwrap().is_empty());
    }

    #[test]
    fn test_clear_preserves_row_order() {
        // Tag three partial rows with distinct markers, clear a full row
        // sitting between them, and check relative order is kept with
        // everything shifted down by one.
        let mut board = Board::new();
        board.cells[16][0] = Cell::Filled(TetrominoType::I);
        board.cells[17][0] = Cell::Filled(TetrominoType::O);
        fill_row(&mut board, 18, TetrominoType::T);
        board.cells[19][0] = Cell::Filled(TetrominoType::S);

        assert_eq!(board.clear_full_lines(), 1);
        assert_eq!(board.get(17, 0), Some(Cell::Filled(TetrominoType::I)));
        assert_eq!(board.get(18, 0), Some(Cell::Filled(TetrominoType::O)));
        assert_eq!(board.get(19, 0), Some(Cell::Filled(TetrominoType::S)));
        assert!(board.rows().next().unwrap().iter().all(Cell::is_empty));
    }

    #[test]
    fn test_clear_four_stacked_lines() {
        let mut board = Board::new();
        for row in BOARD_HEIGHT - 4..BOARD_HEIGHT {
            fill_row(&mut board, row, TetrominoType::L);
        }
        assert_eq!(board.clear_full_lines(), 4);
        assert!(board.is_empty());
    }

    #[test]
    fn test_no_row_is_left_partially_cleared() {
        let mut board = Board::new();
        fill_row(&mut board, 19, TetrominoType::I);
        fill_row(&mut board, 17, TetrominoType::I);
        for col in 0..BOARD_WIDTH - 1 {
            board.cells[18][col] = Cell::Filled(TetrominoType::J);
        }

        assert_eq!(board.clear_full_lines(), 2);
        // The partial row survives untouched (minus the shift).
        let filled: usize = (0..BOARD_WIDTH)
            .filter(|&c| board.get(19, c as i32).unwrap().is_filled())
            .count();
        assert_eq!(filled, BOARD_WIDTH - 1);
        for row in 0..BOARD_HEIGHT - 1 {
            assert!(board.cells[row].iter().all(Cell::is_empty));
        }
    }
}
