//! Tetromino definitions and rotation tables
//!
//! All 7 tetrominoes as static grids, one grid per distinct rotation.
//! Rotation indices wrap modulo the table length, so I/S/Z carry two
//! entries, O one, and T/J/L four.

use crossterm::style::Color;

/// One rotation state of a tetromino: a small rectangular grid where
/// `'X'` marks an occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    rows: &'static [&'static str],
}

impl Shape {
    const fn new(rows: &'static [&'static str]) -> Self {
        Self { rows }
    }

    pub fn width(&self) -> usize {
        self.rows[0].len()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Iterate the occupied cells as (dx, dy) offsets from the shape's
    /// top-left corner.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.rows.iter().enumerate().flat_map(|(dy, row)| {
            row.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'X')
                .map(move |(dx, _)| (dx as i32, dy as i32))
        })
    }
}

/// The 7 tetromino types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TetrominoType {
    I, // Cyan - long bar
    O, // Yellow - square
    T, // Magenta - T-shape
    S, // Green - S-shape
    Z, // Red - Z-shape
    J, // Blue - J-shape
    L, // Orange - L-shape
}

const I_ROTATIONS: &[Shape] = &[
    Shape::new(&["XXXX"]),
    Shape::new(&["X", "X", "X", "X"]),
];

const O_ROTATIONS: &[Shape] = &[Shape::new(&["XX", "XX"])];

const T_ROTATIONS: &[Shape] = &[
    Shape::new(&["XXX", ".X."]),
    Shape::new(&[".X", "XX", ".X"]),
    Shape::new(&[".X.", "XXX"]),
    Shape::new(&["X.", "XX", "X."]),
];

const S_ROTATIONS: &[Shape] = &[
    Shape::new(&[".XX", "XX."]),
    Shape::new(&["X.", "XX", ".X"]),
];

const Z_ROTATIONS: &[Shape] = &[
    Shape::new(&["XX.", ".XX"]),
    Shape::new(&[".X", "XX", "X."]),
];

const J_ROTATIONS: &[Shape] = &[
    Shape::new(&["X..", "XXX"]),
    Shape::new(&["XX", "X.", "X."]),
    Shape::new(&["XXX", "..X"]),
    Shape::new(&[".X", ".X", "XX"]),
];

const L_ROTATIONS: &[Shape] = &[
    Shape::new(&["..X", "XXX"]),
    Shape::new(&["X.", "X.", "XX"]),
    Shape::new(&["XXX", "X.."]),
    Shape::new(&["XX", ".X", ".X"]),
];

impl TetrominoType {
    /// Get the color for this tetromino
    pub fn color(&self) -> Color {
        match self {
            TetrominoType::I => Color::Cyan,
            TetrominoType::O => Color::Yellow,
            TetrominoType::T => Color::Magenta,
            TetrominoType::S => Color::Green,
            TetrominoType::Z => Color::Red,
            TetrominoType::J => Color::Blue,
            TetrominoType::L => Color::Rgb {
                r: 255,
                g: 165,
                b: 0,
            },
        }
    }

    /// Single-letter tag for logs and the next-piece caption
    pub fn tag(&self) -> char {
        match self {
            TetrominoType::I => 'I',
            TetrominoType::O => 'O',
            TetrominoType::T => 'T',
            TetrominoType::S => 'S',
            TetrominoType::Z => 'Z',
            TetrominoType::J => 'J',
            TetrominoType::L => 'L',
        }
    }

    /// All tetromino types, in catalog order
    pub fn all() -> [TetrominoType; 7] {
        [
            TetrominoType::I,
            TetrominoType::O,
            TetrominoType::T,
            TetrominoType::S,
            TetrominoType::Z,
            TetrominoType::J,
            TetrominoType::L,
        ]
    }

    /// The rotation table for this tetromino
    pub fn rotations(&self) -> &'static [Shape] {
        match self {
            TetrominoType::I => I_ROTATIONS,
            TetrominoType::O => O_ROTATIONS,
            TetrominoType::T => T_ROTATIONS,
            TetrominoType::S => S_ROTATIONS,
            TetrominoType::Z => Z_ROTATIONS,
            TetrominoType::J => J_ROTATIONS,
            TetrominoType::L => L_ROTATIONS,
        }
    }

    /// Shape at a rotation index; indices wrap modulo the table length
    pub fn shape(&self, rotation: usize) -> Shape {
        let table = self.rotations();
        table[rotation % table.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_shape_has_four_cells() {
        for kind in TetrominoType::all() {
            for (i, shape) in kind.rotations().iter().enumerate() {
                assert_eq!(
                    shape.cells().count(),
                    4,
                    "{:?} rotation {} must have 4 cells",
                    kind,
                    i
                );
            }
        }
    }

    #[test]
    fn test_shapes_are_rectangular_and_trimmed() {
        for kind in TetrominoType::all() {
            for shape in kind.rotations() {
                let width = shape.width();
                for row in shape.rows {
                    assert_eq!(row.len(), width);
                }
                // Top row must be occupied somewhere so a spawned piece
                // really starts at board row 0.
                assert!(shape.cells().any(|(_, dy)| dy == 0));
            }
        }
    }

    #[test]
    fn test_rotation_index_wraps() {
        let i = TetrominoType::I;
        assert_eq!(i.shape(0), i.shape(2));
        assert_eq!(i.shape(1), i.shape(5));
        let o = TetrominoType::O;
        assert_eq!(o.shape(0), o.shape(3));
    }

    #[test]
    fn test_distinct_rotation_counts() {
        assert_eq!(TetrominoType::I.rotations().len(), 2);
        assert_eq!(TetrominoType::O.rotations().len(), 1);
        assert_eq!(TetrominoType::T.rotations().len(), 4);
        assert_eq!(TetrominoType::S.rotations().len(), 2);
        assert_eq!(TetrominoType::Z.rotations().len(), 2);
        assert_eq!(TetrominoType::J.rotations().len(), 4);
        assert_eq!(TetrominoType::L.rotations().len(), 4);
    }
}
