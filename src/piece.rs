// ============================================================================
// Types
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Position {
    pub x: i16,
    pub y: i16,
}

/// The seven canonical tetrominoes. The kind doubles as the color tag of
/// every cell a piece leaves behind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TetrominoType {
    I,
    T,
    L,
    J,
    S,
    Z,
    O,
}

impl TetrominoType {
    /// Palette order.
    pub const ALL: [TetrominoType; 7] = [
        TetrominoType::I,
        TetrominoType::T,
        TetrominoType::L,
        TetrominoType::J,
        TetrominoType::S,
        TetrominoType::Z,
        TetrominoType::O,
    ];

    pub fn color_index(self) -> u8 {
        match self {
            TetrominoType::I => 0,
            TetrominoType::T => 1,
            TetrominoType::L => 2,
            TetrominoType::J => 3,
            TetrominoType::S => 4,
            TetrominoType::Z => 5,
            TetrominoType::O => 6,
        }
    }

    /// Spawn orientation of this kind.
    pub fn shape(self) -> Shape {
        let rows: &[&[u8]] = match self {
            TetrominoType::I => &[&[1, 1, 1, 1]],
            TetrominoType::T => &[&[1, 1, 1], &[0, 1, 0]],
            TetrominoType::L => &[&[1, 1, 1], &[1, 0, 0]],
            TetrominoType::J => &[&[1, 1, 1], &[0, 0, 1]],
            TetrominoType::S => &[&[0, 1, 1], &[1, 1, 0]],
            TetrominoType::Z => &[&[1, 1, 0], &[0, 1, 1]],
            TetrominoType::O => &[&[1, 1], &[1, 1]],
        };
        Shape::from_rows(rows)
    }
}

// ============================================================================
// Shape
// ============================================================================

/// Rectangular matrix of filled/empty cells, stored row-major.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Shape {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl Shape {
    /// Builds a shape from rows of 0/1 flags.
    ///
    /// Panics if `rows` is empty or ragged.
    pub fn from_rows(rows: &[&[u8]]) -> Self {
        assert!(!rows.is_empty(), "shape needs at least one row");
        let width = rows[0].len();
        assert!(width > 0, "shape needs at least one column");
        assert!(
            rows.iter().all(|row| row.len() == width),
            "shape rows must all have the same length"
        );

        Self {
            width,
            height: rows.len(),
            cells: rows.iter().flat_map(|row| row.iter().map(|&v| v != 0)).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_filled(&self, row: usize, col: usize) -> bool {
        debug_assert!(row < self.height && col < self.width);
        self.cells[row * self.width + col]
    }

    /// `(row, col)` of every filled cell, top to bottom.
    pub fn filled_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &filled)| filled)
            .map(move |(i, _)| (i / self.width, i % self.width))
    }
}

// ============================================================================
// Rotation
// ============================================================================

/// Clockwise quarter turn about the matrix's own top-left corner.
///
/// No kicks: the caller checks the result against the grid and keeps the
/// old shape if it collides.
pub fn rotate(shape: &Shape) -> Shape {
    let (w, h) = (shape.width, shape.height);
    let mut cells = Vec::with_capacity(shape.cells.len());
    // The rotated matrix is h wide and w tall.
    for r in 0..w {
        for c in 0..h {
            cells.push(shape.cells[(h - 1 - c) * w + r]);
        }
    }

    Shape {
        width: h,
        height: w,
        cells,
    }
}

// ============================================================================
// Piece
// ============================================================================

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Piece {
    pub kind: TetrominoType,
    pub shape: Shape,
    pub position: Position,
}

impl Piece {
    pub fn new(kind: TetrominoType) -> Self {
        Self::new_at(kind, 0, 0)
    }

    pub fn new_at(kind: TetrominoType, x: i16, y: i16) -> Self {
        Self {
            kind,
            shape: kind.shape(),
            position: Position { x, y },
        }
    }

    pub fn moved(&self, dx: i16, dy: i16) -> Self {
        Self {
            kind: self.kind,
            shape: self.shape.clone(),
            position: Position {
                x: self.position.x + dx,
                y: self.position.y + dy,
            },
        }
    }

    pub fn with_shape(&self, shape: Shape) -> Self {
        Self {
            kind: self.kind,
            shape,
            position: self.position,
        }
    }

    /// Absolute grid coordinates of the filled cells.
    pub fn cells(&self) -> Vec<Position> {
        self.shape
            .filled_cells()
            .map(|(r, c)| Position {
                x: self.position.x + c as i16,
                y: self.position.y + r as i16,
            })
            .collect()
    }
}
