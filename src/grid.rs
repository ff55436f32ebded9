use crate::piece::{Piece, Shape, TetrominoType};

// ============================================================================
// Cells
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum CellState {
    #[default]
    Empty,
    Filled(TetrominoType),
}

impl CellState {
    pub fn is_filled(self) -> bool {
        matches!(self, CellState::Filled(_))
    }
}

// ============================================================================
// Grid
// ============================================================================

/// Fixed-size playing field. Row 0 is the top, row `height - 1` the floor.
///
/// Cells are stored row-major in one flat buffer. Addressing a cell outside
/// the field is a caller bug and trips a debug assertion.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<CellState>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![CellState::Empty; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(
            x < self.width && y < self.height,
            "cell ({x}, {y}) is outside a {}x{} grid",
            self.width,
            self.height
        );
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> CellState {
        self.cells[self.index(x, y)]
    }

    pub fn is_occupied(&self, x: usize, y: usize) -> bool {
        self.get(x, y).is_filled()
    }

    pub fn set_cell(&mut self, x: usize, y: usize, cell: CellState) {
        let idx = self.index(x, y);
        self.cells[idx] = cell;
    }

    pub fn row(&self, y: usize) -> &[CellState] {
        let start = self.index(0, y);
        &self.cells[start..start + self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellState]> {
        self.cells.chunks(self.width)
    }

    pub fn clear_row(&mut self, y: usize) {
        let start = self.index(0, y);
        self.cells[start..start + self.width].fill(CellState::Empty);
    }

    /// Removes row `y`; every row above it drops by one and row 0 becomes
    /// empty.
    pub fn collapse_row(&mut self, y: usize) {
        let end = self.index(0, y);
        self.cells.copy_within(0..end, self.width);
        self.cells[..self.width].fill(CellState::Empty);
    }

    pub fn is_row_full(&self, y: usize) -> bool {
        self.row(y).iter().all(|cell| cell.is_filled())
    }

    pub fn filled_count_in_row(&self, y: usize) -> usize {
        self.row(y).iter().filter(|cell| cell.is_filled()).count()
    }

    pub fn total_filled_cells(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_filled()).count()
    }

    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }
}

// ============================================================================
// Collision Detection
// ============================================================================

/// True when `shape` placed with its top-left corner at `(x, y)` leaves the
/// side walls, sinks through the floor, or overlaps a filled cell.
///
/// Cells above row 0 are allowed and never checked against the grid.
pub fn collides(grid: &Grid, shape: &Shape, x: i16, y: i16) -> bool {
    let (width, height) = (grid.width() as i32, grid.height() as i32);

    shape.filled_cells().any(|(r, c)| {
        let gx = x as i32 + c as i32;
        let gy = y as i32 + r as i32;
        if gx < 0 || gx >= width || gy >= height {
            return true;
        }
        gy >= 0 && grid.is_occupied(gx as usize, gy as usize)
    })
}

// ============================================================================
// Lock and Clear
// ============================================================================

/// Writes the piece's color into every cell its shape covers.
///
/// Only call this once the piece can no longer move down.
pub fn lock(grid: &mut Grid, piece: &Piece) {
    for cell in piece.cells() {
        debug_assert!(cell.x >= 0, "locking a piece outside the side walls");
        if cell.y < 0 {
            continue;
        }
        grid.set_cell(cell.x as usize, cell.y as usize, CellState::Filled(piece.kind));
    }
}

/// Removes every full row and returns how many were removed.
pub fn clear_completed_lines(grid: &mut Grid) -> u32 {
    let mut cleared = 0;
    let mut y = grid.height();

    // Bottom-up; after a collapse the same index holds the row from above.
    while y > 0 {
        if grid.is_row_full(y - 1) {
            grid.collapse_row(y - 1);
            cleared += 1;
        } else {
            y -= 1;
        }
    }

    cleared
}
