use std::mem;

use crate::config::Config;
use crate::grid::{self, CellState, Grid};
use crate::piece::{self, Piece, Position, Shape, TetrominoType};
use crate::source::PieceSource;
use crate::timing::{GravityClock, RepeatGate};

// ============================================================================
// Types
// ============================================================================

/// Discrete player inputs, already decoded from raw keys.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    MoveLeft,
    MoveRight,
    SoftDropStart,
    SoftDropStop,
    Rotate,
    HardDrop,
}

/// `Spawning`, `Locking` and `LineClearing` only exist inside a single
/// call; between calls the game is either `Falling` or `GameOver`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Spawning,
    Falling,
    Locking,
    LineClearing,
    GameOver,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum GameEvent {
    PieceSpawned(TetrominoType),
    PieceMoved,
    PieceRotated,
    HardDropped { rows: u16 },
    PieceLocked,
    LinesCleared(u32),
    GameOver,
}

// ============================================================================
// Scoring
// ============================================================================

/// Square law: one line scores 1, four lines score 16.
pub fn score_delta(lines_cleared: u32) -> u32 {
    lines_cleared * lines_cleared
}

// ============================================================================
// Snapshot
// ============================================================================

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ActivePiece {
    pub kind: TetrominoType,
    pub shape: Shape,
    pub position: Position,
}

impl From<&Piece> for ActivePiece {
    fn from(piece: &Piece) -> Self {
        Self {
            kind: piece.kind,
            shape: piece.shape.clone(),
            position: piece.position,
        }
    }
}

/// Fully settled, owned copy of the game handed to the renderer once per
/// tick.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Snapshot {
    pub width: usize,
    pub height: usize,
    /// Row-major locked cells.
    pub cells: Vec<CellState>,
    pub active: Option<ActivePiece>,
    pub score: u32,
    pub lines_cleared: u32,
    pub game_over: bool,
}

impl Snapshot {
    pub fn cell(&self, x: usize, y: usize) -> CellState {
        debug_assert!(
            x < self.width && y < self.height,
            "cell ({x}, {y}) is outside a {}x{} snapshot",
            self.width,
            self.height
        );
        self.cells[y * self.width + x]
    }

    /// Locked cells with the active piece drawn on top, as rows.
    pub fn composited(&self) -> Vec<Vec<CellState>> {
        let mut rows: Vec<Vec<CellState>> = self
            .cells
            .chunks(self.width)
            .map(|row| row.to_vec())
            .collect();

        if let Some(active) = &self.active {
            for (r, c) in active.shape.filled_cells() {
                let x = active.position.x as i32 + c as i32;
                let y = active.position.y as i32 + r as i32;
                if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
                    rows[y as usize][x as usize] = CellState::Filled(active.kind);
                }
            }
        }

        rows
    }
}

// ============================================================================
// Game
// ============================================================================

pub struct Game {
    config: Config,
    grid: Grid,
    active: Option<Piece>,
    score: u32,
    lines_cleared: u32,
    pieces_locked: u32,
    phase: Phase,
    gravity: GravityClock,
    move_gate: RepeatGate,
    rotate_gate: RepeatGate,
    source: Box<dyn PieceSource>,
    events: Vec<GameEvent>,
}

impl Game {
    /// Starts a game on an empty field and spawns the first piece.
    pub fn new(config: Config, source: Box<dyn PieceSource>, now_ms: u64) -> Self {
        let grid = Grid::new(config.grid_width, config.grid_height);
        let mut game = Self::assemble(config, grid, None, source, now_ms);
        game.spawn_next_piece();
        game
    }

    /// Starts from an arbitrary field with `piece` already in play.
    pub fn with_grid(
        config: Config,
        grid: Grid,
        piece: Piece,
        source: Box<dyn PieceSource>,
        now_ms: u64,
    ) -> Self {
        let mut game = Self::assemble(config, grid, Some(piece), source, now_ms);
        game.phase = Phase::Falling;
        game
    }

    fn assemble(
        config: Config,
        grid: Grid,
        active: Option<Piece>,
        source: Box<dyn PieceSource>,
        now_ms: u64,
    ) -> Self {
        debug_assert!(config.validate().is_ok(), "game started with invalid config");
        debug_assert_eq!(
            (grid.width(), grid.height()),
            (config.grid_width, config.grid_height)
        );

        Self {
            gravity: GravityClock::new(config.fall_interval_ms, config.soft_drop_interval_ms, now_ms),
            move_gate: RepeatGate::new(config.move_repeat_ms),
            rotate_gate: RepeatGate::new(config.rotate_repeat_ms),
            config,
            grid,
            active,
            score: 0,
            lines_cleared: 0,
            pieces_locked: 0,
            phase: Phase::Spawning,
            source,
            events: Vec::new(),
        }
    }

    /// Advances one frame: applies `actions` in order, then gravity.
    /// Does nothing once the game is over.
    pub fn tick(&mut self, now_ms: u64, actions: &[Action]) {
        if self.is_game_over() {
            return;
        }

        for &action in actions {
            self.apply(action, now_ms);
        }

        if self.gravity.is_due(now_ms) {
            self.gravity.mark(now_ms);
            if !self.move_piece(0, 1) {
                self.lock_and_spawn();
            }
        }
    }

    fn apply(&mut self, action: Action, now_ms: u64) {
        match action {
            Action::MoveLeft => {
                if self.move_gate.try_fire(now_ms) {
                    self.move_piece(-1, 0);
                }
            }
            Action::MoveRight => {
                if self.move_gate.try_fire(now_ms) {
                    self.move_piece(1, 0);
                }
            }
            Action::Rotate => {
                if self.rotate_gate.try_fire(now_ms) {
                    self.rotate_piece();
                }
            }
            Action::HardDrop => {
                self.hard_drop();
            }
            Action::SoftDropStart => self.set_soft_drop(true),
            Action::SoftDropStop => self.set_soft_drop(false),
        }
    }

    pub fn move_piece(&mut self, dx: i16, dy: i16) -> bool {
        if self.phase != Phase::Falling {
            return false;
        }
        let Some(active) = self.active.as_ref() else {
            return false;
        };

        let moved = active.moved(dx, dy);
        if grid::collides(&self.grid, &moved.shape, moved.position.x, moved.position.y) {
            return false;
        }
        self.active = Some(moved);
        self.events.push(GameEvent::PieceMoved);
        true
    }

    /// Rotates clockwise in place, or leaves the piece untouched if the
    /// rotated shape would collide.
    pub fn rotate_piece(&mut self) -> bool {
        if self.phase != Phase::Falling {
            return false;
        }
        let Some(active) = self.active.as_ref() else {
            return false;
        };

        let rotated = active.with_shape(piece::rotate(&active.shape));
        if grid::collides(&self.grid, &rotated.shape, rotated.position.x, rotated.position.y) {
            return false;
        }
        self.active = Some(rotated);
        self.events.push(GameEvent::PieceRotated);
        true
    }

    /// Snaps the piece to the lowest free row. Locking is left to the next
    /// gravity step. Returns the number of rows dropped.
    pub fn hard_drop(&mut self) -> u16 {
        if self.phase != Phase::Falling {
            return 0;
        }
        let Some(active) = self.active.as_mut() else {
            return 0;
        };

        let Position { x, mut y } = active.position;
        let start = y;
        while !grid::collides(&self.grid, &active.shape, x, y + 1) {
            y += 1;
        }
        active.position.y = y;

        let rows = (y - start) as u16;
        tracing::debug!(rows, "hard drop");
        self.events.push(GameEvent::HardDropped { rows });
        rows
    }

    pub fn set_soft_drop(&mut self, active: bool) {
        self.gravity.set_soft_drop(active);
    }

    fn lock_and_spawn(&mut self) {
        let Some(piece) = self.active.take() else {
            return;
        };

        self.phase = Phase::Locking;
        grid::lock(&mut self.grid, &piece);
        self.pieces_locked += 1;
        self.events.push(GameEvent::PieceLocked);
        tracing::debug!(
            kind = ?piece.kind,
            x = piece.position.x,
            y = piece.position.y,
            "locked piece"
        );

        self.phase = Phase::LineClearing;
        let lines = grid::clear_completed_lines(&mut self.grid);
        if lines > 0 {
            self.add_score(lines);
            self.events.push(GameEvent::LinesCleared(lines));
            tracing::info!(lines, score = self.score, "cleared lines");
        }

        self.spawn_next_piece();
    }

    fn add_score(&mut self, lines: u32) {
        self.score += score_delta(lines);
        self.lines_cleared += lines;
    }

    /// Draws the next piece and places it at the spawn point. If it already
    /// collides there the game is over.
    fn spawn_next_piece(&mut self) {
        self.phase = Phase::Spawning;

        let mut piece = self.source.next_piece();
        piece.position = Position {
            x: self.config.spawn_column(),
            y: 0,
        };

        if grid::collides(&self.grid, &piece.shape, piece.position.x, piece.position.y) {
            self.active = None;
            self.phase = Phase::GameOver;
            self.events.push(GameEvent::GameOver);
            tracing::info!(
                score = self.score,
                lines = self.lines_cleared,
                pieces = self.pieces_locked,
                "game over"
            );
            return;
        }

        tracing::debug!(kind = ?piece.kind, "spawned piece");
        self.events.push(GameEvent::PieceSpawned(piece.kind));
        self.active = Some(piece);
        self.phase = Phase::Falling;
    }

    /// Throws the current game away and starts over on an empty field,
    /// drawing from the same piece source.
    pub fn restart(&mut self, now_ms: u64) {
        self.grid = Grid::new(self.config.grid_width, self.config.grid_height);
        self.active = None;
        self.score = 0;
        self.lines_cleared = 0;
        self.pieces_locked = 0;
        self.gravity = GravityClock::new(
            self.config.fall_interval_ms,
            self.config.soft_drop_interval_ms,
            now_ms,
        );
        self.move_gate = RepeatGate::new(self.config.move_repeat_ms);
        self.rotate_gate = RepeatGate::new(self.config.rotate_repeat_ms);
        self.events.clear();

        tracing::info!("restarting game");
        self.spawn_next_piece();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            width: self.grid.width(),
            height: self.grid.height(),
            cells: self.grid.cells().to_vec(),
            active: self.active.as_ref().map(ActivePiece::from),
            score: self.score,
            lines_cleared: self.lines_cleared,
            game_over: self.is_game_over(),
        }
    }

    /// Takes and clears all pending events
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        mem::take(&mut self.events)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn active_piece(&self) -> Option<&Piece> {
        self.active.as_ref()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lines_cleared(&self) -> u32 {
        self.lines_cleared
    }

    pub fn pieces_locked(&self) -> u32 {
        self.pieces_locked
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_soft_dropping(&self) -> bool {
        self.gravity.is_soft_dropping()
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

pub mod test_helpers {
    use super::*;

    /// Empty field with the default dimensions.
    pub fn empty_grid() -> Grid {
        let config = Config::default();
        Grid::new(config.grid_width, config.grid_height)
    }

    pub fn fill_row(grid: &mut Grid, y: usize) {
        for x in 0..grid.width() {
            grid.set_cell(x, y, CellState::Filled(TetrominoType::T));
        }
    }

    pub fn fill_row_with_gap(grid: &mut Grid, y: usize, gap_x: usize) {
        for x in 0..grid.width() {
            if x != gap_x {
                grid.set_cell(x, y, CellState::Filled(TetrominoType::T));
            }
        }
    }
}
