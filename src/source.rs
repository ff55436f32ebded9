use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::piece::{Piece, TetrominoType};

// ============================================================================
// Piece Source Trait
// ============================================================================

/// Supplies the pieces to spawn, one at a time.
pub trait PieceSource {
    fn next_piece(&mut self) -> Piece;
}

/// Uniform draw with replacement. Nothing stops the same kind from coming
/// up many times in a row.
pub struct RandomPieceSource {
    rng: StdRng,
}

impl RandomPieceSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPieceSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PieceSource for RandomPieceSource {
    fn next_piece(&mut self) -> Piece {
        let kind = TetrominoType::ALL[self.rng.gen_range(0..TetrominoType::ALL.len())];
        Piece::new(kind)
    }
}

/// Cycles through a fixed list of kinds.
pub struct SequencePieceSource {
    pieces: Vec<TetrominoType>,
    index: usize,
}

impl SequencePieceSource {
    pub fn new(pieces: Vec<TetrominoType>) -> Self {
        assert!(!pieces.is_empty(), "sequence source needs at least one piece");
        Self { pieces, index: 0 }
    }
}

impl PieceSource for SequencePieceSource {
    fn next_piece(&mut self) -> Piece {
        let kind = self.pieces[self.index % self.pieces.len()];
        self.index += 1;
        Piece::new(kind)
    }
}
