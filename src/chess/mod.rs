//! Minimal chess rules engine used by the move validator.
//!
//! Covers exactly what replaying a scoresheet needs: legal-move generation
//! with castling, en passant and promotion, check/mate detection, SAN
//! rendering and lenient SAN parsing.

pub mod board;
pub mod movegen;
pub mod san;

pub use board::{
    BoardState, CastlingRights, Color, FenError, Piece, PositionError, Role, Square, STARTING_FEN,
};
pub use movegen::{Move, MoveKind};
pub use san::{san_with, to_san, CheckMark, SanError, SanPattern};
