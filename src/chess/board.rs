//! Board representation: pieces, squares, castling rights and FEN.
//!
//! [`BoardState`] is a plain value. Playing a move returns a new state and
//! leaves the receiver untouched, so speculative attempts always work on a
//! private copy.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// FEN of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// The side a piece or a ply belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Rank direction pawns of this colour advance in.
    pub(crate) fn forward(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    /// Rank index (0-based) of this colour's back rank.
    pub(crate) fn back_rank(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => f.write_str("White"),
            Color::Black => f.write_str("Black"),
        }
    }
}

/// Piece kind, independent of colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl Role {
    /// Upper-case SAN letter; pawns have none.
    pub fn san_letter(self) -> Option<char> {
        match self {
            Role::Pawn => None,
            Role::Knight => Some('N'),
            Role::Bishop => Some('B'),
            Role::Rook => Some('R'),
            Role::Queen => Some('Q'),
            Role::King => Some('K'),
        }
    }

    /// Parse an upper-case SAN piece letter. `P` is accepted for pawns.
    pub fn from_san_letter(c: char) -> Option<Role> {
        match c {
            'P' => Some(Role::Pawn),
            'N' => Some(Role::Knight),
            'B' => Some(Role::Bishop),
            'R' => Some(Role::Rook),
            'Q' => Some(Role::Queen),
            'K' => Some(Role::King),
            _ => None,
        }
    }

    fn fen_char(self) -> char {
        match self {
            Role::Pawn => 'p',
            Role::Knight => 'n',
            Role::Bishop => 'b',
            Role::Rook => 'r',
            Role::Queen => 'q',
            Role::King => 'k',
        }
    }
}

/// A coloured piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub role: Role,
}

impl Piece {
    pub const fn new(color: Color, role: Role) -> Self {
        Self { color, role }
    }

    fn to_fen_char(self) -> char {
        let c = self.role.fen_char();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    fn from_fen_char(c: char) -> Option<Piece> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        let role = match c.to_ascii_lowercase() {
            'p' => Role::Pawn,
            'n' => Role::Knight,
            'b' => Role::Bishop,
            'r' => Role::Rook,
            'q' => Role::Queen,
            'k' => Role::King,
            _ => return None,
        };
        Some(Piece { color, role })
    }
}

/// A board square, `a1` = 0 … `h8` = 63.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    /// Build a square from 0-based file and rank.
    pub fn new(file: u8, rank: u8) -> Option<Square> {
        if file < 8 && rank < 8 {
            Some(Square(rank * 8 + file))
        } else {
            None
        }
    }

    pub(crate) fn from_index(index: usize) -> Square {
        debug_assert!(index < 64);
        Square(index as u8)
    }

    pub fn file(self) -> u8 {
        self.0 % 8
    }

    pub fn rank(self) -> u8 {
        self.0 / 8
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn file_char(self) -> char {
        (b'a' + self.file()) as char
    }

    pub fn rank_char(self) -> char {
        (b'1' + self.rank()) as char
    }

    /// Step by a file/rank delta, `None` when leaving the board.
    pub fn offset(self, df: i8, dr: i8) -> Option<Square> {
        let f = self.file() as i8 + df;
        let r = self.rank() as i8 + dr;
        if (0..8).contains(&f) && (0..8).contains(&r) {
            Square::new(f as u8, r as u8)
        } else {
            None
        }
    }

    /// Parse algebraic coordinates such as `e4`.
    pub fn parse(s: &str) -> Option<Square> {
        let mut chars = s.chars();
        let file = chars.next()?;
        let rank = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        Square::from_chars(file, rank)
    }

    pub(crate) fn from_chars(file: char, rank: char) -> Option<Square> {
        if !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
            return None;
        }
        Square::new(file as u8 - b'a', rank as u8 - b'1')
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank_char())
    }
}

/// Remaining castling rights for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastlingRights {
    pub const ALL: CastlingRights = CastlingRights {
        white_kingside: true,
        white_queenside: true,
        black_kingside: true,
        black_queenside: true,
    };

    pub fn kingside(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_kingside,
            Color::Black => self.black_kingside,
        }
    }

    pub fn queenside(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_queenside,
            Color::Black => self.black_queenside,
        }
    }

    pub(crate) fn revoke(&mut self, color: Color) {
        match color {
            Color::White => {
                self.white_kingside = false;
                self.white_queenside = false;
            }
            Color::Black => {
                self.black_kingside = false;
                self.black_queenside = false;
            }
        }
    }

    /// Drop the right tied to a rook home square, if `sq` is one.
    pub(crate) fn revoke_corner(&mut self, sq: Square) {
        match (sq.file(), sq.rank()) {
            (0, 0) => self.white_queenside = false,
            (7, 0) => self.white_kingside = false,
            (0, 7) => self.black_queenside = false,
            (7, 7) => self.black_kingside = false,
            _ => {}
        }
    }

    fn to_fen(self) -> String {
        let mut s = String::new();
        if self.white_kingside {
            s.push('K');
        }
        if self.white_queenside {
            s.push('Q');
        }
        if self.black_kingside {
            s.push('k');
        }
        if self.black_queenside {
            s.push('q');
        }
        if s.is_empty() {
            s.push('-');
        }
        s
    }
}

/// Errors from [`BoardState::from_fen`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("FEN must have at least 4 fields, got {0}")]
    MissingFields(usize),
    #[error("FEN placement must describe 8 ranks, got {0}")]
    RankCount(usize),
    #[error("FEN rank {rank} is malformed: '{text}'")]
    BadRank { rank: usize, text: String },
    #[error("invalid side to move '{0}'")]
    BadSide(String),
    #[error("invalid castling field '{0}'")]
    BadCastling(String),
    #[error("invalid en-passant field '{0}'")]
    BadEnPassant(String),
    #[error("invalid move counter '{0}'")]
    BadCounter(String),
}

/// A structurally impossible position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("{0} has no king")]
    MissingKing(Color),
    #[error("{color} has {count} kings")]
    ExtraKings { color: Color, count: usize },
    #[error("pawn on back rank at {0}")]
    PawnOnBackRank(Square),
    #[error("{0} is in check while not on move")]
    OpponentInCheck(Color),
}

/// A full chess position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    squares: [Option<Piece>; 64],
    side_to_move: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl Default for BoardState {
    fn default() -> Self {
        Self::standard()
    }
}

impl BoardState {
    /// The standard starting position.
    pub fn standard() -> Self {
        let mut squares = [None; 64];
        let back = [
            Role::Rook,
            Role::Knight,
            Role::Bishop,
            Role::Queen,
            Role::King,
            Role::Bishop,
            Role::Knight,
            Role::Rook,
        ];
        for (file, role) in back.iter().enumerate() {
            squares[file] = Some(Piece::new(Color::White, *role));
            squares[8 + file] = Some(Piece::new(Color::White, Role::Pawn));
            squares[48 + file] = Some(Piece::new(Color::Black, Role::Pawn));
            squares[56 + file] = Some(Piece::new(Color::Black, *role));
        }
        Self {
            squares,
            side_to_move: Color::White,
            castling: CastlingRights::ALL,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Parse a position from Forsyth–Edwards Notation.
    ///
    /// The halfmove and fullmove counters are optional and default to
    /// `0` and `1`.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(FenError::MissingFields(fields.len()));
        }

        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::RankCount(ranks.len()));
        }
        let mut squares = [None; 64];
        for (i, text) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file: u8 = 0;
            for c in text.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as u8;
                } else {
                    let piece = Piece::from_fen_char(c).ok_or_else(|| FenError::BadRank {
                        rank: rank as usize + 1,
                        text: text.to_string(),
                    })?;
                    let sq = Square::new(file, rank).ok_or_else(|| FenError::BadRank {
                        rank: rank as usize + 1,
                        text: text.to_string(),
                    })?;
                    squares[sq.index()] = Some(piece);
                    file += 1;
                }
                if file > 8 {
                    return Err(FenError::BadRank {
                        rank: rank as usize + 1,
                        text: text.to_string(),
                    });
                }
            }
            if file != 8 {
                return Err(FenError::BadRank {
                    rank: rank as usize + 1,
                    text: text.to_string(),
                });
            }
        }

        let side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::BadSide(other.to_string())),
        };

        let mut castling = CastlingRights::default();
        if fields[2] != "-" {
            for c in fields[2].chars() {
                match c {
                    'K' => castling.white_kingside = true,
                    'Q' => castling.white_queenside = true,
                    'k' => castling.black_kingside = true,
                    'q' => castling.black_queenside = true,
                    _ => return Err(FenError::BadCastling(fields[2].to_string())),
                }
            }
        }

        let en_passant = match fields[3] {
            "-" => None,
            text => Some(
                Square::parse(text).ok_or_else(|| FenError::BadEnPassant(text.to_string()))?,
            ),
        };

        let halfmove_clock = match fields.get(4) {
            Some(t) => t.parse().map_err(|_| FenError::BadCounter(t.to_string()))?,
            None => 0,
        };
        let fullmove_number = match fields.get(5) {
            Some(t) => t.parse().map_err(|_| FenError::BadCounter(t.to_string()))?,
            None => 1,
        };

        Ok(Self {
            squares,
            side_to_move,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
        })
    }

    /// Render the position as FEN.
    pub fn to_fen(&self) -> String {
        let mut placement = String::with_capacity(72);
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                let sq = Square(rank * 8 + file);
                match self.piece_at(sq) {
                    Some(piece) => {
                        if empty > 0 {
                            placement.push_str(&empty.to_string());
                            empty = 0;
                        }
                        placement.push(piece.to_fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                placement.push_str(&empty.to_string());
            }
            if rank > 0 {
                placement.push('/');
            }
        }
        let side = match self.side_to_move {
            Color::White => "w",
            Color::Black => "b",
        };
        let ep = self
            .en_passant
            .map(|sq| sq.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{} {} {} {} {} {}",
            placement,
            side,
            self.castling.to_fen(),
            ep,
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()]
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// All occupied squares with their pieces, `a1` first.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.squares
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|piece| (Square::from_index(i), piece)))
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, p)| p.color == color && p.role == Role::King)
            .map(|(sq, _)| sq)
    }

    pub(crate) fn set(&mut self, sq: Square, piece: Option<Piece>) {
        self.squares[sq.index()] = piece;
    }

    pub(crate) fn set_side_to_move(&mut self, color: Color) {
        self.side_to_move = color;
    }

    pub(crate) fn castling_mut(&mut self) -> &mut CastlingRights {
        &mut self.castling
    }

    pub(crate) fn set_en_passant(&mut self, sq: Option<Square>) {
        self.en_passant = sq;
    }

    pub(crate) fn set_clocks(&mut self, halfmove: u32, fullmove: u32) {
        self.halfmove_clock = halfmove;
        self.fullmove_number = fullmove;
    }

    /// Whether `sq` is attacked by any piece of colour `by`.
    pub fn is_attacked(&self, sq: Square, by: Color) -> bool {
        // A pawn of `by` attacks `sq` from one rank behind it.
        let pawn_dr = -by.forward();
        for df in [-1, 1] {
            if let Some(from) = sq.offset(df, pawn_dr) {
                if self.piece_at(from) == Some(Piece::new(by, Role::Pawn)) {
                    return true;
                }
            }
        }

        for (df, dr) in KNIGHT_STEPS {
            if let Some(from) = sq.offset(df, dr) {
                if self.piece_at(from) == Some(Piece::new(by, Role::Knight)) {
                    return true;
                }
            }
        }

        for (df, dr) in KING_STEPS {
            if let Some(from) = sq.offset(df, dr) {
                if self.piece_at(from) == Some(Piece::new(by, Role::King)) {
                    return true;
                }
            }
        }

        self.slider_attacks(sq, by, &ROOK_DIRECTIONS, Role::Rook)
            || self.slider_attacks(sq, by, &BISHOP_DIRECTIONS, Role::Bishop)
    }

    fn slider_attacks(&self, sq: Square, by: Color, dirs: &[(i8, i8)], role: Role) -> bool {
        for &(df, dr) in dirs {
            let mut cur = sq;
            while let Some(next) = cur.offset(df, dr) {
                if let Some(piece) = self.piece_at(next) {
                    if piece.color == by && (piece.role == role || piece.role == Role::Queen) {
                        return true;
                    }
                    break;
                }
                cur = next;
            }
        }
        false
    }

    /// Whether `color`'s king is attacked. A missing king is never in check.
    pub fn is_in_check(&self, color: Color) -> bool {
        self.king_square(color)
            .map(|k| self.is_attacked(k, color.opposite()))
            .unwrap_or(false)
    }

    /// Verify the position could arise in a legal game.
    pub fn check_consistency(&self) -> Result<(), PositionError> {
        for color in [Color::White, Color::Black] {
            let count = self
                .pieces()
                .filter(|(_, p)| p.color == color && p.role == Role::King)
                .count();
            match count {
                0 => return Err(PositionError::MissingKing(color)),
                1 => {}
                n => return Err(PositionError::ExtraKings { color, count: n }),
            }
        }
        if let Some((sq, _)) = self
            .pieces()
            .find(|(sq, p)| p.role == Role::Pawn && (sq.rank() == 0 || sq.rank() == 7))
        {
            return Err(PositionError::PawnOnBackRank(sq));
        }
        let waiting = self.side_to_move.opposite();
        if self.is_in_check(waiting) {
            return Err(PositionError::OpponentInCheck(waiting));
        }
        Ok(())
    }
}

pub(crate) const KNIGHT_STEPS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

pub(crate) const KING_STEPS: [(i8, i8); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

pub(crate) const ROOK_DIRECTIONS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
pub(crate) const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_round_trips_through_fen() {
        let board = BoardState::standard();
        assert_eq!(board.to_fen(), STARTING_FEN);
        assert_eq!(BoardState::from_fen(STARTING_FEN).unwrap(), board);
    }

    #[test]
    fn square_parse_and_display() {
        let sq = Square::parse("e4").unwrap();
        assert_eq!(sq.file(), 4);
        assert_eq!(sq.rank(), 3);
        assert_eq!(sq.to_string(), "e4");
        assert!(Square::parse("i9").is_none());
        assert!(Square::parse("e44").is_none());
    }

    #[test]
    fn fen_rejects_short_rank() {
        let err = BoardState::from_fen("rnbqkbnr/ppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -")
            .unwrap_err();
        assert!(matches!(err, FenError::BadRank { rank: 7, .. }), "got {err:?}");
    }

    #[test]
    fn attack_detection() {
        let board =
            BoardState::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").expect("valid fen");
        assert!(board.is_attacked(Square::parse("a8").unwrap(), Color::White));
        assert!(board.is_attacked(Square::parse("d1").unwrap(), Color::White));
        assert!(!board.is_attacked(Square::parse("b2").unwrap(), Color::White));
        assert!(board.is_attacked(Square::parse("d7").unwrap(), Color::Black));
    }

    #[test]
    fn consistency_flags_missing_king() {
        let board = BoardState::from_fen("8/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(
            board.check_consistency(),
            Err(PositionError::MissingKing(Color::Black))
        );
        assert!(BoardState::standard().check_consistency().is_ok());
    }
}
