//! Standard Algebraic Notation: rendering legal moves and parsing tokens.
//!
//! Rendering always produces the canonical form (minimal disambiguation,
//! `x` for captures, `=Q` for promotion, `+`/`#` suffixes). Parsing is
//! deliberately lenient about surface variants seen on handwritten sheets:
//! `0-0`, `:` as a capture mark, `-` between squares, long algebraic
//! (`e2e4`), an explicit `P` for pawns and trailing `!?` annotations.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::board::{BoardState, Role, Square};
use super::movegen::{Move, MoveKind};

/// Check suffix carried by a SAN token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckMark {
    #[default]
    None,
    Check,
    Mate,
}

impl CheckMark {
    fn from_suffix(s: Option<&str>) -> CheckMark {
        match s {
            Some("+") => CheckMark::Check,
            Some("#") => CheckMark::Mate,
            _ => CheckMark::None,
        }
    }

    /// The mark `mv` actually produces when played from `board`.
    pub fn after(board: &BoardState, mv: &Move) -> CheckMark {
        let next = board.play(mv);
        if !next.is_in_check(next.side_to_move()) {
            CheckMark::None
        } else if next.legal_moves().is_empty() {
            CheckMark::Mate
        } else {
            CheckMark::Check
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            CheckMark::None => "",
            CheckMark::Check => "+",
            CheckMark::Mate => "#",
        }
    }
}

/// Render `mv` in canonical SAN.
pub fn to_san(board: &BoardState, mv: &Move) -> String {
    san_with(board, mv, &board.legal_moves())
}

/// Render `mv` in canonical SAN, disambiguating against `legal`.
///
/// `legal` must be the legal move list of `board`; callers that already
/// hold it avoid regenerating it for every move rendered.
pub fn san_with(board: &BoardState, mv: &Move, legal: &[Move]) -> String {
    let mut san = String::with_capacity(8);
    match mv.kind {
        MoveKind::CastleKingside => san.push_str("O-O"),
        MoveKind::CastleQueenside => san.push_str("O-O-O"),
        _ => match mv.role.san_letter() {
            None => {
                if mv.is_capture() {
                    san.push(mv.from.file_char());
                    san.push('x');
                }
                san.push_str(&mv.to.to_string());
                if let Some(promo) = mv.promotion.and_then(Role::san_letter) {
                    san.push('=');
                    san.push(promo);
                }
            }
            Some(letter) => {
                san.push(letter);
                let rivals: Vec<&Move> = legal
                    .iter()
                    .filter(|o| o.role == mv.role && o.to == mv.to && o.from != mv.from)
                    .collect();
                if !rivals.is_empty() {
                    let file_unique = rivals.iter().all(|o| o.from.file() != mv.from.file());
                    let rank_unique = rivals.iter().all(|o| o.from.rank() != mv.from.rank());
                    if file_unique {
                        san.push(mv.from.file_char());
                    } else if rank_unique {
                        san.push(mv.from.rank_char());
                    } else {
                        san.push(mv.from.file_char());
                        san.push(mv.from.rank_char());
                    }
                }
                if mv.is_capture() {
                    san.push('x');
                }
                san.push_str(&mv.to.to_string());
            }
        },
    }
    san.push_str(CheckMark::after(board, mv).suffix());
    san
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanError {
    #[error("empty move token")]
    Empty,
    #[error("'{0}' is not algebraic notation")]
    Unrecognised(String),
}

/// The structure read out of a SAN token, before it is matched against a
/// position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanPattern {
    Castle {
        kingside: bool,
        check: CheckMark,
    },
    Standard {
        role: Role,
        from_file: Option<u8>,
        from_rank: Option<u8>,
        capture: bool,
        to: Square,
        promotion: Option<Role>,
        check: CheckMark,
    },
}

static ANNOTATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[!?]+|\s*e\.p\.)+$").expect("valid regex"));

static CASTLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([O0])-([O0])(-[O0])?([+#])?$").expect("valid regex"));

static STANDARD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([NBRQKP])?([a-h])?([1-8])?([x:×-])?([a-h][1-8])(?:=?([NBRQ]))?([+#])?$")
        .expect("valid regex")
});

impl SanPattern {
    pub fn parse(token: &str) -> Result<SanPattern, SanError> {
        let trimmed = token.trim();
        let stripped = ANNOTATION_RE.replace(trimmed, "");
        let text = stripped.trim();
        if text.is_empty() {
            return Err(SanError::Empty);
        }

        if let Some(caps) = CASTLE_RE.captures(text) {
            return Ok(SanPattern::Castle {
                kingside: caps.get(3).is_none(),
                check: CheckMark::from_suffix(caps.get(4).map(|m| m.as_str())),
            });
        }

        let caps = STANDARD_RE
            .captures(text)
            .ok_or_else(|| SanError::Unrecognised(token.to_string()))?;

        let role = caps
            .get(1)
            .and_then(|m| m.as_str().chars().next())
            .and_then(Role::from_san_letter)
            .unwrap_or(Role::Pawn);
        let from_file = caps
            .get(2)
            .and_then(|m| m.as_str().bytes().next())
            .map(|b| b - b'a');
        let from_rank = caps
            .get(3)
            .and_then(|m| m.as_str().bytes().next())
            .map(|b| b - b'1');
        let capture = caps.get(4).is_some_and(|m| m.as_str() != "-");
        let to = caps
            .get(5)
            .and_then(|m| Square::parse(m.as_str()))
            .ok_or_else(|| SanError::Unrecognised(token.to_string()))?;
        let promotion = caps
            .get(6)
            .and_then(|m| m.as_str().chars().next())
            .and_then(Role::from_san_letter);

        Ok(SanPattern::Standard {
            role,
            from_file,
            from_rank,
            capture,
            to,
            promotion,
            check: CheckMark::from_suffix(caps.get(7).map(|m| m.as_str())),
        })
    }

    pub fn check(&self) -> CheckMark {
        match self {
            SanPattern::Castle { check, .. } | SanPattern::Standard { check, .. } => *check,
        }
    }
}
