//! Move validation: replays candidate plies against a simulated board.
//!
//! ```text
//!  CandidateMove ──► parse ──► exact match ──────────────► Valid
//!                                │ none
//!                                ▼
//!                      (a) marks relaxed
//!                      (b) + disambiguation relaxed ───► Corrected
//!                      (c) edit distance (garbled text)
//!                                │ none / ambiguous
//!                                ▼
//!                             Invalid   (board unchanged)
//! ```
//!
//! Each accepted ply advances the board; an Invalid ply leaves it untouched
//! so the next candidate is tried against the same position. The validator
//! is strictly sequential within one game. Independent games can be run in
//! parallel with [`validate_many`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::chess::{san_with, BoardState, CheckMark, Color, Move, MoveKind, PositionError, SanPattern};
use crate::config::CorrectionConfig;
use crate::error::ScanError;
use crate::notation::CandidateMove;

/// Outcome of validating one ply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveStatus {
    /// Transcribed text named a legal move exactly.
    Valid,
    /// Transcribed text was repaired to a unique legal move.
    Corrected,
    /// No unique legal move could be recovered; the board did not advance.
    Invalid,
}

impl fmt::Display for MoveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveStatus::Valid => f.write_str("valid"),
            MoveStatus::Corrected => f.write_str("corrected"),
            MoveStatus::Invalid => f.write_str("invalid"),
        }
    }
}

/// One ply after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedMove {
    pub move_number: u32,
    pub side: Color,
    /// Text as transcribed, before glyph normalization.
    pub notation: String,
    /// Canonical SAN of the played move, or the normalized token when Invalid.
    pub normalized_notation: String,
    pub status: MoveStatus,
    pub explanation: String,
}

impl ValidatedMove {
    pub fn is_played(&self) -> bool {
        self.status != MoveStatus::Invalid
    }
}

/// White and Black plies sharing a transcribed move number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePair {
    pub move_number: u32,
    pub white: Option<ValidatedMove>,
    pub black: Option<ValidatedMove>,
}

/// A fully validated game, in transcription order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameValidation {
    pub pairs: Vec<MovePair>,
    /// Position reached after the last accepted ply.
    pub final_fen: String,
}

impl Default for GameValidation {
    fn default() -> Self {
        Self {
            pairs: Vec::new(),
            final_fen: BoardState::standard().to_fen(),
        }
    }
}

impl GameValidation {
    /// All plies, White before Black within each pair.
    pub fn moves(&self) -> impl Iterator<Item = &ValidatedMove> + '_ {
        self.pairs
            .iter()
            .flat_map(|p| p.white.iter().chain(p.black.iter()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn count(&self, status: MoveStatus) -> usize {
        self.moves().filter(|m| m.status == status).count()
    }

    /// Plain-text per-ply status table.
    pub fn status_table(&self) -> String {
        self.to_string()
    }

    fn push(&mut self, mv: ValidatedMove) {
        match mv.side {
            Color::White => self.pairs.push(MovePair {
                move_number: mv.move_number,
                white: Some(mv),
                black: None,
            }),
            Color::Black => match self.pairs.last_mut() {
                Some(pair) if pair.move_number == mv.move_number && pair.black.is_none() => {
                    pair.black = Some(mv);
                }
                _ => self.pairs.push(MovePair {
                    move_number: mv.move_number,
                    white: None,
                    black: Some(mv),
                }),
            },
        }
    }
}

impl fmt::Display for GameValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>4}  {:<5}  {:<10}  {:<10}  {:<9}  note",
            "no.", "side", "read", "move", "status"
        )?;
        for mv in self.moves() {
            let side = match mv.side {
                Color::White => "white",
                Color::Black => "black",
            };
            writeln!(
                f,
                "{:>4}  {:<5}  {:<10}  {:<10}  {:<9}  {}",
                mv.move_number,
                side,
                mv.notation,
                mv.normalized_notation,
                mv.status,
                mv.explanation
            )?;
        }
        write!(
            f,
            "{} valid, {} corrected, {} invalid",
            self.count(MoveStatus::Valid),
            self.count(MoveStatus::Corrected),
            self.count(MoveStatus::Invalid)
        )
    }
}

/// Incremental simulation reached a position that cannot occur in chess.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("position after ply {ply} ({san}) is impossible: {source}")]
pub struct ConsistencyError {
    pub ply: usize,
    pub san: String,
    #[source]
    pub source: PositionError,
}

/// Sequential validator for a single game.
pub struct MoveValidator<'a> {
    config: &'a CorrectionConfig,
    state: BoardState,
    ply: usize,
}

impl<'a> MoveValidator<'a> {
    pub fn new(config: &'a CorrectionConfig) -> Self {
        Self::from_position(BoardState::standard(), config)
    }

    pub fn from_position(state: BoardState, config: &'a CorrectionConfig) -> Self {
        Self {
            config,
            state,
            ply: 0,
        }
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// Validate one candidate and advance the board when it is accepted.
    pub fn step(&mut self, candidate: &CandidateMove) -> Result<ValidatedMove, ConsistencyError> {
        self.ply += 1;
        let verdict = self.judge(candidate);
        let (status, normalized, explanation) = match verdict {
            Verdict::Accept { mv, san, status, explanation } => {
                let next = self.state.play(&mv);
                next.check_consistency().map_err(|source| ConsistencyError {
                    ply: self.ply,
                    san: san.clone(),
                    source,
                })?;
                self.state = next;
                (status, san, explanation)
            }
            Verdict::Reject(explanation) => (
                MoveStatus::Invalid,
                candidate.normalized_token.clone(),
                explanation,
            ),
        };

        debug!(
            ply = self.ply,
            number = candidate.move_number,
            token = %candidate.normalized_token,
            %status,
            "validated ply"
        );

        Ok(ValidatedMove {
            move_number: candidate.move_number,
            side: candidate.side,
            notation: candidate.raw_token.clone(),
            normalized_notation: normalized,
            status,
            explanation,
        })
    }

    fn judge(&self, candidate: &CandidateMove) -> Verdict {
        if candidate.is_missing() {
            return Verdict::Reject("no move transcribed".to_string());
        }
        let token = candidate.normalized_token.trim();
        let legal = self.state.legal_moves();
        if legal.is_empty() {
            let reason = if self.state.is_in_check(self.state.side_to_move()) {
                "checkmate"
            } else {
                "stalemate"
            };
            return Verdict::Reject(format!("'{token}' follows {reason}; no legal moves remain"));
        }

        let pattern = match SanPattern::parse(token) {
            Ok(pattern) => pattern,
            Err(err) => {
                if self.config.enabled && !token.is_empty() {
                    return self.by_edit_distance(token, &legal, &err.to_string());
                }
                return Verdict::Reject(err.to_string());
            }
        };

        let rendered: Vec<(Move, String)> = legal
            .iter()
            .map(|mv| (*mv, san_with(&self.state, mv, &legal)))
            .collect();

        let exact: Vec<&(Move, String)> = rendered
            .iter()
            .filter(|(mv, san)| self.matches(&pattern, mv, san, Relax::None))
            .collect();
        match exact.as_slice() {
            [(mv, san)] => {
                return Verdict::Accept {
                    mv: *mv,
                    san: san.clone(),
                    status: MoveStatus::Valid,
                    explanation: String::new(),
                }
            }
            [] => {}
            many => return Verdict::Reject(ambiguous(token, many)),
        }

        if !(self.config.enabled && self.config.relax_marks) {
            return Verdict::Reject(format!("'{token}' matches no legal move"));
        }

        for (tier, reason) in [
            (Relax::Marks, "capture/check marks relaxed"),
            (Relax::Disambiguation, "disambiguation ignored"),
        ] {
            let hits: Vec<&(Move, String)> = rendered
                .iter()
                .filter(|(mv, san)| self.matches(&pattern, mv, san, tier))
                .collect();
            match hits.as_slice() {
                [(mv, san)] => {
                    return Verdict::Accept {
                        mv: *mv,
                        san: san.clone(),
                        status: MoveStatus::Corrected,
                        explanation: format!("'{token}' corrected to '{san}' ({reason})"),
                    }
                }
                [] => {}
                many => return Verdict::Reject(ambiguous(token, many)),
            }
        }

        Verdict::Reject(format!("'{token}' matches no legal move"))
    }

    fn matches(&self, pattern: &SanPattern, mv: &Move, san: &str, relax: Relax) -> bool {
        let actual_check = check_of(san);
        match *pattern {
            SanPattern::Castle { kingside, check } => {
                let kind = if kingside {
                    MoveKind::CastleKingside
                } else {
                    MoveKind::CastleQueenside
                };
                mv.kind == kind && (relax != Relax::None || check == actual_check)
            }
            SanPattern::Standard {
                role,
                from_file,
                from_rank,
                capture,
                to,
                promotion,
                check,
            } => {
                if mv.role != role || mv.to != to || mv.is_castle() {
                    return false;
                }
                let promotion_ok = match (promotion, mv.promotion) {
                    (Some(p), Some(q)) => p == q,
                    (None, None) => true,
                    (None, Some(q)) => relax != Relax::None && self.config.default_promotion == Some(q),
                    (Some(_), None) => false,
                };
                if !promotion_ok {
                    return false;
                }
                if relax != Relax::Disambiguation {
                    if from_file.is_some_and(|f| f != mv.from.file())
                        || from_rank.is_some_and(|r| r != mv.from.rank())
                    {
                        return false;
                    }
                }
                relax != Relax::None || (capture == mv.is_capture() && check == actual_check)
            }
        }
    }

    fn by_edit_distance(&self, token: &str, legal: &[Move], parse_error: &str) -> Verdict {
        let limit = self.config.max_edit_distance;
        let bare = strip_marks(token);
        let mut best: Option<usize> = None;
        let mut hits: Vec<(Move, String)> = Vec::new();
        for mv in legal {
            let san = san_with(&self.state, mv, legal);
            let d = osa_distance(&bare, &strip_marks(&san));
            if d > limit {
                continue;
            }
            match best {
                Some(b) if d > b => {}
                Some(b) if d == b => hits.push((*mv, san)),
                _ => {
                    best = Some(d);
                    hits.clear();
                    hits.push((*mv, san));
                }
            }
        }
        match hits.as_slice() {
            [(mv, san)] => Verdict::Accept {
                mv: *mv,
                san: san.clone(),
                status: MoveStatus::Corrected,
                explanation: format!(
                    "'{token}' corrected to '{san}' (edit distance {})",
                    best.unwrap_or_default()
                ),
            },
            [] => Verdict::Reject(parse_error.to_string()),
            many => {
                let names: Vec<&str> = many.iter().map(|(_, s)| s.as_str()).collect();
                Verdict::Reject(format!(
                    "'{token}' is equally close to {}",
                    names.join(", ")
                ))
            }
        }
    }
}

enum Verdict {
    Accept {
        mv: Move,
        san: String,
        status: MoveStatus,
        explanation: String,
    },
    Reject(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relax {
    None,
    Marks,
    Disambiguation,
}

fn ambiguous(token: &str, hits: &[&(Move, String)]) -> String {
    let names: Vec<&str> = hits.iter().map(|(_, s)| s.as_str()).collect();
    format!("'{token}' is ambiguous: {}", names.join(", "))
}

fn check_of(san: &str) -> CheckMark {
    if san.ends_with('#') {
        CheckMark::Mate
    } else if san.ends_with('+') {
        CheckMark::Check
    } else {
        CheckMark::None
    }
}

fn strip_marks(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '+' | '#' | '!' | '?')).collect()
}

/// Optimal string alignment distance; an adjacent transposition costs 1.
pub(crate) fn osa_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    let mut d = vec![vec![0usize; m + 1]; n + 1];
    for (i, row) in d.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=m {
        d[0][j] = j;
    }
    for i in 1..=n {
        for j in 1..=m {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (d[i - 1][j] + 1)
                .min(d[i][j - 1] + 1)
                .min(d[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(d[i - 2][j - 2] + 1);
            }
            d[i][j] = best;
        }
    }
    d[n][m]
}

/// Validate one game from the standard starting position.
pub fn validate_game(
    candidates: &[CandidateMove],
    config: &CorrectionConfig,
) -> Result<GameValidation, ConsistencyError> {
    validate_game_from(BoardState::standard(), candidates, config)
}

/// Validate one game from an arbitrary starting position.
///
/// A trailing missing Black slot (the game ended on White's move) is
/// dropped rather than reported.
pub fn validate_game_from(
    start: BoardState,
    candidates: &[CandidateMove],
    config: &CorrectionConfig,
) -> Result<GameValidation, ConsistencyError> {
    let plies = match candidates.split_last() {
        Some((last, rest)) if last.is_missing() && last.side == Color::Black => rest,
        _ => candidates,
    };

    let mut validator = MoveValidator::from_position(start, config);
    let mut game = GameValidation {
        pairs: Vec::with_capacity(plies.len() / 2 + 1),
        final_fen: String::new(),
    };
    for candidate in plies {
        let validated = validator.step(candidate)?;
        game.push(validated);
    }
    game.final_fen = validator.state().to_fen();

    let invalid = game.count(MoveStatus::Invalid);
    if invalid > 0 {
        warn!(invalid, total = plies.len(), "game has invalid plies");
    }
    Ok(game)
}

/// Validate independent games concurrently on the blocking thread pool.
///
/// Results come back in input order.
pub async fn validate_many(
    games: Vec<Vec<CandidateMove>>,
    config: &CorrectionConfig,
) -> Result<Vec<GameValidation>, ScanError> {
    let handles: Vec<_> = games
        .into_iter()
        .map(|candidates| {
            let config = config.clone();
            tokio::task::spawn_blocking(move || validate_game(&candidates, &config))
        })
        .collect();

    let mut out = Vec::with_capacity(handles.len());
    for joined in futures::future::join_all(handles).await {
        let game = joined.map_err(|e| ScanError::Internal(format!("validation task panicked: {e}")))??;
        out.push(game);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::SanPattern;

    fn game(tokens: &[&str]) -> Vec<CandidateMove> {
        tokens
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let side = if i % 2 == 0 { Color::White } else { Color::Black };
                CandidateMove::new(i as u32 / 2 + 1, side, t)
            })
            .collect()
    }

    fn statuses(g: &GameValidation) -> Vec<MoveStatus> {
        g.moves().map(|m| m.status).collect()
    }

    #[test]
    fn clean_opening_is_all_valid() {
        let cfg = CorrectionConfig::default();
        let g = validate_game(&game(&["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"]), &cfg).unwrap();
        assert_eq!(statuses(&g), vec![MoveStatus::Valid; 6]);
        assert_eq!(g.pairs.len(), 3);
        assert_eq!(
            g.final_fen,
            "r1bqkbnr/1ppp1ppp/p1n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 0 4"
        );
    }

    #[test]
    fn unreachable_move_is_invalid_and_board_holds() {
        let cfg = CorrectionConfig::default();
        let g = validate_game(&game(&["Nf7", "e4"]), &cfg).unwrap();
        let moves: Vec<&ValidatedMove> = g.moves().collect();
        assert_eq!(moves[0].status, MoveStatus::Invalid);
        assert!(moves[0].explanation.contains("Nf7"), "{}", moves[0].explanation);
        // e4 is tried against the untouched starting position, White to move.
        assert_eq!(moves[1].status, MoveStatus::Valid);
        assert_eq!(moves[1].normalized_notation, "e4");
        assert!(g.final_fen.contains(" b "));
    }

    #[test]
    fn illegal_queen_sortie_is_invalid() {
        let cfg = CorrectionConfig::default();
        let g = validate_game(&game(&["Qh5"]), &cfg).unwrap();
        assert_eq!(statuses(&g), vec![MoveStatus::Invalid]);
        assert_eq!(g.final_fen, BoardState::standard().to_fen());
    }

    #[test]
    fn missing_capture_mark_is_corrected() {
        let cfg = CorrectionConfig::default();
        let g = validate_game(&game(&["e4", "d5", "ed5"]), &cfg).unwrap();
        let last = g.moves().last().unwrap();
        assert_eq!(last.status, MoveStatus::Corrected);
        assert_eq!(last.normalized_notation, "exd5");
        assert_eq!(last.notation, "ed5");
    }

    #[test]
    fn spurious_capture_mark_is_corrected() {
        let cfg = CorrectionConfig::default();
        let g = validate_game(&game(&["Nxf3"]), &cfg).unwrap();
        let mv = g.moves().next().unwrap();
        assert_eq!(mv.status, MoveStatus::Corrected);
        assert_eq!(mv.normalized_notation, "Nf3");
    }

    #[test]
    fn missing_mate_mark_is_corrected() {
        let cfg = CorrectionConfig::default();
        let g = validate_game(
            &game(&["e4", "e5", "Qh5", "Nc6", "Bc4", "Nf6", "Qxf7"]),
            &cfg,
        )
        .unwrap();
        let last = g.moves().last().unwrap();
        assert_eq!(last.status, MoveStatus::Corrected);
        assert_eq!(last.normalized_notation, "Qxf7#");
    }

    #[test]
    fn garbled_token_uses_edit_distance() {
        let cfg = CorrectionConfig::default();
        let g = validate_game(&game(&["e4", "e55"]), &cfg).unwrap();
        let last = g.moves().last().unwrap();
        assert_eq!(last.status, MoveStatus::Corrected);
        assert_eq!(last.normalized_notation, "e5");
        assert!(last.explanation.contains("edit distance 1"));
    }

    #[test]
    fn correction_disabled_rejects_near_misses() {
        let cfg = CorrectionConfig {
            enabled: false,
            ..CorrectionConfig::default()
        };
        let g = validate_game(&game(&["e4", "d5", "ed5", "e55"]), &cfg).unwrap();
        assert_eq!(
            statuses(&g),
            vec![
                MoveStatus::Valid,
                MoveStatus::Valid,
                MoveStatus::Invalid,
                MoveStatus::Invalid
            ]
        );
    }

    #[test]
    fn ambiguous_knight_is_invalid() {
        let start = BoardState::from_fen("4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1").unwrap();
        let cfg = CorrectionConfig::default();
        let g = validate_game_from(start, &game(&["Nd2"]), &cfg).unwrap();
        let mv = g.moves().next().unwrap();
        assert_eq!(mv.status, MoveStatus::Invalid);
        assert!(mv.explanation.contains("ambiguous"), "{}", mv.explanation);
    }

    #[test]
    fn missing_promotion_defaults_to_queen() {
        let start = BoardState::from_fen("k7/4P3/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let cfg = CorrectionConfig::default();
        let g = validate_game_from(start, &game(&["e8"]), &cfg).unwrap();
        let mv = g.moves().next().unwrap();
        assert_eq!(mv.status, MoveStatus::Corrected);
        assert_eq!(mv.normalized_notation, "e8=Q+");
    }

    #[test]
    fn missing_placeholders() {
        let cfg = CorrectionConfig::default();
        let mut candidates = game(&["e4", "e5", "Nf3"]);
        candidates.insert(1, CandidateMove::missing(1, Color::Black));
        candidates.remove(2);
        candidates.push(CandidateMove::missing(2, Color::Black));
        // 1. e4 --  2. Nf3 --   (trailing missing Black dropped)
        let g = validate_game(&candidates, &cfg).unwrap();
        let moves: Vec<&ValidatedMove> = g.moves().collect();
        assert_eq!(moves.len(), 3);
        assert_eq!(moves[1].status, MoveStatus::Invalid);
        assert_eq!(moves[1].explanation, "no move transcribed");
        assert!(g.pairs[1].black.is_none());
    }

    #[test]
    fn impossible_position_is_fatal() {
        let start = BoardState::from_fen("8/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let cfg = CorrectionConfig::default();
        let err = validate_game_from(start, &game(&["Kd1"]), &cfg).unwrap_err();
        assert_eq!(err.ply, 1);
        assert_eq!(err.source, PositionError::MissingKing(Color::Black));
    }

    #[test]
    fn accepted_moves_replay_from_start() {
        let cfg = CorrectionConfig::default();
        let g = validate_game(
            &game(&["e4", "c5", "Nf3", "d6", "d4", "cd4", "Nxd4", "Nf6", "Nc3", "a6"]),
            &cfg,
        )
        .unwrap();
        let mut board = BoardState::standard();
        for mv in g.moves().filter(|m| m.is_played()) {
            let legal = board.legal_moves();
            let next = legal
                .iter()
                .find(|m| san_with(&board, m, &legal) == mv.normalized_notation)
                .unwrap_or_else(|| panic!("{} does not replay", mv.normalized_notation));
            assert!(SanPattern::parse(&mv.normalized_notation).is_ok());
            board = board.play(next);
        }
        assert_eq!(board.to_fen(), g.final_fen);
    }

    #[test]
    fn status_table_lists_every_ply() {
        let cfg = CorrectionConfig::default();
        let g = validate_game(&game(&["e4", "Qh4"]), &cfg).unwrap();
        let table = g.status_table();
        assert!(table.contains("invalid"));
        assert!(table.ends_with("1 valid, 0 corrected, 1 invalid"), "{table}");
    }

    #[test]
    fn osa_counts_transpositions_once() {
        assert_eq!(osa_distance("Nf3", "Nf3"), 0);
        assert_eq!(osa_distance("fN3", "Nf3"), 1);
        assert_eq!(osa_distance("e55", "e5"), 1);
        assert_eq!(osa_distance("", "e4"), 2);
    }

    #[test]
    fn greek_transcript_validates_clean() {
        use crate::notation::{normalize_text, Language, NotationTables};

        let tables = NotationTables::builtin();
        let candidates = normalize_text("1. e4 e5\n2. Νφ3 Νχ6", Language::Greek, &tables);
        let g = validate_game(&candidates, &CorrectionConfig::default()).unwrap();
        assert_eq!(statuses(&g), vec![MoveStatus::Valid; 4]);
        let sans: Vec<_> = g.moves().map(|m| m.normalized_notation.as_str()).collect();
        assert_eq!(sans, vec!["e4", "e5", "Nf3", "Nc6"]);
    }

    #[tokio::test]
    async fn games_validate_independently() {
        let cfg = CorrectionConfig::default();
        let out = validate_many(vec![game(&["e4", "e5"]), game(&["d4", "Qh5"])], &cfg)
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].count(MoveStatus::Valid), 2);
        assert_eq!(out[1].count(MoveStatus::Invalid), 1);
    }
}
