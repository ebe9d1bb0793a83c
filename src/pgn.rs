//! PGN assembly: validated moves plus metadata → PGN text.
//!
//! ```text
//! [Event "Club Championship"]
//! [Site "Unknown"]
//! [Date "????.??.??"]
//! ...
//!
//! 1. e4 e5 2. Nf3 {2... Nf7 invalid: 'Nf7' matches no legal move} *
//! ```
//!
//! Only plies that were played (Valid or Corrected) appear as moves.
//! Invalid plies are kept as comments so nothing transcribed is lost, and
//! the ply after a comment restates its move number.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::chess::{BoardState, Color};
use crate::validate::{GameValidation, ValidatedMove};

/// Movetext lines wrap before this column.
pub const LINE_WIDTH: usize = 80;

const UNKNOWN: &str = "Unknown";
const UNKNOWN_DATE: &str = "????.??.??";

/// Header tags for one game. Missing values render as PGN defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameMetadata {
    pub event: Option<String>,
    pub site: Option<String>,
    /// `YYYY.MM.DD`, with `??` for unknown parts.
    pub date: Option<String>,
    pub round: Option<String>,
    pub white: Option<String>,
    pub black: Option<String>,
    /// `1-0`, `0-1`, `1/2-1/2` or `*`. When absent, a final checkmate
    /// decides it, otherwise `*`.
    pub result: Option<String>,
    /// Additional tags, emitted after the seven-tag roster in key order.
    pub extra: BTreeMap<String, String>,
}

impl GameMetadata {
    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

const ROSTER: [&str; 7] = ["Event", "Site", "Date", "Round", "White", "Black", "Result"];

/// Render `validation` as one PGN game.
pub fn assemble(validation: &GameValidation, metadata: Option<&GameMetadata>) -> String {
    let default = GameMetadata::default();
    let meta = metadata.unwrap_or(&default);
    let result = result_token(meta.result.as_deref(), validation);

    let or_unknown = |v: &Option<String>| v.clone().unwrap_or_else(|| UNKNOWN.to_string());
    let roster = [
        or_unknown(&meta.event),
        or_unknown(&meta.site),
        meta.date.clone().unwrap_or_else(|| UNKNOWN_DATE.to_string()),
        or_unknown(&meta.round),
        or_unknown(&meta.white),
        or_unknown(&meta.black),
        result.to_string(),
    ];

    let mut out = String::new();
    for (name, value) in ROSTER.iter().zip(roster.iter()) {
        push_tag(&mut out, name, value);
    }
    for (name, value) in &meta.extra {
        if !ROSTER.contains(&name.as_str()) {
            push_tag(&mut out, name, value);
        }
    }
    out.push('\n');

    let mut tokens = movetext_tokens(validation);
    tokens.push(result.to_string());
    out.push_str(&wrap(&tokens, LINE_WIDTH));
    out.push('\n');
    out
}

fn push_tag(out: &mut String, name: &str, value: &str) {
    out.push('[');
    out.push_str(name);
    out.push_str(" \"");
    out.push_str(&escape_tag_value(value));
    out.push_str("\"]\n");
}

fn escape_tag_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn result_token<'a>(given: Option<&'a str>, validation: &GameValidation) -> &'a str {
    match given.map(str::trim) {
        Some(r @ ("1-0" | "0-1" | "1/2-1/2" | "*")) => r,
        Some("½-½") => "1/2-1/2",
        Some(_) => "*",
        None => match BoardState::from_fen(&validation.final_fen) {
            Ok(board) if board.is_checkmate() => match board.side_to_move() {
                Color::White => "0-1",
                Color::Black => "1-0",
            },
            _ => "*",
        },
    }
}

// ── Movetext ────────────────────────────────────────────────────────────────

fn movetext_tokens(validation: &GameValidation) -> Vec<String> {
    let mut tokens = Vec::new();
    for pair in &validation.pairs {
        let n = pair.move_number;
        let mut black_needs_number = true;
        if let Some(white) = &pair.white {
            if white.is_played() {
                tokens.push(format!("{n}."));
                tokens.push(white.normalized_notation.clone());
                black_needs_number = false;
            } else {
                tokens.push(comment(&format!("{n}."), white));
            }
        }
        if let Some(black) = &pair.black {
            if black.is_played() {
                if black_needs_number {
                    tokens.push(format!("{n}..."));
                }
                tokens.push(black.normalized_notation.clone());
            } else {
                tokens.push(comment(&format!("{n}..."), black));
            }
        }
    }
    tokens
}

fn comment(number: &str, mv: &ValidatedMove) -> String {
    let text = format!("{number} {} invalid: {}", mv.notation, mv.explanation);
    format!("{{{}}}", text.replace(['{', '}'], ""))
}

/// Greedy line fill; a token longer than `width` gets a line of its own.
fn wrap(tokens: &[String], width: usize) -> String {
    let mut out = String::new();
    let mut line_len = 0;
    for token in tokens {
        let len = token.chars().count();
        if line_len > 0 && line_len + 1 + len > width {
            out.push('\n');
            line_len = 0;
        }
        if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        out.push_str(token);
        line_len += len;
    }
    out
}
