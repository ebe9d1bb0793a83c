//! Notation normalization: transcribed lines → numbered move candidates.
//!
//! ```text
//!  "12. Sf3 Lc5"   ──glyphs──►  "12." "Nf3" "Bc5"
//!                  ──pairing──► (12, White, Nf3) (12, Black, Bc5)
//! ```
//!
//! Pairing is anchored to the move numbers written on the sheet. A pair
//! whose Black move never shows up gets an explicit missing placeholder
//! instead of borrowing the next line's move, so numbering never drifts.
//! The state machine runs across line and column boundaries: a Black move
//! at the top of column two completes a pair left open at the bottom of
//! column one.

pub mod tables;

pub use tables::{ContextualGlyph, GlyphTable, Language, NotationTables, UnknownLanguage};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chess::Color;
use crate::output::RawTranscript;

/// Normalized token standing in for a ply nobody wrote down.
pub const MISSING_PLACEHOLDER: &str = "--";

/// One ply read off the sheet, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMove {
    pub move_number: u32,
    pub side: Color,
    /// Token exactly as transcribed; empty for a missing ply.
    pub raw_token: String,
    /// Token in canonical English notation.
    pub normalized_token: String,
}

impl CandidateMove {
    /// A candidate whose raw and normalized text coincide.
    pub fn new(move_number: u32, side: Color, token: &str) -> Self {
        Self {
            move_number,
            side,
            raw_token: token.to_string(),
            normalized_token: token.to_string(),
        }
    }

    pub fn missing(move_number: u32, side: Color) -> Self {
        Self {
            move_number,
            side,
            raw_token: String::new(),
            normalized_token: MISSING_PLACEHOLDER.to_string(),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.normalized_token == MISSING_PLACEHOLDER
    }
}

// ── Token classification ─────────────────────────────────────────────────────

static RE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3})(\.\.\.|…|\.|\))?$").unwrap());

static RE_PREFIXED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3})(\.\.\.|…|\.|\))(.+)$").unwrap());

static RE_RESULT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:1-0|0-1|1/2-1/2|½-½|\*)$").unwrap());

static RE_ELLIPSIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\.{2,}|…)+$").unwrap());

static RE_CASTLE_LONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[O0o]-?[O0o]-?[O0o]").unwrap());

static RE_CASTLE_SHORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[O0o]-?[O0o]").unwrap());

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Marker { number: u32, black_only: bool },
    /// Detached `...` after a number: the White half is skipped.
    Ellipsis,
    Move(&'a str),
}

fn classify(word: &str) -> Vec<Token<'_>> {
    if RE_RESULT.is_match(word) {
        return Vec::new();
    }
    if RE_ELLIPSIS.is_match(word) {
        return vec![Token::Ellipsis];
    }
    if let Some(caps) = RE_MARKER.captures(word) {
        if let Ok(number) = caps[1].parse() {
            let black_only = caps.get(2).is_some_and(|m| m.as_str() != "." && m.as_str() != ")");
            return vec![Token::Marker { number, black_only }];
        }
    }
    if let Some(caps) = RE_PREFIXED.captures(word) {
        if let (Ok(number), Some(rest)) = (caps[1].parse(), caps.get(3)) {
            let black_only = matches!(&caps[2], "..." | "…");
            let rest = rest.as_str();
            return vec![Token::Marker { number, black_only }, Token::Move(rest)];
        }
    }
    vec![Token::Move(word)]
}

/// Canonicalize one move token under `table`.
///
/// Language glyphs become SAN letters, zero/lower-case castling becomes
/// `O-O`/`O-O-O`, and `:`/`×`/`X` capture marks become `x`.
pub fn normalize_token(raw: &str, table: &GlyphTable) -> String {
    let token = raw.trim().trim_end_matches([',', ';']);
    let substituted = table.substitute(token);

    if let Some(m) = RE_CASTLE_LONG.find(&substituted) {
        return format!("O-O-O{}", &substituted[m.end()..]);
    }
    if let Some(m) = RE_CASTLE_SHORT.find(&substituted) {
        return format!("O-O{}", &substituted[m.end()..]);
    }

    substituted
        .chars()
        .map(|c| match c {
            ':' | '×' | 'X' => 'x',
            other => other,
        })
        .collect()
}

// ── Pairing state machine ────────────────────────────────────────────────────

struct Slot {
    raw: String,
    normalized: String,
}

#[derive(Default)]
struct OpenPair {
    number: u32,
    black_only: bool,
    white: Option<Slot>,
    black: Option<Slot>,
}

impl OpenPair {
    fn is_empty(&self) -> bool {
        self.white.is_none() && self.black.is_none()
    }
}

struct Pairer<'t> {
    table: &'t GlyphTable,
    out: Vec<CandidateMove>,
    open: Option<OpenPair>,
    last_number: u32,
    /// Numbered pairs that had no moves at all; emitted only if something follows.
    blank_numbers: Vec<u32>,
}

impl<'t> Pairer<'t> {
    fn new(table: &'t GlyphTable) -> Self {
        Self {
            table,
            out: Vec::new(),
            open: None,
            last_number: 0,
            blank_numbers: Vec::new(),
        }
    }

    fn marker(&mut self, number: u32, black_only: bool) {
        if black_only {
            if let Some(open) = self.open.as_mut() {
                if open.number == number && open.black.is_none() {
                    open.black_only = true;
                    return;
                }
            }
        }
        self.flush();
        self.open = Some(OpenPair {
            number,
            black_only,
            ..OpenPair::default()
        });
    }

    fn ellipsis(&mut self) {
        if let Some(open) = self.open.as_mut() {
            if open.white.is_none() && open.black.is_none() {
                open.black_only = true;
            }
        }
    }

    fn push_move(&mut self, raw: &str) {
        let normalized = normalize_token(raw, self.table);
        if normalized.is_empty() {
            return;
        }
        let slot = Slot {
            raw: raw.to_string(),
            normalized,
        };

        let needs_new = match &self.open {
            None => true,
            Some(open) => open.black.is_some(),
        };
        if needs_new {
            let number = self
                .open
                .as_ref()
                .map(|o| o.number)
                .unwrap_or(self.last_number)
                + 1;
            self.flush();
            self.open = Some(OpenPair {
                number,
                ..OpenPair::default()
            });
        }

        if let Some(open) = self.open.as_mut() {
            if open.white.is_none() && !open.black_only {
                open.white = Some(slot);
            } else {
                open.black = Some(slot);
            }
        }
    }

    fn flush(&mut self) {
        let Some(open) = self.open.take() else {
            return;
        };
        self.last_number = open.number;
        if open.is_empty() {
            self.blank_numbers.push(open.number);
            return;
        }
        for number in self.blank_numbers.drain(..) {
            self.out.push(CandidateMove::missing(number, Color::White));
            self.out.push(CandidateMove::missing(number, Color::Black));
        }
        for (side, slot) in [(Color::White, open.white), (Color::Black, open.black)] {
            self.out.push(match slot {
                Some(slot) => CandidateMove {
                    move_number: open.number,
                    side,
                    raw_token: slot.raw,
                    normalized_token: slot.normalized,
                },
                None => CandidateMove::missing(open.number, side),
            });
        }
    }

    fn line(&mut self, line: &str) {
        for word in line.split_whitespace() {
            for token in classify(word) {
                match token {
                    Token::Marker { number, black_only } => self.marker(number, black_only),
                    Token::Ellipsis => self.ellipsis(),
                    Token::Move(text) => self.push_move(text),
                }
            }
        }
    }

    fn finish(mut self) -> Vec<CandidateMove> {
        self.flush();
        self.out
    }
}

/// Split one transcript into move candidates.
///
/// Languages without a table in `tables` fall back to English glyphs.
pub fn normalize(
    transcript: &RawTranscript,
    language: Language,
    tables: &NotationTables,
) -> Vec<CandidateMove> {
    normalize_transcripts(std::slice::from_ref(transcript), language, tables)
}

/// Split consecutive transcripts (columns, in reading order) into one
/// candidate sequence, carrying open pairs across column breaks.
pub fn normalize_transcripts(
    transcripts: &[RawTranscript],
    language: Language,
    tables: &NotationTables,
) -> Vec<CandidateMove> {
    let builtin = NotationTables::shared();
    let Some(table) = tables
        .get(language)
        .or_else(|| builtin.get(Language::English))
    else {
        return Vec::new();
    };

    let mut pairer = Pairer::new(table);
    for transcript in transcripts {
        for line in &transcript.lines {
            pairer.line(line);
        }
    }
    let candidates = pairer.finish();
    debug!(
        %language,
        columns = transcripts.len(),
        candidates = candidates.len(),
        "normalized transcripts"
    );
    candidates
}

/// Normalize free text (one move pair per line) without page metadata.
pub fn normalize_text(text: &str, language: Language, tables: &NotationTables) -> Vec<CandidateMove> {
    let transcript = RawTranscript {
        page: 0,
        column: 0,
        lines: text.lines().map(str::to_string).collect(),
    };
    normalize(&transcript, language, tables)
}
