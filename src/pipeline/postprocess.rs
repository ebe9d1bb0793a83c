//! Post-processing: deterministic cleanup of recogniser output.
//!
//! Even a tightly prompted model wraps its answer in code fences now and
//! then, emits `\r\n`, slips in zero-width characters, or adds a chatty
//! preamble full of letters no scoresheet contains. These rules strip all
//! of that without interpreting the moves; interpretation belongs to the
//! normalizer.
//!
//! ## Rule Order
//!
//! Fences come off before line splitting so the fence lines disappear
//! whole; invisible characters go before the whitelist filter so a
//! zero-width joiner never splits a token in two.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::notation::GlyphTable;

/// Apply all cleanup rules to one column transcript.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip outer code fences
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Drop characters outside the language whitelist (whitespace kept)
/// 5. Collapse runs of spaces and trim each line
/// 6. Drop lines left empty
pub fn clean_transcript(input: &str, table: &GlyphTable) -> Vec<String> {
    let s = normalise_line_endings(input);
    let s = strip_code_fences(&s);
    let s = remove_invisible_chars(&s);
    s.lines()
        .map(|line| restrict_to_whitelist(line, table))
        .map(|line| collapse_spaces(&line))
        .filter(|line| !line.is_empty())
        .collect()
}

// ── Rule 1: Normalise line endings ──────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip outer code fences ─────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\n(.*?)\n?```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 3: Strip invisible Unicode ─────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'
            )
        })
        .collect()
}

// ── Rule 4: Whitelist ───────────────────────────────────────────────────────

fn restrict_to_whitelist(line: &str, table: &GlyphTable) -> String {
    line.chars()
        .map(|c| if c == '\t' { ' ' } else { c })
        .filter(|&c| c == ' ' || table.allows(c))
        .collect()
}

// ── Rule 5: Collapse spaces ─────────────────────────────────────────────────

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

fn collapse_spaces(line: &str) -> String {
    RE_SPACES.replace_all(line.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::{Language, NotationTables};

    fn english() -> GlyphTable {
        NotationTables::builtin()
            .get(Language::English)
            .cloned()
            .unwrap()
    }

    #[test]
    fn strips_fences_and_crlf() {
        let raw = "```text\r\n1. e4 e5\r\n2. Nf3 Nc6\r\n```";
        assert_eq!(clean_transcript(raw, &english()), vec!["1. e4 e5", "2. Nf3 Nc6"]);
    }

    #[test]
    fn drops_characters_outside_whitelist() {
        let raw = "Here you go:\n1. e4\te5 ✓";
        let lines = clean_transcript(raw, &english());
        // "Here you go:" keeps only whitelisted letters.
        assert_eq!(lines[1], "1. e4 e5");
        assert!(lines[0].chars().all(|c| c == ' ' || english().allows(c)));
    }

    #[test]
    fn removes_invisible_characters_and_blank_lines() {
        let raw = "\u{FEFF}1. d4\u{200B} d5\n\n   \n2. c4";
        assert_eq!(clean_transcript(raw, &english()), vec!["1. d4 d5", "2. c4"]);
    }

    #[test]
    fn empty_output_gives_no_lines() {
        assert!(clean_transcript("", &english()).is_empty());
        assert!(clean_transcript("```\n```", &english()).is_empty());
    }

    #[test]
    fn greek_letters_survive_the_greek_whitelist() {
        let tables = NotationTables::builtin();
        let greek = tables.get(Language::Greek).unwrap();
        assert_eq!(clean_transcript("2. Νφ3 Νχ6", greek), vec!["2. Νφ3 Νχ6"]);
    }

    #[test]
    fn result_tokens_survive_cleaning() {
        let raw = "1. e4 e5\n2. Nf3 Nc6 1/2-1/2";
        assert_eq!(
            clean_transcript(raw, &english()),
            vec!["1. e4 e5", "2. Nf3 Nc6 1/2-1/2"]
        );
        assert_eq!(clean_transcript("41. Kg2 ½-½", &english()), vec!["41. Kg2 ½-½"]);
        assert_eq!(clean_transcript("12. Qd1 *", &english()), vec!["12. Qd1 *"]);
    }
}
