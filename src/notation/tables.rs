//! Per-language glyph tables.
//!
//! A [`GlyphTable`] maps the piece and file glyphs a scoresheet language
//! uses onto canonical English SAN letters, and carries the character
//! whitelist handed to the recogniser for that language. Tables are plain
//! data: they serialise to JSON, so deployments can ship their own set
//! through [`NotationTables::from_json`] instead of recompiling.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scoresheet language.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    German,
    French,
    Spanish,
    Italian,
    Dutch,
    Russian,
    Greek,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::English,
        Language::German,
        Language::French,
        Language::Spanish,
        Language::Italian,
        Language::Dutch,
        Language::Russian,
        Language::Greek,
    ];

    /// ISO 639-1 code.
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::German => "de",
            Language::French => "fr",
            Language::Spanish => "es",
            Language::Italian => "it",
            Language::Dutch => "nl",
            Language::Russian => "ru",
            Language::Greek => "el",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::English => "english",
            Language::German => "german",
            Language::French => "french",
            Language::Spanish => "spanish",
            Language::Italian => "italian",
            Language::Dutch => "dutch",
            Language::Russian => "russian",
            Language::Greek => "greek",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown language '{0}' (expected one of: en, de, fr, es, it, nl, ru, el)")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    /// Accepts the ISO code or the English name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|l| l.code() == wanted || l.name() == wanted)
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}

/// A glyph whose meaning depends on whether a rank digit follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextualGlyph {
    pub glyph: String,
    /// Replacement when the next character is a rank digit `1`–`8`.
    pub before_rank: String,
    /// Replacement everywhere else.
    pub otherwise: String,
}

/// Glyph substitutions and recogniser whitelist for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphTable {
    pub language: Language,
    /// `(glyph, canonical)` pairs, tried longest glyph first.
    pub substitutions: Vec<(String, String)>,
    #[serde(default)]
    pub contextual: Vec<ContextualGlyph>,
    /// Every character the recogniser is allowed to emit.
    pub whitelist: String,
}

/// Characters every language needs: files, digits, move-number and
/// capture/check punctuation, castling letters and canonical piece letters.
const COMMON_WHITELIST: &str = "abcdefgh0123456789KQRBNPOox:×+#=-.…)!?/½* ";

impl GlyphTable {
    fn new(language: Language, substitutions: &[(&str, &str)], contextual: &[(&str, &str, &str)]) -> Self {
        let mut substitutions: Vec<(String, String)> = substitutions
            .iter()
            .map(|(g, c)| (g.to_string(), c.to_string()))
            .collect();
        substitutions.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));

        let contextual: Vec<ContextualGlyph> = contextual
            .iter()
            .map(|(glyph, before_rank, otherwise)| ContextualGlyph {
                glyph: glyph.to_string(),
                before_rank: before_rank.to_string(),
                otherwise: otherwise.to_string(),
            })
            .collect();

        let mut whitelist = COMMON_WHITELIST.to_string();
        let extra = substitutions
            .iter()
            .flat_map(|(g, _)| g.chars())
            .chain(contextual.iter().flat_map(|c| c.glyph.chars()));
        for c in extra {
            if !whitelist.contains(c) {
                whitelist.push(c);
            }
        }

        Self {
            language,
            substitutions,
            contextual,
            whitelist,
        }
    }

    pub fn allows(&self, c: char) -> bool {
        self.whitelist.contains(c)
    }

    /// Rewrite language glyphs into canonical SAN letters in one pass.
    ///
    /// Output characters are never re-examined, so tables that swap letters
    /// (French `R`→`K` alongside `T`→`R`) stay unambiguous.
    pub fn substitute(&self, token: &str) -> String {
        let mut out = String::with_capacity(token.len());
        let mut rest = token;
        'scan: while let Some(c) = rest.chars().next() {
            for ctx in &self.contextual {
                if let Some(after) = rest.strip_prefix(ctx.glyph.as_str()) {
                    let rank_follows = after.chars().next().is_some_and(|n| ('1'..='8').contains(&n));
                    out.push_str(if rank_follows {
                        &ctx.before_rank
                    } else {
                        &ctx.otherwise
                    });
                    rest = after;
                    continue 'scan;
                }
            }
            for (glyph, canonical) in &self.substitutions {
                if let Some(after) = rest.strip_prefix(glyph.as_str()) {
                    out.push_str(canonical);
                    rest = after;
                    continue 'scan;
                }
            }
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
        out
    }
}

/// The full set of glyph tables, keyed by language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotationTables {
    tables: BTreeMap<Language, GlyphTable>,
}

static BUILTIN: Lazy<Arc<NotationTables>> = Lazy::new(|| Arc::new(NotationTables::builtin()));

impl Default for NotationTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl NotationTables {
    /// Tables for every supported language.
    pub fn builtin() -> Self {
        let tables = [
            GlyphTable::new(Language::English, &[], &[]),
            GlyphTable::new(
                Language::German,
                &[("D", "Q"), ("T", "R"), ("L", "B"), ("S", "N")],
                &[],
            ),
            GlyphTable::new(
                Language::French,
                &[("R", "K"), ("D", "Q"), ("T", "R"), ("F", "B"), ("C", "N")],
                &[],
            ),
            GlyphTable::new(
                Language::Spanish,
                &[("R", "K"), ("D", "Q"), ("T", "R"), ("A", "B"), ("C", "N")],
                &[],
            ),
            GlyphTable::new(
                Language::Italian,
                &[("R", "K"), ("D", "Q"), ("T", "R"), ("A", "B"), ("C", "N")],
                &[],
            ),
            GlyphTable::new(
                Language::Dutch,
                &[("D", "Q"), ("T", "R"), ("L", "B"), ("P", "N")],
                &[],
            ),
            GlyphTable::new(
                Language::Russian,
                &[
                    ("Кр", "K"),
                    ("Ф", "Q"),
                    ("Л", "R"),
                    ("С", "B"),
                    ("К", "N"),
                    ("а", "a"),
                    ("б", "b"),
                    ("с", "c"),
                    ("д", "d"),
                    ("е", "e"),
                    ("ф", "f"),
                    ("г", "g"),
                    ("О", "O"),
                    ("о", "o"),
                ],
                &[("х", "h", "x")],
            ),
            GlyphTable::new(
                Language::Greek,
                &[
                    ("Ρ", "K"),
                    ("Κ", "K"),
                    ("Β", "Q"),
                    ("Π", "R"),
                    ("Α", "B"),
                    ("Ι", "N"),
                    ("Ν", "N"),
                    ("α", "a"),
                    ("β", "b"),
                    ("γ", "c"),
                    ("δ", "d"),
                    ("ε", "e"),
                    ("ζ", "f"),
                    ("φ", "f"),
                    ("η", "g"),
                    ("θ", "h"),
                    ("Ο", "O"),
                    ("ο", "o"),
                ],
                &[("χ", "c", "x")],
            ),
        ];
        Self {
            tables: tables.into_iter().map(|t| (t.language, t)).collect(),
        }
    }

    /// Process-wide shared copy of [`NotationTables::builtin`].
    pub fn shared() -> Arc<NotationTables> {
        Arc::clone(&BUILTIN)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn get(&self, language: Language) -> Option<&GlyphTable> {
        self.tables.get(&language)
    }

    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        self.tables.keys().copied()
    }
}
