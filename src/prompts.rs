//! System prompts for column transcription.
//!
//! Every prompt lives here so a wording change touches one file and tests
//! can inspect the exact text without a live model.
//!
//! Callers can override the prompt via [`crate::config::ScanConfig::system_prompt`];
//! otherwise [`recognition_prompt`] builds one from the language's
//! character whitelist.

use crate::notation::{GlyphTable, Language};

/// Instructions shared by every language.
pub const BASE_SYSTEM_PROMPT: &str = r#"You transcribe one column of a handwritten chess scoresheet.

Follow these rules precisely:

1. CONTENT
   - Copy every move exactly as written, even if it looks illegal
   - Keep move numbers as written (e.g. "12." or "12")
   - Never invent, reorder or complete moves

2. LAYOUT
   - One table row per output line, top to bottom
   - Put the move number first, then the moves on that row separated by a space
   - Write "--" for an empty or unreadable move cell
   - Skip printed headers such as "White", "Black" or "No."

3. OUTPUT FORMAT
   - Output ONLY the transcription
   - Do NOT wrap in ``` fences
   - Do NOT add commentary or explanations"#;

/// Build the system prompt for `language`, listing the characters the
/// recogniser may emit.
pub fn recognition_prompt(language: Language, table: &GlyphTable) -> String {
    let allowed: String = table.whitelist.chars().filter(|c| *c != ' ').collect();
    format!(
        "{BASE_SYSTEM_PROMPT}\n\n4. ALPHABET\n   - The moves are written in {} notation\n   - Use ONLY these characters: {allowed}",
        language.name()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::NotationTables;

    #[test]
    fn prompt_names_language_and_whitelist() {
        let tables = NotationTables::builtin();
        let prompt = recognition_prompt(Language::German, tables.get(Language::German).unwrap());
        assert!(prompt.starts_with(BASE_SYSTEM_PROMPT));
        assert!(prompt.contains("german notation"));
        assert!(prompt.contains('T') && prompt.contains('S'));
    }

    #[test]
    fn greek_prompt_carries_greek_letters() {
        let tables = NotationTables::builtin();
        let prompt = recognition_prompt(Language::Greek, tables.get(Language::Greek).unwrap());
        assert!(prompt.contains('φ') && prompt.contains('χ'));
    }
}
