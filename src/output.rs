//! Output types returned by a scan.

use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;
use crate::pipeline::geometry::CornerInfo;
use crate::raster::{Boundary, RasterImage};
use crate::validate::{GameValidation, MoveStatus};

/// Text lines read from one column, top to bottom.
///
/// `page` and `column` are 1-indexed; `0` marks text that did not come
/// from an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTranscript {
    pub page: usize,
    pub column: usize,
    pub lines: Vec<String>,
}

/// A degradation recorded on the run. None of these abort the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunIssue {
    /// Table or column detection fell back to a default layout.
    GeometryAmbiguous { page: usize, detail: String },
    /// A column could not be transcribed; its page contributed no moves.
    ExtractionFailed { error: ExtractionError },
    /// Normalization produced no candidates at all.
    NormalizationEmpty,
}

impl std::fmt::Display for RunIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunIssue::GeometryAmbiguous { page, detail } => {
                write!(f, "page {page}: geometry fallback ({detail})")
            }
            RunIssue::ExtractionFailed { error } => write!(f, "{error}"),
            RunIssue::NormalizationEmpty => f.write_str("no moves could be read"),
        }
    }
}

/// Geometry and extraction summary for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageReport {
    pub page: usize,
    pub width: u32,
    pub height: u32,
    pub table: Boundary,
    pub table_fallback: bool,
    pub columns: Vec<Boundary>,
    pub columns_fallback: bool,
    /// Column indices (1-indexed) the recogniser failed on.
    pub failed_columns: Vec<usize>,
    /// False when any column failed; such a page contributes no moves.
    pub included: bool,
}

/// Aggregate statistics for a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub pages: usize,
    pub columns: usize,
    pub failed_columns: usize,
    pub candidates: usize,
    pub valid: usize,
    pub corrected: usize,
    pub invalid: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub recognition_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl ScanStats {
    pub(crate) fn tally(&mut self, validation: &GameValidation) {
        self.valid = validation.count(MoveStatus::Valid);
        self.corrected = validation.count(MoveStatus::Corrected);
        self.invalid = validation.count(MoveStatus::Invalid);
    }
}

/// Intermediate artefacts kept when [`crate::ScanConfig::debug`] is set.
#[derive(Debug, Clone, Default)]
pub struct DebugArtifacts {
    /// One overlay per page with table, splits and corners drawn in.
    pub overlays: Vec<RasterImage>,
    /// Column crops per page, left to right.
    pub columns: Vec<Vec<RasterImage>>,
    /// Every successful transcript, after cleanup.
    pub transcripts: Vec<RawTranscript>,
    /// Diagnostic corners per page.
    pub corners: Vec<Vec<CornerInfo>>,
}

/// Result of a scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutput {
    pub pgn: String,
    pub validation: GameValidation,
    pub pages: Vec<PageReport>,
    pub issues: Vec<RunIssue>,
    pub stats: ScanStats,
    #[serde(skip)]
    pub debug: Option<DebugArtifacts>,
}

impl ScanOutput {
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}
