//! # scoresheet2pgn
//!
//! Turn photographed chess scoresheets into validated PGN.
//!
//! ## Why this crate?
//!
//! Handwritten scoresheets are the only record of most over-the-board
//! games. Generic OCR reads them badly: the move table confuses layout
//! engines, notation differs by language, and one misread square silently
//! corrupts every later move. This crate splits the sheet into its move
//! columns with plain image geometry, has a vision model read one column at
//! a time, and then replays every move on a real board so that each ply is
//! reported as valid, corrected, or invalid instead of trusted blindly.
//!
//! ## Pipeline Overview
//!
//! ```text
//! page image(s)
//!  │
//!  ├─ 1. Geometry   ruled-table boundary + column splits (spawn_blocking)
//!  ├─ 2. Columns    per-column crops, optional review overlay
//!  ├─ 3. Recognise  concurrent vision-model calls, language whitelist
//!  ├─ 4. Normalize  language glyphs → SAN, numbered White/Black pairs
//!  ├─ 5. Validate   legal-move replay: Valid / Corrected / Invalid
//!  └─ 6. Assemble   seven-tag PGN + per-ply status table
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scoresheet2pgn::{scan_files, GameMetadata, Language, ScanConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ScanConfig::builder().language(Language::German).build()?;
//!     let meta = GameMetadata {
//!         event: Some("Club Championship".into()),
//!         ..GameMetadata::default()
//!     };
//!     let output = scan_files(&["sheet.jpg"], Some(&meta), &config).await?;
//!     println!("{}", output.pgn);
//!     eprintln!("{}", output.validation.status_table());
//!     Ok(())
//! }
//! ```
//!
//! Text that was already transcribed skips the vision model entirely:
//!
//! ```rust
//! use scoresheet2pgn::{normalize_text, validate_game, assemble, CorrectionConfig, Language, NotationTables};
//!
//! let tables = NotationTables::builtin();
//! let candidates = normalize_text("1. e4 e5\n2. Sf3 Sc6", Language::German, &tables);
//! let game = validate_game(&candidates, &CorrectionConfig::default()).unwrap();
//! assert!(assemble(&game, None).contains("1. e4 e5 2. Nf3 Nc6 *"));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `sheet2pgn` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! scoresheet2pgn = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chess;
pub mod config;
pub mod error;
pub mod notation;
pub mod output;
pub mod pgn;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod raster;
pub mod scan;
pub mod sink;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chess::{BoardState, Color, Role, Square};
pub use config::{CorrectionConfig, GeometryParams, ScanConfig, ScanConfigBuilder};
pub use error::{ExtractionError, ScanError};
pub use notation::{
    normalize, normalize_text, normalize_transcripts, CandidateMove, Language, NotationTables,
};
pub use output::{DebugArtifacts, PageReport, RawTranscript, RunIssue, ScanOutput, ScanStats};
pub use pgn::{assemble, GameMetadata};
pub use pipeline::columns::{create_image_with_boundaries, crop_to_boundary};
pub use pipeline::geometry::{
    detect_columns_automatically, detailed_corner_info, detected_corners, find_table_boundaries,
    ColumnSet, SheetLayout,
};
pub use pipeline::recognize::{
    extract, NotationRecognizer, Recognition, RecognitionRequest, RecognizerError, VisionRecognizer,
};
pub use progress::{NoopProgressCallback, ProgressCallback, ScanProgressCallback};
pub use raster::{Boundary, RasterImage};
pub use scan::{resolve_recognizer, scan, scan_files, scan_into, scan_sync, scan_transcripts};
pub use sink::{MemorySink, PgnFileSink, SinkFormat, ValidationSink};
pub use validate::{
    validate_game, validate_many, GameValidation, MovePair, MoveStatus, MoveValidator, ValidatedMove,
};
